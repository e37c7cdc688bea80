//! Report definitions, execution requests and result shaping.
//!
//! This module holds the storage-independent side of reports:
//! - Execution requests and the deal/tranche filter
//! - Saved report definitions and their validation
//! - Column preferences and cell formatting

pub mod error;
pub mod format;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::ReportError;
pub use service::{OutputColumn, ReportService, ShapedResult};
pub use types::*;
