//! Core reporting logic for Vantage.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! The warehouse schema, calculation model, report rules and audit trail live here;
//! SQL generation and execution live in `vantage-db`.
//!
//! # Modules
//!
//! - `warehouse` - Static description of the warehouse tables and joins
//! - `calculation` - The three calculation kinds and their validation
//! - `report` - Requests, filters, report definitions and result formatting
//! - `audit` - Calculation change diffs and the buffered audit writer

pub mod audit;
pub mod calculation;
pub mod report;
pub mod warehouse;
