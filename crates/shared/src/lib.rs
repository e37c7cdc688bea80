//! Shared types, errors, and configuration for Vantage.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe references to configuration entities
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management (configuration store, warehouse, query and audit settings)

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, AuditSettings, DatabaseConfig, QuerySettings};
pub use error::{AppError, AppResult};
