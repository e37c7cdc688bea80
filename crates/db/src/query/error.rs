//! Query builder errors.

use thiserror::Error;
use vantage_core::report::ReportError;

/// Errors raised while compiling calculations into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Request shape is invalid (no calculations, scope mismatch, duplicate columns).
    #[error(transparent)]
    Report(#[from] ReportError),

    /// A calculation needs a base column the base CTE does not carry.
    ///
    /// This is a builder bug, never a user error.
    #[error("Base CTE has no column '{column}' for calculation '{calculation}'")]
    MissingBaseColumn {
        /// Calculation being compiled.
        calculation: String,
        /// Missing column label.
        column: String,
        /// Columns the base CTE does carry.
        known: Vec<String>,
    },
}
