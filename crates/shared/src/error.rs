//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
///
/// Every module-level error converges here at the request boundary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found or inactive.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Structurally invalid input, rejected before any SQL is built.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Business rule violation (e.g., unapproved SQL calculation).
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Conflict (e.g., duplicate calculation name).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Generated SQL failed to compile against the warehouse.
    #[error("SQL compile error: {message}")]
    Compile {
        /// Driver message.
        message: String,
        /// Statement the warehouse rejected.
        sql: String,
    },

    /// Database error (configuration store or warehouse).
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::BusinessRule(_) | Self::Compile { .. } => 422,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            Self::Conflict(_) => "CONFLICT",
            Self::Compile { .. } => "SQL_COMPILE_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the message that may be shown to API callers.
    ///
    /// Server-side failures are reduced to a generic message; their details
    /// belong in the logs only.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) => "The report query failed to execute".to_string(),
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }

    /// Returns the generated SQL attached to a compile error.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Compile { sql, .. } => Some(sql),
            _ => None,
        }
    }
}
