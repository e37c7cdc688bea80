//! Audit error types.

use thiserror::Error;

/// Errors raised while persisting audit entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    /// The sink could not store a batch.
    #[error("Failed to write audit entries: {0}")]
    Sink(String),
}
