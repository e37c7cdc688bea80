//! Warehouse schema lookup errors.

use thiserror::Error;

/// Errors raised while resolving table or column references.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Table is not part of the warehouse model.
    #[error("Unknown warehouse table: {0}")]
    TableNotFound(String),

    /// Column does not exist on the table.
    #[error("Field not found: {table}.{column}")]
    FieldNotFound {
        /// Table that was searched.
        table: String,
        /// Requested column.
        column: String,
    },

    /// A static field path was not of the form `table.column`.
    #[error("Invalid field path '{0}', expected table.column")]
    InvalidFieldPath(String),
}
