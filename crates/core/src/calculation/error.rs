//! Calculation validation errors.

use thiserror::Error;

use super::types::{AggregationFunction, GroupLevel};
use crate::warehouse::SchemaError;

/// Errors raised when a calculation definition is structurally invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculationError {
    /// Source table or column does not resolve.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Calculation name is blank.
    #[error("Calculation name must not be empty")]
    EmptyName,

    /// Display name cannot be used as a column header.
    #[error("Invalid display name '{name}': {reason}")]
    InvalidDisplayName {
        /// Offending name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// `WEIGHTED_AVG` without a weight column.
    #[error("WEIGHTED_AVG requires a weight column")]
    MissingWeightColumn,

    /// Weight column supplied for an unweighted function.
    #[error("A weight column is only allowed with WEIGHTED_AVG, not {0}")]
    UnexpectedWeightColumn(AggregationFunction),

    /// Aggregation needs a numeric field.
    #[error("{function} requires a numeric field, {field} is not numeric")]
    NonNumericField {
        /// Offending field.
        field: String,
        /// Requested function.
        function: AggregationFunction,
    },

    /// Field cannot produce one value per row at the requested level.
    #[error("Field {field} cannot be selected at {group_level} level")]
    GroupLevelMismatch {
        /// Offending field.
        field: String,
        /// Requested level.
        group_level: GroupLevel,
    },

    /// SQL result column is not an identifier.
    #[error("Invalid result column name '{0}', expected [A-Za-z][A-Za-z0-9_]* and not a key column")]
    InvalidResultColumn(String),

    /// SQL text is blank.
    #[error("SQL text must not be empty")]
    EmptySql,

    /// SQL text is not a query.
    #[error("SQL text must be a SELECT or WITH query")]
    SqlNotSelect,

    /// SQL text ends with a statement terminator, which breaks wrapping.
    #[error("SQL text must not end with a semicolon")]
    TrailingSemicolon,

    /// CDI variable name contains unsupported characters.
    #[error("Invalid CDI variable name '{0}'")]
    InvalidCdiVariable(String),

    /// CDI variables exist per deal only.
    #[error("CDI variable calculations are deal-level only")]
    CdiVariableTrancheLevel,
}
