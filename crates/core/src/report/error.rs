//! Report error types.

use thiserror::Error;

use crate::calculation::{CalculationError, GroupLevel};

/// Errors raised while validating report definitions and execution requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// The deal/tranche map is empty.
    #[error("No deals selected")]
    NoDealsSelected,

    /// The report has no calculations.
    #[error("At least one calculation is required")]
    NoCalculations,

    /// Report name is blank.
    #[error("Report name must not be empty")]
    EmptyName,

    /// A tranche id in the selection is blank.
    #[error("Deal {0} has an empty tranche id in its selection")]
    EmptyTrancheId(i64),

    /// Two columns share a header.
    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// A calculation reference is malformed.
    #[error("Invalid calculation reference '{0}'")]
    InvalidReference(String),

    /// Report scope is finer than the calculation level.
    #[error("Calculation '{calculation}' is {calculation_level}-level and cannot be used in a {report_level}-level report")]
    ScopeMismatch {
        /// Offending calculation.
        calculation: String,
        /// Its group level.
        calculation_level: GroupLevel,
        /// Report scope.
        report_level: GroupLevel,
    },

    /// A column preference names a column the report does not produce.
    #[error("Column preference refers to unknown column '{0}'")]
    UnknownColumn(String),

    /// Calculation validation failed.
    #[error(transparent)]
    Calculation(#[from] CalculationError),
}
