//! Calculation definitions and their validation.
//!
//! A [`Calculation`] is the builder-ready form of a user calculation, a system
//! calculation or a static field. Construction goes through the validating
//! constructors, so anything the query builder receives already resolves
//! against the warehouse schema.

mod error;
mod source;
mod types;
mod validation;

pub use error::CalculationError;
pub use source::CalculationSource;
pub use types::{
    AggregationFunction, Calculation, CalculationDefinition, CalculationKind, GroupLevel,
    SystemCalculationVariant,
};
pub use validation::{
    CDI_VARIABLE_TABLE, MAX_DISPLAY_NAME_LEN, RESERVED_COLUMN_NAMES, cdi_variable_sql,
    is_identifier, validate_display_name, validate_sql_text, validate_system_variant,
};

#[cfg(test)]
mod tests;
