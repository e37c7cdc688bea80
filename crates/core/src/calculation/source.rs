//! Stored calculation payloads.

use serde::{Deserialize, Serialize};

use super::error::CalculationError;
use super::types::{
    AggregationFunction, Calculation, CalculationKind, GroupLevel, SystemCalculationVariant,
};
use super::validation::validate_system_variant;

/// What a stored calculation reads, as entered by its author.
///
/// Converted into a builder-ready [`Calculation`] at resolution time; system
/// payloads need the executed cycle for that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "calculation_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationSource {
    /// One warehouse column.
    RawField {
        /// Table, logical or physical name.
        source_table: String,
        /// Column name.
        source_column: String,
    },
    /// Aggregation over one warehouse column.
    Aggregated {
        /// Table, logical or physical name.
        source_table: String,
        /// Aggregated column.
        source_column: String,
        /// Aggregation function.
        aggregation_function: AggregationFunction,
        /// Weight column on the same table, `WEIGHTED_AVG` only.
        #[serde(default)]
        weight_column: Option<String>,
    },
    /// SQL or CDI variable calculation.
    #[serde(rename = "RAW_SQL")]
    System(SystemCalculationVariant),
}

impl CalculationSource {
    /// Kind discriminator the source compiles to.
    #[must_use]
    pub const fn kind(&self) -> CalculationKind {
        match self {
            Self::RawField { .. } => CalculationKind::RawField,
            Self::Aggregated { .. } => CalculationKind::Aggregated,
            Self::System(_) => CalculationKind::RawSql,
        }
    }

    /// SQL calculations must be approved before they run.
    #[must_use]
    pub const fn requires_approval(&self) -> bool {
        matches!(self, Self::System(_))
    }

    /// Checks the source at a level without binding it to a cycle.
    pub fn validate(&self, name: &str, group_level: GroupLevel) -> Result<(), CalculationError> {
        match self {
            Self::System(variant) => {
                Calculation::raw_sql(name, group_level, "SELECT 1", variant.result_column())
                    .map(|_| ())?;
                validate_system_variant(group_level, variant)
            }
            _ => self.to_calculation(name, group_level, 0).map(|_| ()),
        }
    }

    /// Builds the executable calculation for one cycle.
    pub fn to_calculation(
        &self,
        name: &str,
        group_level: GroupLevel,
        cycle_code: i64,
    ) -> Result<Calculation, CalculationError> {
        match self {
            Self::RawField {
                source_table,
                source_column,
            } => Calculation::raw_field_at(name, group_level, source_table, source_column),
            Self::Aggregated {
                source_table,
                source_column,
                aggregation_function,
                weight_column,
            } => Calculation::aggregated(
                name,
                group_level,
                source_table,
                source_column,
                *aggregation_function,
                weight_column.as_deref(),
            ),
            Self::System(variant) => Calculation::system(name, group_level, variant, cycle_code),
        }
    }
}
