//! String-backed enums stored in the configuration store.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use vantage_core::calculation::{CalculationKind, GroupLevel};

/// Grouping level of a calculation or scope of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum CalculationLevel {
    /// Per deal.
    #[sea_orm(string_value = "DEAL")]
    Deal,
    /// Per deal and tranche.
    #[sea_orm(string_value = "TRANCHE")]
    Tranche,
}

impl From<GroupLevel> for CalculationLevel {
    fn from(level: GroupLevel) -> Self {
        match level {
            GroupLevel::Deal => Self::Deal,
            GroupLevel::Tranche => Self::Tranche,
        }
    }
}

impl From<CalculationLevel> for GroupLevel {
    fn from(level: CalculationLevel) -> Self {
        match level {
            CalculationLevel::Deal => Self::Deal,
            CalculationLevel::Tranche => Self::Tranche,
        }
    }
}

/// Kind discriminator of a stored calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationType {
    /// Plain column selection.
    #[sea_orm(string_value = "RAW_FIELD")]
    RawField,
    /// Grouped aggregation.
    #[sea_orm(string_value = "AGGREGATED")]
    Aggregated,
    /// SQL or CDI variable.
    #[sea_orm(string_value = "RAW_SQL")]
    RawSql,
}

impl From<CalculationKind> for CalculationType {
    fn from(kind: CalculationKind) -> Self {
        match kind {
            CalculationKind::RawField => Self::RawField,
            CalculationKind::Aggregated => Self::Aggregated,
            CalculationKind::RawSql => Self::RawSql,
        }
    }
}

impl From<CalculationType> for CalculationKind {
    fn from(kind: CalculationType) -> Self {
        match kind {
            CalculationType::RawField => Self::RawField,
            CalculationType::Aggregated => Self::Aggregated,
            CalculationType::RawSql => Self::RawSql,
        }
    }
}
