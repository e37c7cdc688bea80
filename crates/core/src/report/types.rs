//! Report data types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{CalculationKind, GroupLevel};
use crate::warehouse::FieldType;

use super::error::ReportError;

/// Deal number to selected tranche ids; an empty list selects every tranche.
pub type DealTrancheMap = BTreeMap<i64, Vec<String>>;

/// How a calculation reference is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationRefKind {
    /// `table.column` path into the warehouse.
    StaticField,
    /// Stored `AGGREGATED` or `RAW_FIELD` calculation.
    UserAggregation,
    /// Stored `RAW_SQL` or CDI variable calculation.
    SystemSql,
}

impl CalculationRefKind {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StaticField => "static_field",
            Self::UserAggregation => "user_aggregation",
            Self::SystemSql => "system_sql",
        }
    }
}

impl fmt::Display for CalculationRefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a calculation inside a request or template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationRef {
    /// Reference kind.
    pub kind: CalculationRefKind,
    /// `table.column` for static fields, the stored id otherwise.
    pub id_or_path: String,
    /// Column header; defaults to the calculation's own name when blank.
    #[serde(default)]
    pub display_name: String,
}

impl CalculationRef {
    /// Creates a reference.
    pub fn new(
        kind: CalculationRefKind,
        id_or_path: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            id_or_path: id_or_path.into(),
            display_name: display_name.into(),
        }
    }

    /// Display name if one was given.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        let trimmed = self.display_name.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

impl fmt::Display for CalculationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id_or_path)
    }
}

/// Execution-time filter: deals, tranche subsets, cycle and report level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealTrancheFilter {
    deals: DealTrancheMap,
    cycle_code: i64,
    report_level: GroupLevel,
}

impl DealTrancheFilter {
    /// Creates a filter, rejecting an empty deal map.
    ///
    /// Tranche ids are trimmed, sorted and de-duplicated so equal selections
    /// always render the same SQL.
    pub fn new(
        deals: DealTrancheMap,
        cycle_code: i64,
        report_level: GroupLevel,
    ) -> Result<Self, ReportError> {
        if deals.is_empty() {
            return Err(ReportError::NoDealsSelected);
        }
        let mut normalized = DealTrancheMap::new();
        for (deal, tranches) in deals {
            let mut ids = Vec::with_capacity(tranches.len());
            for tranche in tranches {
                let trimmed = tranche.trim();
                if trimmed.is_empty() {
                    return Err(ReportError::EmptyTrancheId(deal));
                }
                ids.push(trimmed.to_string());
            }
            ids.sort();
            ids.dedup();
            normalized.insert(deal, ids);
        }
        Ok(Self {
            deals: normalized,
            cycle_code,
            report_level,
        })
    }

    /// Selected deals and their tranche subsets.
    #[must_use]
    pub const fn deals(&self) -> &DealTrancheMap {
        &self.deals
    }

    /// Cycle code.
    #[must_use]
    pub const fn cycle_code(&self) -> i64 {
        self.cycle_code
    }

    /// Report level.
    #[must_use]
    pub const fn report_level(&self) -> GroupLevel {
        self.report_level
    }

    /// Deal numbers in ascending order.
    pub fn deal_numbers(&self) -> impl Iterator<Item = i64> + '_ {
        self.deals.keys().copied()
    }

    /// Whether any deal is restricted to a tranche subset.
    #[must_use]
    pub fn has_tranche_restrictions(&self) -> bool {
        self.deals.values().any(|t| !t.is_empty())
    }

    /// Returns the same selection at another level.
    #[must_use]
    pub fn with_report_level(mut self, report_level: GroupLevel) -> Self {
        self.report_level = report_level;
        self
    }
}

/// Ad-hoc execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Calculations in column order.
    pub calculations: Vec<CalculationRef>,
    /// Deal/tranche selection.
    pub deal_tranche_map: DealTrancheMap,
    /// Cycle code.
    pub cycle_code: i64,
    /// Report level.
    pub report_level: GroupLevel,
}

impl ExecutionRequest {
    /// Checks the request shape and builds its filter.
    ///
    /// Calculations are checked first so an empty request never reaches the
    /// deal selection.
    pub fn filter(&self) -> Result<DealTrancheFilter, ReportError> {
        if self.calculations.is_empty() {
            return Err(ReportError::NoCalculations);
        }
        DealTrancheFilter::new(
            self.deal_tranche_map.clone(),
            self.cycle_code,
            self.report_level,
        )
    }
}

/// Display format of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormatType {
    /// Value as is.
    #[default]
    Text,
    /// Thousands separators, up to four decimals.
    Number,
    /// `$1,234.57`.
    Currency,
    /// Stored fraction times 100, two decimals, `%` suffix.
    Percentage,
    /// `YYYY-MM-DD`.
    Date,
    /// `MM/DD/YYYY`.
    DateUs,
}

impl FormatType {
    /// Default format for a warehouse column type.
    #[must_use]
    pub const fn for_field(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Number => Self::Number,
            FieldType::String => Self::Text,
            FieldType::Currency => Self::Currency,
            FieldType::Percentage => Self::Percentage,
            FieldType::Date => Self::Date,
        }
    }
}

/// Display preference for one column of a saved report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPreference {
    /// Column the preference applies to (the calculation's display name).
    pub column_id: String,
    /// Header override.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Hidden columns are dropped from results.
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    /// Position; columns without one keep their query order after ordered ones.
    #[serde(default)]
    pub display_order: Option<i32>,
    /// Format override.
    #[serde(default)]
    pub format_type: Option<FormatType>,
}

fn default_visible() -> bool {
    true
}

/// Saved report definition, independent of storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDefinition {
    /// Report name.
    pub name: String,
    /// Free text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Report level.
    pub scope: GroupLevel,
    /// Selected deals.
    pub deal_tranche_map: DealTrancheMap,
    /// Calculations in column order.
    pub calculations: Vec<CalculationRef>,
    /// Column display preferences.
    #[serde(default)]
    pub column_preferences: Vec<ColumnPreference>,
}

impl ReportDefinition {
    /// Builds the execution request for a cycle.
    #[must_use]
    pub fn request(&self, cycle_code: i64) -> ExecutionRequest {
        ExecutionRequest {
            calculations: self.calculations.clone(),
            deal_tranche_map: self.deal_tranche_map.clone(),
            cycle_code,
            report_level: self.scope,
        }
    }
}

/// A single result value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Integer(i64),
    /// Exact decimal.
    Decimal(Decimal),
    /// Calendar date.
    Date(NaiveDate),
    /// Text, including formatted values.
    Text(String),
}

impl CellValue {
    /// Returns true for NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the value, if it has one.
    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Integer(v) => Some(Decimal::from(*v)),
            Self::Decimal(v) => Some(*v),
            Self::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<Option<i64>> for CellValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One result row keyed by column field name.
pub type ResultRow = BTreeMap<String, CellValue>;

/// Column metadata of an execution result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumn {
    /// Key in each row.
    pub field: String,
    /// Header shown to users.
    pub header: String,
    /// Applied format.
    pub format_type: FormatType,
    /// Zero-based position.
    pub display_order: usize,
}

/// Rows produced by an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Result rows.
    pub rows: Vec<ResultRow>,
    /// Visible columns in display order.
    pub columns: Vec<ResultColumn>,
    /// Non-fatal problems, e.g. SQL calculations replaced by NULL columns.
    pub warnings: Vec<String>,
    /// Executed SQL text.
    pub sql: String,
}

/// Debug information for one calculation in a preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationDebug {
    /// SQL fragment that computes the column (CTE body or projection).
    pub sql_fragment: String,
    /// Calculation kind.
    pub calculation_type: CalculationKind,
    /// Group level.
    pub group_level: GroupLevel,
}

/// Rendered SQL and metadata, without execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResult {
    /// Full SQL text, identical to what execution runs.
    pub sql: String,
    /// Output column names in query order.
    pub columns: Vec<String>,
    /// Per-calculation fragments keyed by display name.
    pub per_calculation_debug: BTreeMap<String, CalculationDebug>,
    /// Non-fatal problems.
    #[serde(default)]
    pub warnings: Vec<String>,
}
