//! Calculation domain types.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::warehouse::{FieldRef, WarehouseTable};

/// Level at which a calculation (or report) produces rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupLevel {
    /// One value per deal.
    #[serde(alias = "deal")]
    Deal,
    /// One value per `(deal, tranche)`.
    #[serde(alias = "tranche")]
    Tranche,
}

impl GroupLevel {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deal => "deal",
            Self::Tranche => "tranche",
        }
    }

    /// Parses a level, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "deal" => Some(Self::Deal),
            "tranche" => Some(Self::Tranche),
            _ => None,
        }
    }

    /// Natural level of a warehouse table's rows.
    #[must_use]
    pub const fn for_table(table: WarehouseTable) -> Self {
        if table.is_tranche_scoped() {
            Self::Tranche
        } else {
            Self::Deal
        }
    }

    /// Returns true for tranche-level rows.
    #[must_use]
    pub const fn is_tranche(self) -> bool {
        matches!(self, Self::Tranche)
    }

    /// Whether a calculation at this level may appear in a report at `report_level`.
    ///
    /// The report scope must equal the calculation level or be coarser. A
    /// tranche-level calculation in a deal report joins on the deal only.
    #[must_use]
    pub const fn fits_report(self, report_level: Self) -> bool {
        matches!(
            (self, report_level),
            (_, Self::Deal) | (Self::Tranche, Self::Tranche)
        )
    }
}

impl fmt::Display for GroupLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregation applied by an `AGGREGATED` calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationFunction {
    /// `SUM(field)`.
    Sum,
    /// `AVG(field)`.
    Avg,
    /// `COUNT(field)`.
    Count,
    /// `MIN(field)`.
    Min,
    /// `MAX(field)`.
    Max,
    /// `SUM(field * weight) / NULLIF(SUM(weight), 0)`.
    WeightedAvg,
}

impl AggregationFunction {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Count => "COUNT",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::WeightedAvg => "WEIGHTED_AVG",
        }
    }

    /// Parses a function name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SUM" => Some(Self::Sum),
            "AVG" | "AVERAGE" => Some(Self::Avg),
            "COUNT" => Some(Self::Count),
            "MIN" => Some(Self::Min),
            "MAX" => Some(Self::Max),
            "WEIGHTED_AVG" => Some(Self::WeightedAvg),
            _ => None,
        }
    }

    /// Whether the source field has to be numeric.
    #[must_use]
    pub const fn requires_numeric(self) -> bool {
        matches!(self, Self::Sum | Self::Avg | Self::WeightedAvg)
    }
}

impl fmt::Display for AggregationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three-way calculation discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationKind {
    /// Selects one warehouse column.
    RawField,
    /// Aggregates one warehouse column.
    Aggregated,
    /// Wraps a SQL fragment.
    RawSql,
}

impl CalculationKind {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RawField => "raw_field",
            Self::Aggregated => "aggregated",
            Self::RawSql => "raw_sql",
        }
    }

    /// Parses a kind, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "raw_field" => Some(Self::RawField),
            "aggregated" => Some(Self::Aggregated),
            "raw_sql" => Some(Self::RawSql),
            _ => None,
        }
    }
}

impl fmt::Display for CalculationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a calculation computes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalculationDefinition {
    /// Plain column selection.
    RawField {
        /// Selected column.
        field: FieldRef,
    },
    /// Grouped aggregation over one column.
    Aggregated {
        /// Aggregated column.
        field: FieldRef,
        /// Aggregation function.
        function: AggregationFunction,
        /// Weight column, present only for `WEIGHTED_AVG`.
        weight: Option<FieldRef>,
    },
    /// User or admin supplied SQL, composed by wrapping only.
    RawSql {
        /// SQL text, never rewritten.
        sql_text: String,
        /// Name of the single result column the SQL returns.
        result_column: String,
    },
}

impl CalculationDefinition {
    /// Returns the kind discriminator.
    #[must_use]
    pub const fn kind(&self) -> CalculationKind {
        match self {
            Self::RawField { .. } => CalculationKind::RawField,
            Self::Aggregated { .. } => CalculationKind::Aggregated,
            Self::RawSql { .. } => CalculationKind::RawSql,
        }
    }
}

/// A validated calculation, ready for the query builder.
///
/// Instances are only produced by the constructors in
/// [`validation`](super::validation), so the definition always resolves
/// against the warehouse schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calculation {
    pub(crate) name: String,
    pub(crate) display_name: String,
    pub(crate) group_level: GroupLevel,
    pub(crate) definition: CalculationDefinition,
}

impl Calculation {
    /// Calculation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column header used in generated SQL and results.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Grouping level.
    #[must_use]
    pub const fn group_level(&self) -> GroupLevel {
        self.group_level
    }

    /// Definition payload.
    #[must_use]
    pub const fn definition(&self) -> &CalculationDefinition {
        &self.definition
    }

    /// Kind discriminator.
    #[must_use]
    pub const fn kind(&self) -> CalculationKind {
        self.definition.kind()
    }

    /// Tables that must be joined for this calculation.
    ///
    /// SQL calculations trust their declared level: deal-level SQL needs only
    /// `deal`, tranche-level SQL needs `tranche` for the tranche key.
    #[must_use]
    pub fn required_tables(&self) -> BTreeSet<WarehouseTable> {
        let mut tables: BTreeSet<WarehouseTable> = match &self.definition {
            CalculationDefinition::RawField { field }
            | CalculationDefinition::Aggregated { field, .. } => {
                field.table.join_path().iter().copied().collect()
            }
            CalculationDefinition::RawSql { .. } => BTreeSet::from([WarehouseTable::Deal]),
        };
        if self.group_level.is_tranche() {
            tables.extend(WarehouseTable::Tranche.join_path());
        }
        tables
    }

    /// Distinct warehouse columns read by this calculation, weights included.
    #[must_use]
    pub fn source_fields(&self) -> Vec<FieldRef> {
        match &self.definition {
            CalculationDefinition::RawField { field } => vec![*field],
            CalculationDefinition::Aggregated { field, weight, .. } => {
                let mut fields = vec![*field];
                if let Some(weight) = weight
                    && weight != field
                {
                    fields.push(*weight);
                }
                fields
            }
            CalculationDefinition::RawSql { .. } => Vec::new(),
        }
    }

    /// Returns a copy with a different column header.
    pub fn with_display_name(
        mut self,
        display_name: impl Into<String>,
    ) -> Result<Self, super::CalculationError> {
        let display_name = display_name.into();
        super::validation::validate_display_name(&display_name)?;
        self.display_name = display_name;
        Ok(self)
    }
}

/// Variant payload of a system calculation.
///
/// System calculations are resolved once at load time; nothing downstream
/// inspects metadata to find out which variant it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum SystemCalculationVariant {
    /// Free-form SQL returning the deal (and tranche) key and one result column.
    Sql {
        /// SQL text.
        sql_text: String,
        /// Result column returned by the SQL.
        result_column: String,
    },
    /// Deal-level value of a named CDI variable for the executed cycle.
    CdiVariable {
        /// Variable name as stored in `deal_cdi_var_rpt.dl_cdi_var_nme`.
        variable_name: String,
        /// Column name given to the value.
        result_column: String,
    },
}

impl SystemCalculationVariant {
    /// Returns the storage representation of the variant tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sql { .. } => "sql",
            Self::CdiVariable { .. } => "cdi_variable",
        }
    }

    /// Result column name produced by the variant.
    #[must_use]
    pub fn result_column(&self) -> &str {
        match self {
            Self::Sql { result_column, .. } | Self::CdiVariable { result_column, .. } => {
                result_column
            }
        }
    }
}
