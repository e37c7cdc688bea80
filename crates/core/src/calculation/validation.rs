//! Validating constructors for calculations.

use crate::warehouse::{
    CYCLE_CODE_COLUMN, DEAL_NUMBER_COLUMN, FieldRef, TRANCHE_ID_COLUMN, WarehouseTable,
};

use super::error::CalculationError;
use super::types::{
    AggregationFunction, Calculation, CalculationDefinition, GroupLevel, SystemCalculationVariant,
};

/// Longest display name accepted (Postgres identifier limit).
pub const MAX_DISPLAY_NAME_LEN: usize = 63;

/// Warehouse table holding CDI variable values per deal and cycle.
pub const CDI_VARIABLE_TABLE: &str = "deal_cdi_var_rpt";

/// Column names reserved for the report's identity columns.
pub const RESERVED_COLUMN_NAMES: [&str; 3] = ["deal_number", "tranche_id", "cycle_code"];

impl Calculation {
    /// Builds a `RAW_FIELD` calculation at the table's natural level.
    pub fn raw_field(
        name: impl Into<String>,
        table: &str,
        column: &str,
    ) -> Result<Self, CalculationError> {
        let field = FieldRef::resolve(table, column)?;
        Self::raw_field_at(name, GroupLevel::for_table(field.table), table, column)
    }

    /// Builds a `RAW_FIELD` calculation at an explicit level.
    ///
    /// A deal-level raw field must come from `deal`; tranche columns have no
    /// single value per deal.
    pub fn raw_field_at(
        name: impl Into<String>,
        group_level: GroupLevel,
        table: &str,
        column: &str,
    ) -> Result<Self, CalculationError> {
        let name = validate_name(name.into())?;
        let field = FieldRef::resolve(table, column)?;
        if group_level == GroupLevel::Deal && field.table != WarehouseTable::Deal {
            return Err(CalculationError::GroupLevelMismatch {
                field: field.to_string(),
                group_level,
            });
        }
        Ok(Self {
            display_name: name.clone(),
            name,
            group_level,
            definition: CalculationDefinition::RawField { field },
        })
    }

    /// Builds an `AGGREGATED` calculation.
    pub fn aggregated(
        name: impl Into<String>,
        group_level: GroupLevel,
        table: &str,
        column: &str,
        function: AggregationFunction,
        weight_column: Option<&str>,
    ) -> Result<Self, CalculationError> {
        let name = validate_name(name.into())?;
        let field = FieldRef::resolve(table, column)?;

        if function.requires_numeric() && !field.field_type().is_numeric() {
            return Err(CalculationError::NonNumericField {
                field: field.to_string(),
                function,
            });
        }

        let weight_column = weight_column.map(str::trim).filter(|w| !w.is_empty());
        let weight = match (function, weight_column) {
            (AggregationFunction::WeightedAvg, None) => {
                return Err(CalculationError::MissingWeightColumn);
            }
            (AggregationFunction::WeightedAvg, Some(weight)) => {
                let weight = FieldRef::resolve(field.table.table_name(), weight)?;
                if !weight.field_type().is_numeric() {
                    return Err(CalculationError::NonNumericField {
                        field: weight.to_string(),
                        function,
                    });
                }
                Some(weight)
            }
            (_, Some(_)) => return Err(CalculationError::UnexpectedWeightColumn(function)),
            (_, None) => None,
        };

        Ok(Self {
            display_name: name.clone(),
            name,
            group_level,
            definition: CalculationDefinition::Aggregated {
                field,
                function,
                weight,
            },
        })
    }

    /// Builds a `RAW_SQL` calculation.
    ///
    /// The text is checked but kept byte for byte; it is only ever wrapped.
    pub fn raw_sql(
        name: impl Into<String>,
        group_level: GroupLevel,
        sql_text: impl Into<String>,
        result_column: impl Into<String>,
    ) -> Result<Self, CalculationError> {
        let name = validate_name(name.into())?;
        let sql_text = sql_text.into();
        let result_column = result_column.into();
        validate_sql_text(&sql_text)?;
        validate_result_column(&result_column)?;
        Ok(Self {
            display_name: name.clone(),
            name,
            group_level,
            definition: CalculationDefinition::RawSql {
                sql_text,
                result_column,
            },
        })
    }

    /// Builds the executable form of a system calculation for one cycle.
    pub fn system(
        name: impl Into<String>,
        group_level: GroupLevel,
        variant: &SystemCalculationVariant,
        cycle_code: i64,
    ) -> Result<Self, CalculationError> {
        match variant {
            SystemCalculationVariant::Sql {
                sql_text,
                result_column,
            } => Self::raw_sql(name, group_level, sql_text.clone(), result_column.clone()),
            SystemCalculationVariant::CdiVariable {
                variable_name,
                result_column,
            } => {
                if group_level.is_tranche() {
                    return Err(CalculationError::CdiVariableTrancheLevel);
                }
                validate_cdi_variable_name(variable_name)?;
                validate_result_column(result_column)?;
                let sql = cdi_variable_sql(variable_name, result_column, cycle_code);
                Self::raw_sql(name, group_level, sql, result_column.clone())
            }
        }
    }
}

/// Validates a variant payload without binding it to a cycle.
pub fn validate_system_variant(
    group_level: GroupLevel,
    variant: &SystemCalculationVariant,
) -> Result<(), CalculationError> {
    match variant {
        SystemCalculationVariant::Sql {
            sql_text,
            result_column,
        } => {
            validate_sql_text(sql_text)?;
            validate_result_column(result_column)
        }
        SystemCalculationVariant::CdiVariable {
            variable_name,
            result_column,
        } => {
            if group_level.is_tranche() {
                return Err(CalculationError::CdiVariableTrancheLevel);
            }
            validate_cdi_variable_name(variable_name)?;
            validate_result_column(result_column)
        }
    }
}

/// SQL generated for a CDI variable lookup.
#[must_use]
pub fn cdi_variable_sql(variable_name: &str, result_column: &str, cycle_code: i64) -> String {
    format!(
        "SELECT {DEAL_NUMBER_COLUMN}, dl_cdi_var_value AS {result_column} \
         FROM {CDI_VARIABLE_TABLE} \
         WHERE dl_cdi_var_nme = '{}' AND {CYCLE_CODE_COLUMN} = {cycle_code}",
        variable_name.replace('\'', "''")
    )
}

fn validate_name(name: String) -> Result<String, CalculationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CalculationError::EmptyName);
    }
    validate_display_name(trimmed)?;
    Ok(trimmed.to_string())
}

/// Checks a column header: non-empty, bounded, printable, not reserved.
pub fn validate_display_name(display_name: &str) -> Result<(), CalculationError> {
    let invalid = |reason: &str| CalculationError::InvalidDisplayName {
        name: display_name.to_string(),
        reason: reason.to_string(),
    };

    if display_name.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(invalid("is longer than 63 characters"));
    }
    if display_name.chars().any(char::is_control) {
        return Err(invalid("contains control characters"));
    }
    if RESERVED_COLUMN_NAMES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(display_name))
        || display_name.starts_with("calc_")
    {
        return Err(invalid("is reserved for report key columns"));
    }
    Ok(())
}

/// Returns true for `[A-Za-z][A-Za-z0-9_]*`.
#[must_use]
pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_result_column(result_column: &str) -> Result<(), CalculationError> {
    if !is_identifier(result_column) {
        return Err(CalculationError::InvalidResultColumn(
            result_column.to_string(),
        ));
    }
    if [DEAL_NUMBER_COLUMN, TRANCHE_ID_COLUMN]
        .iter()
        .any(|k| k.eq_ignore_ascii_case(result_column))
    {
        return Err(CalculationError::InvalidResultColumn(
            result_column.to_string(),
        ));
    }
    Ok(())
}

/// Structural checks on SQL text; compilation is checked against the warehouse.
pub fn validate_sql_text(sql_text: &str) -> Result<(), CalculationError> {
    let trimmed = sql_text.trim();
    if trimmed.is_empty() {
        return Err(CalculationError::EmptySql);
    }
    let head = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if head != "SELECT" && head != "WITH" && !head.starts_with('(') {
        return Err(CalculationError::SqlNotSelect);
    }
    if trimmed.ends_with(';') {
        return Err(CalculationError::TrailingSemicolon);
    }
    Ok(())
}

fn validate_cdi_variable_name(variable_name: &str) -> Result<(), CalculationError> {
    let valid = !variable_name.is_empty()
        && variable_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '#' | '-'));
    if valid {
        Ok(())
    } else {
        Err(CalculationError::InvalidCdiVariable(
            variable_name.to_string(),
        ))
    }
}
