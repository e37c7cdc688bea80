//! Report validation and result shaping.

use std::collections::HashSet;

use crate::calculation::{GroupLevel, RESERVED_COLUMN_NAMES, validate_display_name};

use super::error::ReportError;
use super::format::format_cell;
use super::types::{
    CellValue, ColumnPreference, DealTrancheFilter, FormatType, ReportDefinition, ResultColumn,
    ResultRow,
};

/// A column produced by a compiled query, before preferences apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    /// Column name in the query output.
    pub name: String,
    /// Format used when no preference overrides it.
    pub default_format: FormatType,
}

impl OutputColumn {
    /// Creates an output column.
    pub fn new(name: impl Into<String>, default_format: FormatType) -> Self {
        Self {
            name: name.into(),
            default_format,
        }
    }
}

/// Rows and columns after column preferences have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedResult {
    /// Visible columns in display order.
    pub columns: Vec<ResultColumn>,
    /// Rows holding only visible, formatted columns.
    pub rows: Vec<ResultRow>,
    /// Preferences that matched no column.
    pub warnings: Vec<String>,
}

/// Stateless report rules.
pub struct ReportService;

impl ReportService {
    /// Validates a report definition before it is stored.
    pub fn validate_definition(definition: &ReportDefinition) -> Result<(), ReportError> {
        if definition.name.trim().is_empty() {
            return Err(ReportError::EmptyName);
        }
        if definition.calculations.is_empty() {
            return Err(ReportError::NoCalculations);
        }
        DealTrancheFilter::new(definition.deal_tranche_map.clone(), 0, definition.scope)?;

        for calc in &definition.calculations {
            if calc.id_or_path.trim().is_empty() {
                return Err(ReportError::InvalidReference(calc.to_string()));
            }
            if let Some(name) = calc.display_name() {
                validate_display_name(name)?;
            }
        }
        Self::check_unique_columns(
            definition
                .calculations
                .iter()
                .filter_map(|c| c.display_name()),
        )
    }

    /// Checks that a calculation level fits the report scope.
    ///
    /// Deal reports take calculations of either level; tranche reports only
    /// take tranche-level ones.
    pub fn check_scope(
        calculation: &str,
        calculation_level: GroupLevel,
        report_level: GroupLevel,
    ) -> Result<(), ReportError> {
        if calculation_level.fits_report(report_level) {
            Ok(())
        } else {
            Err(ReportError::ScopeMismatch {
                calculation: calculation.to_string(),
                calculation_level,
                report_level,
            })
        }
    }

    /// Rejects repeated headers and headers that shadow identity columns.
    pub fn check_unique_columns<'a>(
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ReportError> {
        let mut seen = HashSet::new();
        for name in names {
            let key = name.to_lowercase();
            if RESERVED_COLUMN_NAMES.contains(&key.as_str()) || !seen.insert(key) {
                return Err(ReportError::DuplicateColumn(name.to_string()));
            }
        }
        Ok(())
    }

    /// Hides, orders, renames and formats result columns.
    ///
    /// Columns with a `display_order` come first, ascending; the rest keep
    /// their query order. Row keys stay the column field names.
    #[must_use]
    pub fn apply_column_preferences(
        columns: &[OutputColumn],
        rows: Vec<ResultRow>,
        preferences: &[ColumnPreference],
    ) -> ShapedResult {
        let warnings = preferences
            .iter()
            .filter(|p| !columns.iter().any(|c| c.name == p.column_id))
            .map(|p| format!("Column preference for unknown column '{}' ignored", p.column_id))
            .collect();

        let mut visible: Vec<(Option<i32>, usize, &OutputColumn, Option<&ColumnPreference>)> =
            columns
                .iter()
                .enumerate()
                .filter_map(|(position, column)| {
                    let preference = preferences.iter().find(|p| p.column_id == column.name);
                    match preference {
                        Some(p) if !p.is_visible => None,
                        _ => Some((
                            preference.and_then(|p| p.display_order),
                            position,
                            column,
                            preference,
                        )),
                    }
                })
                .collect();
        visible.sort_by_key(|(order, position, _, _)| (order.is_none(), *order, *position));

        let shaped_columns: Vec<ResultColumn> = visible
            .iter()
            .enumerate()
            .map(|(display_order, (_, _, column, preference))| ResultColumn {
                field: column.name.clone(),
                header: preference
                    .and_then(|p| p.display_name.as_deref())
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .unwrap_or(&column.name)
                    .to_string(),
                format_type: preference
                    .and_then(|p| p.format_type)
                    .unwrap_or(column.default_format),
                display_order,
            })
            .collect();

        let rows = rows
            .into_iter()
            .map(|mut row| {
                shaped_columns
                    .iter()
                    .map(|column| {
                        let value = row
                            .remove(&column.field)
                            .map_or(CellValue::Null, |v| format_cell(&v, column.format_type));
                        (column.field.clone(), value)
                    })
                    .collect()
            })
            .collect();

        ShapedResult {
            columns: shaped_columns,
            rows,
            warnings,
        }
    }
}
