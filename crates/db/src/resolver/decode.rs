//! Decoding warehouse rows into result cells.
//!
//! Result columns have no static type: a SQL calculation can return
//! anything. Each cell is read with the narrowest type the driver accepts,
//! trying integers, exact decimals, floats, text, booleans and dates in turn.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::QueryResult;
use vantage_core::report::{CellValue, OutputColumn, ResultRow};

/// Decodes one row into cells keyed by output column name.
pub fn decode_row(row: &QueryResult, columns: &[OutputColumn]) -> ResultRow {
    columns
        .iter()
        .map(|column| (column.name.clone(), decode_cell(row, &column.name)))
        .collect()
}

fn decode_cell(row: &QueryResult, column: &str) -> CellValue {
    if let Ok(value) = row.try_get::<Option<i64>>("", column) {
        return value.map_or(CellValue::Null, CellValue::Integer);
    }
    if let Ok(value) = row.try_get::<Option<i32>>("", column) {
        return value.map_or(CellValue::Null, |v| CellValue::Integer(v.into()));
    }
    if let Ok(value) = row.try_get::<Option<Decimal>>("", column) {
        return value.map_or(CellValue::Null, CellValue::Decimal);
    }
    if let Ok(value) = row.try_get::<Option<f64>>("", column) {
        return value.map_or(CellValue::Null, |v| float_cell(column, v));
    }
    if let Ok(value) = row.try_get::<Option<String>>("", column) {
        return value.map_or(CellValue::Null, CellValue::Text);
    }
    if let Ok(value) = row.try_get::<Option<bool>>("", column) {
        return value.map_or(CellValue::Null, CellValue::Bool);
    }
    if let Ok(value) = row.try_get::<Option<NaiveDate>>("", column) {
        return value.map_or(CellValue::Null, CellValue::Date);
    }
    tracing::warn!(column, "Result column has an unsupported type, returning NULL");
    CellValue::Null
}

/// Floats become exact decimals; NaN, infinities and out-of-range values
/// keep their text form.
fn float_cell(column: &str, value: f64) -> CellValue {
    Decimal::try_from(value).map_or_else(
        |e| {
            tracing::warn!(column, value, error = %e, "Float result has no decimal form, returning text");
            CellValue::Text(value.to_string())
        },
        CellValue::Decimal,
    )
}
