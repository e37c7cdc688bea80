//! Display formatting of result cells.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use super::types::{CellValue, FormatType};

/// Decimal places kept by [`FormatType::Number`].
pub const NUMBER_MAX_SCALE: u32 = 4;

/// Formats a cell for display. NULL stays NULL; values the format cannot
/// interpret are returned unchanged.
#[must_use]
pub fn format_cell(value: &CellValue, format: FormatType) -> CellValue {
    if value.is_null() {
        return CellValue::Null;
    }
    let formatted = match format {
        FormatType::Text => None,
        FormatType::Number => value.as_decimal().map(format_number),
        FormatType::Currency => value.as_decimal().map(format_currency),
        FormatType::Percentage => value.as_decimal().and_then(format_percentage),
        FormatType::Date | FormatType::DateUs => as_date(value).map(|d| format_date(d, format)),
    };
    formatted.map_or_else(|| value.clone(), CellValue::Text)
}

/// `$1,234.57`; negatives render as `-$1,234.57`.
#[must_use]
pub fn format_currency(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${}", group_digits(&rounded.abs().to_string()))
}

/// Fraction rendered as a percentage: `0.0525` becomes `5.25%`.
///
/// `None` when the scaled value does not fit a `Decimal`.
#[must_use]
pub fn format_percentage(value: Decimal) -> Option<String> {
    let mut scaled = value
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    scaled.rescale(2);
    if scaled.is_zero() {
        scaled = scaled.abs();
    }
    Some(format!("{scaled}%"))
}

/// Thousands separators, trailing zeros dropped, at most four decimals.
#[must_use]
pub fn format_number(value: Decimal) -> String {
    let rounded = value
        .round_dp_with_strategy(NUMBER_MAX_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let text = rounded.abs().to_string();
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{}", group_digits(&text))
}

/// Renders a date in one of the two date layouts.
#[must_use]
pub fn format_date(date: NaiveDate, format: FormatType) -> String {
    match format {
        FormatType::DateUs => date.format("%m/%d/%Y").to_string(),
        _ => date.format("%Y-%m-%d").to_string(),
    }
}

/// Interprets `YYYYMM` as the first day of that month and `YYYYMMDD` as a date.
#[must_use]
pub fn cycle_to_date(cycle: i64) -> Option<NaiveDate> {
    match cycle {
        100_000..=999_999 => {
            let year = i32::try_from(cycle / 100).ok()?;
            let month = u32::try_from(cycle % 100).ok()?;
            NaiveDate::from_ymd_opt(year, month, 1)
        }
        10_000_000..=99_999_999 => {
            let year = i32::try_from(cycle / 10_000).ok()?;
            let month = u32::try_from(cycle / 100 % 100).ok()?;
            let day = u32::try_from(cycle % 100).ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
        _ => None,
    }
}

fn as_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(d) => Some(*d),
        CellValue::Integer(v) => cycle_to_date(*v),
        CellValue::Text(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| s.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
        }
        _ => None,
    }
}

/// Inserts `,` every three digits of the integer part of an unsigned number.
fn group_digits(unsigned: &str) -> String {
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3 + frac_part.map_or(0, |f| f.len() + 1));
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}
