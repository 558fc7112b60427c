//! Currency/value normalization
//!
//! Cells that should hold money arrive as floats, formatted strings
//! ("Rp 1.500.000,50"), or garbage. [`clean_currency`] turns all of them
//! into a [`Decimal`], degrading silently to zero on anything unparseable.

use crate::cell::CellValue;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Normalize a raw cell value into a decimal amount.
///
/// Policy (kept exactly as the legacy sheets expect, including its known
/// limitation that "." is always a thousands separator and "," always a
/// decimal separator — values written in other locale conventions will be
/// misread rather than rejected):
/// - empty cell or empty string: 0
/// - numeric value: returned as-is
/// - otherwise: stringify, strip a literal "Rp" prefix substring, drop all
///   "." characters, turn "," into ".", trim, parse; parse failure: 0
pub fn clean_currency(value: Option<&CellValue>) -> Decimal {
    let value = match value {
        None => return Decimal::ZERO,
        Some(v) => v,
    };

    match value {
        CellValue::Empty => Decimal::ZERO,
        CellValue::Number(n) => Decimal::from_f64(*n).unwrap_or(Decimal::ZERO),
        CellValue::Boolean(true) => Decimal::ONE,
        CellValue::Boolean(false) => Decimal::ZERO,
        _ => {
            let text = value.to_text();
            if text.is_empty() {
                return Decimal::ZERO;
            }
            let cleaned = text
                .replace("Rp", "")
                .replace('.', "")
                .replace(',', ".");
            cleaned.trim().parse::<Decimal>().unwrap_or(Decimal::ZERO)
        }
    }
}
