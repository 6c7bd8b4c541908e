//! Locale-aware quantity parsing.
//!
//! Quantities arrive in Italian formatting: `.` groups thousands and `,`
//! marks the decimal point, so `"1.000,5"` is one thousand and a half.
//! Every place that reads a quantity for arithmetic goes through
//! [`normalize`].

use crate::data::Cell;

/// Absolute tolerance under which two quantities compare equal.
pub const QUANTITY_EPSILON: f64 = 1e-6;

/// Parses a quantity cell. `None` is the "not a number" outcome.
pub fn normalize(value: Option<&Cell>) -> Option<f64> {
    match value? {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Number(_) => None,
        Cell::Text(text) => normalize_str(text),
    }
}

/// Text form of [`normalize`]: strip thousands separators, turn decimal
/// commas into points, then parse.
pub fn normalize_str(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let canonical = trimmed.replace('.', "").replace(',', ".");
    canonical
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

pub fn quantities_equal(left: f64, right: f64) -> bool {
    (left - right).abs() < QUANTITY_EPSILON
}
