//! FILENAME: core/engine/src/coercion.rs
//! PURPOSE: Converts any raw form value into a definite finite number.
//! CONTEXT: Form inputs arrive as numbers, free text ("₹ 1,20,000"), empty
//! strings or nulls. Coercion never fails: anything that does not yield a
//! finite number becomes 0.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::value_tree::FieldValue;

/// Currency symbols stripped before numeric parsing.
pub const CURRENCY_SYMBOLS: &[char] = &['₹', '$', '€', '£', '¥', '¢', '₩', '₽', '₺', '₦', '฿'];

/// Longest numeric prefix, mirroring how form inputs like "12 sq.ft" are read.
static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .expect("numeric prefix pattern is valid")
});

/// Coerces a form value to a finite number.
/// Groups, nulls and unparsable text are 0.
pub fn to_number(value: &FieldValue) -> f64 {
    match value {
        FieldValue::Number(n) => finite_or_zero(*n),
        FieldValue::Text(s) => parse_number_str(s),
        FieldValue::Null | FieldValue::Group(_) => 0.0,
    }
}

/// Same as `to_number`, treating an unresolved field as null.
pub fn to_number_opt(value: Option<&FieldValue>) -> f64 {
    value.map(to_number).unwrap_or(0.0)
}

/// Parses free text after stripping currency symbols, thousands
/// separators and whitespace.
pub fn parse_number_str(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();

    parse_numeric_prefix(&cleaned)
}

fn parse_numeric_prefix(cleaned: &str) -> f64 {
    NUMERIC_PREFIX
        .find(cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(finite_or_zero)
        .unwrap_or(0.0)
}

/// Maps NaN and infinities to 0.
pub fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}
