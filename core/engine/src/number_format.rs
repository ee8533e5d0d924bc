//! FILENAME: core/engine/src/number_format.rs
//! PURPOSE: Currency formatting and parsing for calculated fields.
//! CONTEXT: Currency output is written back to the form as display text.
//! `parse_currency(format_currency(x)) == round_to(x, decimal_places)`
//! holds for every finite x, so formatted values can be read back as inputs.

use crate::calculation::OutputFormat;
use crate::coercion::parse_number_str;
use crate::settings::{CurrencySettings, DigitGrouping};
use crate::value_tree::FieldValue;

/// Rounds half away from zero to `decimal_places`.
pub fn round_to(value: f64, decimal_places: u8) -> f64 {
    let factor = 10f64.powi(decimal_places as i32);
    let scaled = (value * factor).round();
    if !scaled.is_finite() {
        return value;
    }
    scaled / factor
}

/// Formats a number as currency, e.g. `₹5,00,000.00` or `-₹1,234.50`.
pub fn format_currency(value: f64, settings: &CurrencySettings) -> String {
    let rounded = round_to(value, settings.decimal_places);
    let fixed = format!(
        "{:.prec$}",
        rounded.abs(),
        prec = settings.decimal_places as usize
    );
    let grouped = group_digits(&fixed, settings.grouping);

    if rounded < 0.0 {
        format!("-{}{}", settings.symbol, grouped)
    } else {
        format!("{}{}", settings.symbol, grouped)
    }
}

/// Parses currency text back into a number. Unparsable input is 0.
pub fn parse_currency(text: &str, settings: &CurrencySettings) -> f64 {
    let without_symbol = if settings.symbol.is_empty() {
        text.to_string()
    } else {
        text.replace(settings.symbol.as_str(), "")
    };
    parse_number_str(&without_symbol)
}

/// Converts a computed value into the leaf written back to the form.
pub fn format_output(value: f64, format: OutputFormat, settings: &CurrencySettings) -> FieldValue {
    match format {
        OutputFormat::Number => FieldValue::Number(value),
        OutputFormat::Currency => FieldValue::Text(format_currency(value, settings)),
    }
}

/// Inserts separators into the integer part of an unsigned decimal string.
fn group_digits(s: &str, grouping: DigitGrouping) -> String {
    let (integer_part, decimal_part) = match s.split_once('.') {
        Some((int, dec)) => (int, Some(dec)),
        None => (s, None),
    };

    let mut result = match grouping {
        DigitGrouping::Western => group_from_right(integer_part, 3, 3),
        DigitGrouping::Indian => group_from_right(integer_part, 3, 2),
    };

    if let Some(decimal) = decimal_part {
        result.push('.');
        result.push_str(decimal);
    }

    result
}

/// Groups digits: the rightmost group has `first` digits, the rest `rest`.
fn group_from_right(digits: &str, first: usize, rest: usize) -> String {
    let len = digits.len();
    if len <= first {
        return digits.to_string();
    }

    let head_len = len - first;
    let head = &digits[..head_len];
    let mut groups: Vec<&str> = Vec::new();

    let mut end = head_len;
    while end > 0 {
        let start = end.saturating_sub(rest);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    let mut result = groups.join(",");
    result.push(',');
    result.push_str(&digits[head_len..]);
    result
}
