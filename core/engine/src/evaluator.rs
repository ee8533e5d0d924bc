//! FILENAME: core/engine/src/evaluator.rs
//! PURPOSE: Safely evaluates a custom calculation expression.
//! CONTEXT: Evaluation is a fixed three-stage pipeline:
//!   1. exact-match substitution of every known field reference
//!   2. a character whitelist over the substituted text
//!   3. the arithmetic-only parser from `calc-parser`
//!
//! Anything that survives stage 2 contains only digits, whitespace,
//! `+ - * / ( ) .`, so no identifier or call can reach the parser.
//! Every failure degrades to 0.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::coercion::finite_or_zero;
use crate::error::CalcWarning;

static ARITHMETIC_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9\s+\-*/().]+$").expect("whitelist pattern is valid")
});

/// Identifier -> value bindings for one evaluation.
pub type Variables = HashMap<String, f64>;

/// A field reference as written in an expression: an identifier,
/// optionally continued with dotted segments.
static FIELD_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_.]*").expect("field token pattern is valid")
});

/// Replaces every field reference that exactly matches a variable name
/// with its value. A dotted path is one reference, so `building.ground`
/// is never split into `building` and `ground`. References that match no
/// variable are left as written.
pub fn substitute(expression: &str, variables: &Variables) -> String {
    let mut result = String::with_capacity(expression.len());
    let mut last = 0;

    for token in FIELD_TOKEN.find_iter(expression) {
        // Glued to a number, as in `2abc`; not a reference on its own
        let glued = expression[..token.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if glued {
            continue;
        }

        if let Some(&value) = variables.get(token.as_str()) {
            result.push_str(&expression[last..token.start()]);
            result.push_str(&number_literal(value));
            last = token.end();
        }
    }

    result.push_str(&expression[last..]);
    result
}

/// Renders a value as an arithmetic literal. Negative values are
/// parenthesized so `a - b` with b = -3 reads `10 - (-3)`.
fn number_literal(value: f64) -> String {
    let value = finite_or_zero(value);
    if value < 0.0 {
        format!("({})", value)
    } else {
        // Display for f64 never uses exponent notation.
        format!("{}", value)
    }
}

/// Returns true if `text` contains only arithmetic characters.
pub fn is_arithmetic_only(text: &str) -> bool {
    ARITHMETIC_ONLY.is_match(text)
}

/// Substitutes, whitelists, parses and evaluates `expression`.
pub fn try_evaluate_expression(expression: &str, variables: &Variables) -> Result<f64, CalcWarning> {
    let substituted = substitute(expression, variables);

    if !is_arithmetic_only(&substituted) {
        return Err(CalcWarning::UnsafeExpression {
            expression: expression.to_string(),
            substituted,
        });
    }

    let failure = |reason: String| CalcWarning::EvaluationFailure {
        expression: expression.to_string(),
        reason,
    };

    let ast = calc_parser::parse(&substituted).map_err(|e| failure(e.to_string()))?;
    let value = calc_parser::evaluate(&ast).map_err(|e| failure(e.to_string()))?;

    if !value.is_finite() {
        return Err(failure(format!("non-finite result {}", value)));
    }

    log::debug!(target: "calc_engine", "evaluated '{}' as '{}' = {}", expression, substituted, value);
    Ok(value)
}

/// Evaluates `expression`, logging a warning and returning 0 on failure.
pub fn evaluate_expression(expression: &str, variables: &Variables) -> f64 {
    match try_evaluate_expression(expression, variables) {
        Ok(value) => value,
        Err(warning) => {
            log::warn!(target: "calc_engine", "{}", warning);
            0.0
        }
    }
}
