//! FILENAME: core/engine/src/dependency_extractor.rs
//! PURPOSE: Extracts referenced field identifiers from an expression string.
//! CONTEXT: Used when a calculation declaration carries a formula but no
//! explicit dependency list. The result drives both recalculation triggers
//! and the inputs fed to the evaluator.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("identifier pattern is valid")
});

/// Math-helper names that appear in legacy formulas but are not fields.
pub const MATH_HELPERS: &[&str] = &[
    "Math",
    "abs",
    "ceil",
    "floor",
    "round",
    "min",
    "max",
    "pow",
    "sqrt",
    "parseFloat",
    "parseInt",
    "Number",
    "toFixed",
];

/// Returns the distinct identifiers referenced by `expression`, in order
/// of first appearance. Math-helper names are dropped.
pub fn extract_dependencies(expression: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for m in IDENTIFIER.find_iter(expression) {
        let ident = m.as_str();
        if is_math_helper(ident) {
            continue;
        }
        if seen.insert(ident) {
            result.push(ident.to_string());
        }
    }

    result
}

pub fn is_math_helper(ident: &str) -> bool {
    MATH_HELPERS.contains(&ident)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_in_first_appearance_order() {
        assert_eq!(extract_dependencies("a + b + c"), vec!["a", "b", "c"]);
        assert_eq!(
            extract_dependencies("total_extent_plot * valuation_rate"),
            vec!["total_extent_plot", "valuation_rate"]
        );
    }

    #[test]
    fn test_deduplicates() {
        assert_eq!(extract_dependencies("a * a + b - a"), vec!["a", "b"]);
    }

    #[test]
    fn test_drops_math_helpers() {
        assert_eq!(
            extract_dependencies("Math.round(area * rate) + Math.max(x, 0)"),
            vec!["area", "rate", "x"]
        );
    }

    #[test]
    fn test_ignores_numbers_and_operators() {
        assert_eq!(extract_dependencies("(1 + 2.5) * 3 / 4"), Vec::<String>::new());
        assert_eq!(extract_dependencies("_x1 * 2"), vec!["_x1"]);
    }

    #[test]
    fn test_identifier_cannot_start_with_digit() {
        // "2abc" tokenizes as the number 2 followed by "abc"
        assert_eq!(extract_dependencies("2abc"), vec!["abc"]);
    }

    #[test]
    fn test_empty_expression() {
        assert!(extract_dependencies("").is_empty());
    }
}
