//! FILENAME: core/engine/src/classifier.rs
//! PURPOSE: Infers a calculation kind from the shape of a legacy formula.
//! CONTEXT: Only metadata and legacy inline-formula declarations are
//! classified. Explicitly typed configs bypass this module.
//!
//! The heuristics run in a fixed order and are intentionally shallow:
//! `a + b * c` classifies as Sum. Existing templates depend on this
//! ordering, so it must not be "corrected" here.

use crate::calculation::CalculationKind;

/// Classifies `expression` given how many dependencies it references.
pub fn classify_formula(expression: &str, dependency_count: usize) -> CalculationKind {
    if expression.contains('*') && dependency_count == 2 {
        return CalculationKind::Product;
    }
    if expression.contains('+') && dependency_count >= 2 {
        return CalculationKind::Sum;
    }
    if expression.contains(&['/', '-', '(', ')'][..]) {
        return CalculationKind::Custom;
    }
    CalculationKind::Custom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_factor_product() {
        assert_eq!(classify_formula("a * b", 2), CalculationKind::Product);
    }

    #[test]
    fn test_product_requires_exactly_two() {
        // Three factors fall through to the operator checks
        assert_eq!(classify_formula("a * b * c", 3), CalculationKind::Custom);
        assert_eq!(classify_formula("a * 2", 1), CalculationKind::Custom);
    }

    #[test]
    fn test_sum() {
        assert_eq!(classify_formula("a + b + c", 3), CalculationKind::Sum);
        assert_eq!(classify_formula("a + b", 2), CalculationKind::Sum);
    }

    #[test]
    fn test_mixed_expression_keeps_heuristic_order() {
        assert_eq!(classify_formula("a + b * c", 3), CalculationKind::Sum);
        assert_eq!(classify_formula("a * b + c", 2), CalculationKind::Product);
    }

    #[test]
    fn test_other_operators_are_custom() {
        assert_eq!(classify_formula("a / b", 2), CalculationKind::Custom);
        assert_eq!(classify_formula("a - b", 2), CalculationKind::Custom);
        assert_eq!(classify_formula("(a)", 1), CalculationKind::Custom);
        assert_eq!(classify_formula("a + 1", 1), CalculationKind::Custom);
    }

    #[test]
    fn test_fallback_is_custom() {
        assert_eq!(classify_formula("a", 1), CalculationKind::Custom);
        assert_eq!(classify_formula("", 0), CalculationKind::Custom);
    }
}
