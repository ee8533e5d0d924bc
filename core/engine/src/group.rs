//! FILENAME: core/engine/src/group.rs
//! PURPOSE: Sums the direct leaf children of a group field.
//! CONTEXT: Fallback for "group total" fields that have no calculation
//! declaration. Only one level is summed; nested groups are skipped.

use crate::coercion::to_number;
use crate::value_tree::{FieldValue, FormValues};

/// Sums the coerced values of the direct leaf children of `group`.
pub fn sum_direct_children(group: &FormValues) -> f64 {
    sum_direct_children_with(group, |_, value| to_number(value))
}

/// Sums the direct leaf children of `group`, reading each child through
/// `value_of(key, value)`. Nested groups are never visited.
pub fn sum_direct_children_with<F>(group: &FormValues, mut value_of: F) -> f64
where
    F: FnMut(&str, &FieldValue) -> f64,
{
    group
        .iter()
        .filter(|(_, value)| !value.is_group())
        .map(|(key, value)| value_of(key, value))
        .sum()
}

/// Resolves `group_path` and sums its direct leaf children.
/// A missing path or a leaf at that path yields 0.
pub fn group_total(values: &FormValues, group_path: &str) -> f64 {
    match values.resolve(group_path) {
        Some(FieldValue::Group(group)) => sum_direct_children(group),
        _ => 0.0,
    }
}
