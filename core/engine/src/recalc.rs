//! FILENAME: core/engine/src/recalc.rs
//! PURPOSE: Recomputes calculated fields after a value change.
//! CONTEXT: This is the composition the host drives. On every change it
//! asks for the affected targets, computes them in dependency order and
//! receives a list of `FieldUpdate`s to write back. The form tree is only
//! read here; values computed earlier in the same pass are kept in an
//! overlay so chained fields see fresh inputs.

use std::collections::HashMap;

use crate::calculation::{CalculationConfig, CalculationKind, OutputFormat};
use crate::coercion::{to_number, to_number_opt};
use crate::diagnostics::DiagnosticSink;
use crate::dependency_graph::RecalcOrder;
use crate::error::CalcWarning;
use crate::evaluator::{try_evaluate_expression, Variables};
use crate::group::sum_direct_children_with;
use crate::number_format::{format_output, parse_currency, round_to};
use crate::registry::{CalculationRegistry, GroupTotal, Target};
use crate::settings::EngineSettings;
use crate::value_tree::{FieldValue, FormValues};

/// A computed value to be written back by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field_id: String,
    pub path: String,
    pub value: FieldValue,
}

/// Computes one calculation, reading each input path through `lookup`.
/// Missing inputs are the caller's concern; `lookup` should return 0.
pub fn compute<F>(config: &CalculationConfig, mut lookup: F) -> Result<f64, CalcWarning>
where
    F: FnMut(&str) -> f64,
{
    let value: f64 = match &config.kind {
        CalculationKind::Sum => config.source_fields.iter().map(|f| lookup(f.as_str())).sum(),
        CalculationKind::Product => config.source_fields.iter().map(|f| lookup(f.as_str())).product(),
        CalculationKind::Average => {
            if config.source_fields.is_empty() {
                0.0
            } else {
                let total: f64 = config.source_fields.iter().map(|f| lookup(f.as_str())).sum();
                total / config.source_fields.len() as f64
            }
        }
        CalculationKind::Custom => {
            let expression = config
                .custom_expression
                .as_deref()
                .ok_or(CalcWarning::MissingExpression)?;
            let variables: Variables = config
                .input_fields()
                .into_iter()
                .map(|field| (field.to_string(), lookup(field)))
                .collect();
            try_evaluate_expression(expression, &variables)?
        }
        CalculationKind::Unknown(kind) => return Err(CalcWarning::UnknownKind(kind.clone())),
    };

    if !value.is_finite() {
        return Err(CalcWarning::EvaluationFailure {
            expression: config.kind.to_string(),
            reason: format!("non-finite result {}", value),
        });
    }
    Ok(value)
}

/// Computes one calculation against the tree, resolving input paths from
/// the root. Failures are reported to `sink` and yield 0.
pub fn compute_field(
    field_id: &str,
    config: &CalculationConfig,
    values: &FormValues,
    sink: &mut dyn DiagnosticSink,
) -> f64 {
    match compute(config, |path| to_number_opt(values.resolve(path))) {
        Ok(value) => value,
        Err(warning) => {
            sink.report(field_id, &warning);
            0.0
        }
    }
}

/// Recomputes every target affected by a change to `changed_path`.
/// Fields caught in a cycle are written as 0 and reported to `sink`;
/// everything else is computed normally.
pub fn recalculate(
    registry: &CalculationRegistry,
    values: &FormValues,
    changed_path: &str,
    settings: &EngineSettings,
    sink: &mut dyn DiagnosticSink,
) -> Vec<FieldUpdate> {
    let order = registry.recalc_order(changed_path);

    log::debug!(
        target: "calc_engine",
        "'{}' changed, recomputing {} field(s)",
        changed_path,
        order.fields.len()
    );

    Pass::new(registry, values, settings).run(&order, sink)
}

/// Recomputes every target, e.g. when a template is activated.
pub fn recalculate_all(
    registry: &CalculationRegistry,
    values: &FormValues,
    settings: &EngineSettings,
    sink: &mut dyn DiagnosticSink,
) -> Vec<FieldUpdate> {
    let order = registry.full_order();
    Pass::new(registry, values, settings).run(&order, sink)
}

/// Writes updates into the tree. Failed writes are logged and skipped.
/// Returns the number of updates applied.
pub fn apply_updates(values: &mut FormValues, updates: &[FieldUpdate]) -> usize {
    let mut applied = 0;
    for update in updates {
        match values.set_leaf(&update.path, update.value.clone()) {
            Ok(()) => applied += 1,
            Err(err) => {
                log::warn!(target: "calc_engine", "cannot write '{}': {}", update.field_id, err)
            }
        }
    }
    applied
}

/// One ordered recomputation over a fixed snapshot of the tree.
struct Pass<'a> {
    registry: &'a CalculationRegistry,
    values: &'a FormValues,
    settings: &'a EngineSettings,
    /// Values computed in this pass, by target id, as they will read back.
    overlay: HashMap<String, f64>,
}

impl<'a> Pass<'a> {
    fn new(
        registry: &'a CalculationRegistry,
        values: &'a FormValues,
        settings: &'a EngineSettings,
    ) -> Self {
        Pass {
            registry,
            values,
            settings,
            overlay: HashMap::new(),
        }
    }

    fn run(mut self, order: &RecalcOrder, sink: &mut dyn DiagnosticSink) -> Vec<FieldUpdate> {
        for cycle in &order.cycles {
            log::warn!(target: "calc_engine", "zeroing fields in cycle: {}", cycle);
        }

        let mut updates = Vec::with_capacity(order.fields.len());

        for id in &order.fields {
            let (Some(target), Some(location)) =
                (self.registry.target(id), self.registry.location(id))
            else {
                continue;
            };

            let output_format = match target {
                Target::Calculated(config) => config.output_format,
                Target::GroupTotal(_) => OutputFormat::Number,
            };

            let value = if let Some(cycle) = order.cycle_of(id) {
                sink.report(id, &CalcWarning::CircularReference(cycle.clone()));
                0.0
            } else {
                match target {
                    Target::Calculated(config) => {
                        match compute(config, |field| self.read_input(id, field)) {
                            Ok(value) => value,
                            Err(warning) => {
                                sink.report(id, &warning);
                                0.0
                            }
                        }
                    }
                    Target::GroupTotal(total) => self.group_total(total),
                }
            };

            let read_back = match output_format {
                OutputFormat::Number => value,
                OutputFormat::Currency => round_to(value, self.settings.currency.decimal_places),
            };
            self.overlay.insert(id.clone(), read_back);

            updates.push(FieldUpdate {
                field_id: id.clone(),
                path: location.path.clone(),
                value: format_output(value, output_format, &self.settings.currency),
            });
        }

        updates
    }

    /// Reads `field` as seen by target `id`: scoped path first, then root.
    fn read_input(&self, id: &str, field: &str) -> f64 {
        for path in self.registry.input_paths(id, field) {
            if let Some(value) = self.fresh_value(&path) {
                return value;
            }
            if let Some(value) = self.values.resolve(&path) {
                return self.leaf_number(value);
            }
        }
        0.0
    }

    fn fresh_value(&self, path: &str) -> Option<f64> {
        self.registry
            .target_id_for(path)
            .and_then(|target| self.overlay.get(target).copied())
    }

    /// Text leaves may carry the configured currency symbol, which the
    /// generic coercion does not know about.
    fn leaf_number(&self, value: &FieldValue) -> f64 {
        match value {
            FieldValue::Text(text) => parse_currency(text, &self.settings.currency),
            other => to_number(other),
        }
    }

    fn group_total(&self, total: &GroupTotal) -> f64 {
        match self.values.resolve(&total.group_path) {
            Some(FieldValue::Group(group)) => sum_direct_children_with(group, |key, value| {
                let child_path = format!("{}.{}", total.group_path, key);
                self.fresh_value(&child_path)
                    .unwrap_or_else(|| self.leaf_number(value))
            }),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn lookup_from<'a>(pairs: &'a [(&'a str, f64)]) -> impl Fn(&str) -> f64 + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| *v)
                .unwrap_or(0.0)
        }
    }

    #[test]
    fn test_sum_product_average() {
        let inputs = [("a", 2.0), ("b", 3.0), ("c", 4.0)];
        let src = fields(&["a", "b", "c"]);

        let sum = CalculationConfig::new(CalculationKind::Sum, src.clone());
        let product = CalculationConfig::new(CalculationKind::Product, src.clone());
        let average = CalculationConfig::new(CalculationKind::Average, src);

        assert_eq!(compute(&sum, lookup_from(&inputs)), Ok(9.0));
        assert_eq!(compute(&product, lookup_from(&inputs)), Ok(24.0));
        assert_eq!(compute(&average, lookup_from(&inputs)), Ok(3.0));
    }

    #[test]
    fn test_average_of_nothing_is_zero() {
        let average = CalculationConfig::new(CalculationKind::Average, vec![]);
        assert_eq!(compute(&average, lookup_from(&[])), Ok(0.0));
    }

    #[test]
    fn test_custom_reads_dependencies() {
        let config = CalculationConfig::custom("(a + b) / 2", fields(&["a", "b"]));
        assert_eq!(compute(&config, lookup_from(&[("a", 3.0), ("b", 5.0)])), Ok(4.0));
    }

    #[test]
    fn test_unknown_kind_and_missing_expression() {
        let unknown = CalculationConfig::new(CalculationKind::from("median".to_string()), fields(&["a"]));
        assert_eq!(
            compute(&unknown, lookup_from(&[])),
            Err(CalcWarning::UnknownKind("median".to_string()))
        );

        let custom = CalculationConfig::new(CalculationKind::Custom, fields(&["a"]));
        assert_eq!(compute(&custom, lookup_from(&[])), Err(CalcWarning::MissingExpression));
    }

    #[test]
    fn test_overflow_is_failure() {
        let product = CalculationConfig::new(CalculationKind::Product, fields(&["a", "b"]));
        let result = compute(&product, lookup_from(&[("a", 1e308), ("b", 1e308)]));
        assert!(matches!(result, Err(CalcWarning::EvaluationFailure { .. })));
    }

    #[test]
    fn test_compute_field_reports_and_zeroes() {
        let values = FormValues::new().with("a", 10.0);
        let config = CalculationConfig::custom("a / 0", fields(&["a"]));
        let mut sink = CollectingSink::new();

        assert_eq!(compute_field("ratio", &config, &values, &mut sink), 0.0);
        assert_eq!(sink.for_field("ratio").len(), 1);
    }

    #[test]
    fn test_missing_input_is_silent_zero() {
        let values = FormValues::new().with("a", 10.0);
        let config = CalculationConfig::new(CalculationKind::Sum, fields(&["a", "missing"]));
        let mut sink = CollectingSink::new();

        assert_eq!(compute_field("total", &config, &values, &mut sink), 10.0);
        assert!(sink.is_empty());
    }
}
