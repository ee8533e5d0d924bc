//! FILENAME: core/engine/src/registry.rs
//! PURPOSE: Builds the calculation registry from a template's field tree.
//! CONTEXT: The registry is derived once per template activation by a pure
//! depth-first walk and is read-only afterwards. It maps every calculated
//! field id to its `CalculationConfig`, regardless of nesting depth, and
//! carries the dependency graph used to order recalculation.
//!
//! DECLARATION STYLES (tried in order per field):
//! 1. explicit `calculation` config, used verbatim
//! 2. `calculationMetadata` with a formula and/or dependency list
//! 3. legacy `fieldType: "calculated"` with an inline formula
//!
//! GROUP TOTALS: a field `<group>_total` with no declaration, sitting next
//! to a group field `<group>`, sums the group's direct leaf children.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::calculation::{CalculationConfig, CalculationKind, OutputFormat};
use crate::classifier::classify_formula;
use crate::dependency_extractor::extract_dependencies;
use crate::dependency_graph::{DependencyGraph, RecalcOrder};
use crate::error::{ConfigIssue, CycleError};
use crate::template::{FieldDefinition, Template};

pub const GROUP_TOTAL_SUFFIX: &str = "_total";

/// Where a registered field lives in the form tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLocation {
    /// Full dotted path, used for write-back.
    pub path: String,
    /// Path of the enclosing group, empty at the top level.
    pub scope: String,
}

/// A group-total field bound to the Group Aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTotal {
    pub group_path: String,
    /// Paths of the group's direct leaf children.
    pub child_paths: Vec<String>,
}

/// Something the engine computes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target<'a> {
    Calculated(&'a CalculationConfig),
    GroupTotal(&'a GroupTotal),
}

#[derive(Debug, Clone, Default)]
pub struct CalculationRegistry {
    configs: BTreeMap<String, CalculationConfig>,
    group_totals: BTreeMap<String, GroupTotal>,
    locations: HashMap<String, FieldLocation>,
    /// Tree path -> target id, for targets that are read by other targets.
    ids_by_path: HashMap<String, String>,
    graph: DependencyGraph,
    cycle: Option<CycleError>,
}

impl CalculationRegistry {
    /// Walks `fields` depth-first and registers every calculated field.
    pub fn build(fields: &[FieldDefinition]) -> Self {
        let mut registry = CalculationRegistry::default();
        registry.walk(fields, "");
        registry.build_graph();

        log::debug!(
            target: "calc_engine",
            "registry built: {} calculated fields, {} group totals",
            registry.configs.len(),
            registry.group_totals.len()
        );
        registry
    }

    pub fn from_template(template: &Template) -> Self {
        Self::build(&template.fields)
    }

    fn walk(&mut self, fields: &[FieldDefinition], scope: &str) {
        let group_ids: HashSet<&str> = fields
            .iter()
            .filter(|f| f.is_group())
            .map(|f| f.id.as_str())
            .collect();

        for field in fields {
            let path = join_path(scope, &field.id);

            if let Some(config) = derive_config(field) {
                self.register(&field.id, &path, scope);
                if self.configs.insert(field.id.clone(), config).is_some() {
                    log::warn!(
                        target: "calc_engine",
                        "duplicate calculated field id '{}', keeping the last declaration",
                        field.id
                    );
                }
            } else if let Some(group_id) = field.id.strip_suffix(GROUP_TOTAL_SUFFIX) {
                if group_ids.contains(group_id) && !field.is_group() {
                    if let Some(group) = fields.iter().find(|f| f.id == group_id) {
                        let group_path = join_path(scope, group_id);
                        let child_paths = group
                            .sub_fields
                            .iter()
                            .filter(|child| !child.is_group())
                            .map(|child| join_path(&group_path, &child.id))
                            .collect();
                        self.register(&field.id, &path, scope);
                        self.group_totals.insert(
                            field.id.clone(),
                            GroupTotal {
                                group_path,
                                child_paths,
                            },
                        );
                    }
                }
            }

            if field.is_group() {
                self.walk(&field.sub_fields, &path);
            }
        }
    }

    fn register(&mut self, id: &str, path: &str, scope: &str) {
        self.locations.insert(
            id.to_string(),
            FieldLocation {
                path: path.to_string(),
                scope: scope.to_string(),
            },
        );
        self.ids_by_path.insert(path.to_string(), id.to_string());
    }

    /// Links every target to the graph nodes it reads. A reference to
    /// another target becomes an edge to that target's id; a plain input
    /// is registered under both its scoped and its root-relative path.
    fn build_graph(&mut self) {
        let mut graph = DependencyGraph::new();

        for (id, config) in &self.configs {
            let mut precedents = HashSet::new();
            for dep in config.effective_dependencies() {
                precedents.extend(self.dependency_nodes(id, dep));
            }
            graph.set_dependencies(id, precedents);
        }

        for (id, total) in &self.group_totals {
            let mut precedents = HashSet::new();
            for path in &total.child_paths {
                if let Some(target) = self.ids_by_path.get(path) {
                    precedents.insert(target.clone());
                    continue;
                }
                // Hosts report changes by bare field id as well as by path
                if let Some((_, child)) = path.rsplit_once('.') {
                    if self.target_id_for(child).is_none() {
                        precedents.insert(child.to_string());
                    }
                }
                precedents.insert(path.clone());
            }
            graph.set_dependencies(id, precedents);
        }

        let order = graph.full_order();
        for cycle in &order.cycles {
            log::warn!(target: "calc_engine", "template configuration error: {}", cycle);
        }
        self.cycle = order.cycles.into_iter().next();

        self.graph = graph;
    }

    fn dependency_nodes(&self, id: &str, dep: &str) -> Vec<String> {
        self.input_paths(id, dep)
            .into_iter()
            .map(|path| match self.target_id_for(&path) {
                Some(target) => target.to_string(),
                None => path,
            })
            .collect()
    }

    /// Candidate tree paths for `field` as read by target `id`, most
    /// specific first: relative to the target's group, then from the root.
    pub fn input_paths(&self, id: &str, field: &str) -> Vec<String> {
        match self.locations.get(id) {
            Some(location) if !location.scope.is_empty() => {
                vec![join_path(&location.scope, field), field.to_string()]
            }
            _ => vec![field.to_string()],
        }
    }

    /// The target id a reference resolves to, by id or by path.
    pub fn target_id_for(&self, reference: &str) -> Option<&str> {
        if self.configs.contains_key(reference) || self.group_totals.contains_key(reference) {
            return self.locations.get_key_value(reference).map(|(k, _)| k.as_str());
        }
        self.ids_by_path.get(reference).map(String::as_str)
    }

    pub fn get(&self, id: &str) -> Option<&CalculationConfig> {
        self.configs.get(id)
    }

    pub fn target(&self, id: &str) -> Option<Target<'_>> {
        self.configs
            .get(id)
            .map(Target::Calculated)
            .or_else(|| self.group_totals.get(id).map(Target::GroupTotal))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.configs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Calculated fields in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CalculationConfig)> {
        self.configs.iter()
    }

    pub fn group_totals(&self) -> impl Iterator<Item = (&String, &GroupTotal)> {
        self.group_totals.iter()
    }

    pub fn location(&self, id: &str) -> Option<&FieldLocation> {
        self.locations.get(id)
    }

    /// The configuration cycle found at build time, if any.
    pub fn cycle(&self) -> Option<&CycleError> {
        self.cycle.as_ref()
    }

    /// Targets that directly read `changed`.
    pub fn dependents_of(&self, changed: &str) -> Vec<&str> {
        let mut result: Vec<&str> = self
            .graph
            .get_dependents(changed)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default();
        result.sort_unstable();
        result
    }

    /// Targets to recompute after `changed` (a path or a target id),
    /// in dependency order.
    pub fn recalc_order(&self, changed: &str) -> RecalcOrder {
        let mut seeds = vec![changed];
        if let Some(id) = self.target_id_for(changed) {
            if id != changed {
                seeds.push(id);
            }
        }
        self.graph.get_recalc_order(&seeds)
    }

    /// Every target in dependency order, for a full recompute.
    pub fn full_order(&self) -> RecalcOrder {
        let mut order = self.graph.full_order();
        // Targets with no inputs at all never enter the graph
        for id in self.configs.keys().chain(self.group_totals.keys()) {
            if self.graph.get_precedents(id).is_none() {
                order.fields.push(id.clone());
            }
        }
        order
    }

    /// Static validation of every calculated field, in id order.
    pub fn validate(&self) -> Vec<(String, ConfigIssue)> {
        self.configs
            .iter()
            .flat_map(|(id, config)| {
                config
                    .validate()
                    .into_iter()
                    .map(move |issue| (id.clone(), issue))
            })
            .collect()
    }
}

/// Derives a field's calculation from whichever declaration style it uses.
pub fn derive_config(field: &FieldDefinition) -> Option<CalculationConfig> {
    if let Some(config) = &field.calculation {
        return Some(config.clone());
    }

    if let Some(metadata) = &field.calculation_metadata {
        let has_formula = metadata.formula.as_deref().is_some_and(|f| !f.trim().is_empty());
        let has_deps = metadata.dependencies.as_ref().is_some_and(|d| !d.is_empty());
        if has_formula || has_deps {
            return Some(derive_from_formula(
                metadata.formula.as_deref().filter(|f| !f.trim().is_empty()),
                metadata.dependencies.clone(),
                metadata.output_format.unwrap_or_default(),
            ));
        }
    }

    field
        .legacy_formula()
        .filter(|f| !f.trim().is_empty())
        .map(|formula| derive_from_formula(Some(formula), None, OutputFormat::Number))
}

/// Builds a config from a formula and optional explicit dependencies.
/// A dependency list with no formula is summed.
pub fn derive_from_formula(
    formula: Option<&str>,
    dependencies: Option<Vec<String>>,
    output_format: OutputFormat,
) -> CalculationConfig {
    let dependencies =
        dependencies.unwrap_or_else(|| formula.map(extract_dependencies).unwrap_or_default());

    let kind = match formula {
        Some(formula) => classify_formula(formula, dependencies.len()),
        None => CalculationKind::Sum,
    };

    CalculationConfig {
        kind,
        source_fields: dependencies.clone(),
        dependencies: Some(dependencies),
        custom_expression: formula.map(str::to_string),
        output_format,
    }
}

fn join_path(scope: &str, id: &str) -> String {
    if scope.is_empty() {
        id.to_string()
    } else {
        format!("{}.{}", scope, id)
    }
}
