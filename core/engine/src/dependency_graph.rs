//! FILENAME: core/engine/src/dependency_graph.rs
//! PURPOSE: Directed graph of field dependencies used to order recalculation.
//! CONTEXT: Nodes are field paths. An edge runs from an input path to the
//! calculated field that reads it. Observed templates never chain calculated
//! fields, in which case every recalculation is a single pass; chains are
//! still ordered topologically and cycles are reported, never looped.
//!
//! TERMINOLOGY:
//! - Precedents: the fields a calculated field reads.
//! - Dependents: the calculated fields that read a given field.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::error::CycleError;

#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// For each calculated field, the fields it reads.
    precedents: HashMap<String, HashSet<String>>,

    /// For each field, the calculated fields that read it.
    dependents: HashMap<String, HashSet<String>>,
}

/// Evaluation order for one recalculation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecalcOrder {
    /// Fields in evaluation order. Members of a cycle appear together at
    /// the point where their cycle was cut.
    pub fields: Vec<String>,
    /// Every cycle that was cut, each as a closed path.
    pub cycles: Vec<CycleError>,
}

impl RecalcOrder {
    pub fn is_acyclic(&self) -> bool {
        self.cycles.is_empty()
    }

    /// The cycle `field` belongs to, if any.
    pub fn cycle_of(&self, field: &str) -> Option<&CycleError> {
        self.cycles
            .iter()
            .find(|cycle| cycle.cycle_path.iter().any(|member| member == field))
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the precedents of `field`, replacing any previous ones.
    pub fn set_dependencies(&mut self, field: &str, new_precedents: HashSet<String>) {
        self.clear_dependencies(field);

        if new_precedents.is_empty() {
            return;
        }

        for prec in &new_precedents {
            self.dependents
                .entry(prec.clone())
                .or_default()
                .insert(field.to_string());
        }
        self.precedents.insert(field.to_string(), new_precedents);
    }

    pub fn clear_dependencies(&mut self, field: &str) {
        if let Some(old_precs) = self.precedents.remove(field) {
            for prec in old_precs {
                if let Some(deps) = self.dependents.get_mut(&prec) {
                    deps.remove(field);
                    if deps.is_empty() {
                        self.dependents.remove(&prec);
                    }
                }
            }
        }
    }

    pub fn get_precedents(&self, field: &str) -> Option<&HashSet<String>> {
        self.precedents.get(field)
    }

    pub fn get_dependents(&self, field: &str) -> Option<&HashSet<String>> {
        self.dependents.get(field)
    }

    /// Fields affected by a change to any of `changed`, in topological order
    /// (precedents before dependents). The changed fields are not included
    /// unless a cycle leads back to them.
    pub fn get_recalc_order(&self, changed: &[&str]) -> RecalcOrder {
        let affected = self.get_all_dependents(changed);
        if affected.is_empty() {
            return RecalcOrder::default();
        }
        self.topological_sort(&affected)
    }

    /// Every field with precedents, in topological order.
    pub fn full_order(&self) -> RecalcOrder {
        let all: BTreeSet<String> = self.precedents.keys().cloned().collect();
        self.topological_sort(&all)
    }

    /// Transitive dependents, found breadth-first.
    fn get_all_dependents(&self, changed: &[&str]) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        let mut queue: VecDeque<&str> = changed.iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            if let Some(deps) = self.dependents.get(current) {
                for dep in deps {
                    if result.insert(dep.clone()) {
                        queue.push_back(dep);
                    }
                }
            }
        }

        result
    }

    /// Kahn's algorithm over a subset of fields. Ties are broken by name so
    /// the order is deterministic. When every remaining field waits on
    /// another, one cycle is cut: its members are emitted together and
    /// their dependents carry on as usual.
    fn topological_sort(&self, fields: &BTreeSet<String>) -> RecalcOrder {
        let mut pending: HashMap<&str, usize> = fields
            .iter()
            .map(|field| {
                let degree = self
                    .precedents
                    .get(field)
                    .map(|precs| precs.iter().filter(|p| fields.contains(*p)).count())
                    .unwrap_or(0);
                (field.as_str(), degree)
            })
            .collect();

        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&field, _)| field)
            .collect();

        let mut plan = RecalcOrder::default();

        loop {
            while let Some(field) = ready.pop_first() {
                pending.remove(field);
                self.release(field, &mut pending, &mut ready);
                plan.fields.push(field.to_string());
            }

            if pending.is_empty() {
                break;
            }

            // Every remaining field waits on a remaining precedent, so
            // walking precedents from any of them reaches a cycle
            let mut stuck: Vec<&str> = pending.keys().copied().collect();
            stuck.sort_unstable();
            let cycle_path = self.find_cycle_path(&stuck);

            let mut members: Vec<&str> = Vec::new();
            for name in &cycle_path {
                if let Some((&member, _)) = pending.get_key_value(name.as_str()) {
                    if !members.contains(&member) {
                        members.push(member);
                    }
                }
            }
            if members.is_empty() {
                break;
            }

            for member in &members {
                pending.remove(member);
            }
            for member in members {
                self.release(member, &mut pending, &mut ready);
                plan.fields.push(member.to_string());
            }
            plan.cycles.push(CycleError { cycle_path });
        }

        plan
    }

    /// Marks `field` as done for each dependent still pending.
    fn release<'a>(
        &'a self,
        field: &str,
        pending: &mut HashMap<&'a str, usize>,
        ready: &mut BTreeSet<&'a str>,
    ) {
        if let Some(deps) = self.dependents.get(field) {
            for dep in deps {
                if let Some(deg) = pending.get_mut(dep.as_str()) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        ready.insert(dep);
                    }
                }
            }
        }
    }

    /// Follows precedents among the stuck fields to report one cycle.
    fn find_cycle_path(&self, cycle_fields: &[&str]) -> Vec<String> {
        let Some(&start) = cycle_fields.first() else {
            return Vec::new();
        };

        let members: HashSet<&str> = cycle_fields.iter().copied().collect();
        let mut path: Vec<&str> = vec![start];
        let mut current = start;

        for _ in 0..cycle_fields.len() {
            let next = self.precedents.get(current).and_then(|precs| {
                let mut candidates: Vec<&str> = precs
                    .iter()
                    .map(String::as_str)
                    .filter(|p| members.contains(p))
                    .collect();
                candidates.sort_unstable();
                candidates.first().copied()
            });

            let Some(next) = next else { break };

            if let Some(pos) = path.iter().position(|&p| p == next) {
                // Trim the lead-in so the path starts and ends on the cycle
                let mut cycle: Vec<String> = path[pos..].iter().map(|s| s.to_string()).collect();
                cycle.push(next.to_string());
                return cycle;
            }
            path.push(next);
            current = next;
        }

        cycle_fields.iter().map(|s| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(fields: &[&str]) -> HashSet<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_and_get_dependencies() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies("total", set_of(&["a", "b"]));

        assert_eq!(graph.get_precedents("total"), Some(&set_of(&["a", "b"])));
        assert!(graph.get_dependents("a").unwrap().contains("total"));
        assert!(graph.get_dependents("b").unwrap().contains("total"));
    }

    #[test]
    fn test_update_dependencies() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies("total", set_of(&["a", "b"]));
        graph.set_dependencies("total", set_of(&["c"]));

        assert!(graph.get_dependents("a").is_none());
        assert!(graph.get_dependents("c").unwrap().contains("total"));
    }

    #[test]
    fn test_clear_dependencies() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies("total", set_of(&["a"]));
        graph.clear_dependencies("total");

        assert!(graph.get_precedents("total").is_none());
        assert!(graph.get_dependents("a").is_none());
        assert!(graph.full_order().fields.is_empty());
    }

    #[test]
    fn test_single_pass_order() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies("land_value", set_of(&["extent", "rate"]));
        graph.set_dependencies("doubled_rate", set_of(&["rate"]));

        let order = graph.get_recalc_order(&["rate"]);
        assert!(order.is_acyclic());
        assert_eq!(order.fields, vec!["doubled_rate", "land_value"]);
        assert!(graph.get_recalc_order(&["unrelated"]).fields.is_empty());
    }

    #[test]
    fn test_chain_order() {
        let mut graph = DependencyGraph::new();
        // fair_value = land_value + building_value, land_value = extent * rate
        graph.set_dependencies("fair_value", set_of(&["land_value", "building_value"]));
        graph.set_dependencies("land_value", set_of(&["extent", "rate"]));

        let order = graph.get_recalc_order(&["rate"]);
        assert_eq!(order.fields, vec!["land_value", "fair_value"]);

        let full = graph.full_order();
        assert_eq!(full.fields, vec!["land_value", "fair_value"]);
        assert!(full.is_acyclic());
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies("a", set_of(&["b"]));
        graph.set_dependencies("b", set_of(&["a", "x"]));

        let order = graph.get_recalc_order(&["x"]);
        assert_eq!(order.cycles.len(), 1);
        assert_eq!(order.cycles[0].cycle_path, vec!["a", "b", "a"]);
        assert_eq!(order.fields, vec!["a", "b"]);
        assert!(!graph.full_order().is_acyclic());
    }

    #[test]
    fn test_cycle_does_not_hide_other_fields() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies("a", set_of(&["b"]));
        graph.set_dependencies("b", set_of(&["a"]));
        // downstream of the cycle
        graph.set_dependencies("c", set_of(&["a", "rate"]));
        // independent of the cycle
        graph.set_dependencies("z", set_of(&["rate"]));

        let full = graph.full_order();
        assert_eq!(full.fields, vec!["z", "a", "b", "c"]);
        assert!(full.cycle_of("a").is_some());
        assert!(full.cycle_of("b").is_some());
        assert!(full.cycle_of("c").is_none());
        assert!(full.cycle_of("z").is_none());
    }

    #[test]
    fn test_two_cycles_are_both_cut() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies("a", set_of(&["b"]));
        graph.set_dependencies("b", set_of(&["a"]));
        graph.set_dependencies("p", set_of(&["q"]));
        graph.set_dependencies("q", set_of(&["p"]));

        let full = graph.full_order();
        assert_eq!(full.cycles.len(), 2);
        assert_eq!(full.fields.len(), 4);
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies("a", set_of(&["a"]));

        let full = graph.full_order();
        assert_eq!(full.cycles[0].cycle_path, vec!["a", "a"]);
        assert_eq!(full.fields, vec!["a"]);
    }
}
