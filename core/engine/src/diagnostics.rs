//! FILENAME: core/engine/src/diagnostics.rs
//! PURPOSE: Telemetry hook for degraded calculations.
//! CONTEXT: Every recalculation entry point takes a `DiagnosticSink`. The
//! host decides whether warnings go to the log, to a buffer that is
//! uploaded later, or both.

use crate::error::CalcWarning;

/// Receives one report per field whose result was forced to 0.
pub trait DiagnosticSink {
    fn report(&mut self, field_id: &str, warning: &CalcWarning);
}

/// Forwards every report to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, field_id: &str, warning: &CalcWarning) {
        log::warn!(target: "calc_engine", "field '{}' set to 0: {}", field_id, warning);
    }
}

/// A recorded warning.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub field_id: String,
    pub warning: CalcWarning,
}

/// Keeps reports in memory and also logs them.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Warnings reported for a single field.
    pub fn for_field(&self, field_id: &str) -> Vec<&CalcWarning> {
        self.diagnostics
            .iter()
            .filter(|d| d.field_id == field_id)
            .map(|d| &d.warning)
            .collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, field_id: &str, warning: &CalcWarning) {
        LogSink.report(field_id, warning);
        self.diagnostics.push(Diagnostic {
            field_id: field_id.to_string(),
            warning: warning.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_groups_by_field() {
        let mut sink = CollectingSink::new();
        assert!(sink.is_empty());

        sink.report("a", &CalcWarning::MissingExpression);
        sink.report("b", &CalcWarning::UnknownKind("median".to_string()));
        sink.report("a", &CalcWarning::UnknownKind("mode".to_string()));

        assert_eq!(sink.diagnostics.len(), 3);
        assert_eq!(sink.for_field("a").len(), 2);
        assert_eq!(
            sink.for_field("b"),
            vec![&CalcWarning::UnknownKind("median".to_string())]
        );
    }
}
