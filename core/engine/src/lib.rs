//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the calculated-field engine.
//! CONTEXT: Re-exports public types and modules for use by the form host.
//!
//! PIPELINE (per template activation):
//!   Template --> CalculationRegistry::build --> recalculate_all
//! PIPELINE (per value change):
//!   changed path --> registry.recalc_order --> compute (kind dispatch)
//!   --> format_output --> FieldUpdate --> host write-back
//! Fields caught in a dependency cycle are written as 0 with a
//! `CalcWarning::CircularReference`; the rest of the form still computes.

pub mod calculation;
pub mod classifier;
pub mod coercion;
pub mod dependency_extractor;
pub mod dependency_graph;
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod group;
pub mod number_format;
pub mod recalc;
pub mod registry;
pub mod settings;
pub mod template;
pub mod value_tree;

// Re-export commonly used types at the crate root
pub use calculation::{CalculationConfig, CalculationKind, OutputFormat};
pub use classifier::classify_formula;
pub use coercion::{parse_number_str, to_number};
pub use dependency_extractor::extract_dependencies;
pub use dependency_graph::{DependencyGraph, RecalcOrder};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, LogSink};
pub use error::{CalcWarning, ConfigIssue, CycleError, SettingsError, TemplateError, WriteError};
pub use evaluator::{evaluate_expression, try_evaluate_expression, Variables};
pub use group::{group_total, sum_direct_children};
pub use number_format::{format_currency, format_output, parse_currency, round_to};
pub use recalc::{apply_updates, compute, compute_field, recalculate, recalculate_all, FieldUpdate};
pub use registry::{CalculationRegistry, FieldLocation, GroupTotal, Target};
pub use settings::{CurrencySettings, DigitGrouping, EngineSettings};
pub use template::{CalculationMetadata, FieldDefinition, Template};
pub use value_tree::{FieldValue, FormValues};
