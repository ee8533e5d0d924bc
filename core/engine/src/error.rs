//! FILENAME: core/engine/src/error.rs
//! PURPOSE: Error and warning types for the calculated-field engine.
//! CONTEXT: Evaluation problems never propagate to the form. They are
//! reported as `CalcWarning` and the affected field degrades to 0.

use thiserror::Error;

/// A condition that forced a calculated field to 0.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcWarning {
    #[error("unsafe expression rejected after substitution: {substituted}")]
    UnsafeExpression {
        expression: String,
        substituted: String,
    },

    #[error("evaluation of '{expression}' failed: {reason}")]
    EvaluationFailure { expression: String, reason: String },

    #[error("unknown calculation kind: {0}")]
    UnknownKind(String),

    #[error("custom calculation has no expression")]
    MissingExpression,

    #[error("{0}")]
    CircularReference(CycleError),
}

/// A static problem found in a registry entry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigIssue {
    #[error("sourceFields is empty")]
    EmptySourceFields,

    #[error("custom calculation has no customExpression")]
    MissingCustomExpression,

    #[error("expression references '{0}' which is not listed in dependencies")]
    UncoveredIdentifier(String),

    #[error("unknown calculation kind: {0}")]
    UnknownKind(String),
}

/// Calculated fields that feed back into themselves.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("circular calculation detected: {}", .cycle_path.join(" -> "))]
pub struct CycleError {
    /// The fields involved in the cycle, in order.
    pub cycle_path: Vec<String>,
}

/// Host write-back failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WriteError {
    #[error("path '{0}' does not exist in the form")]
    MissingPath(String),

    #[error("path '{0}' is a group and cannot be overwritten by a leaf")]
    GroupTarget(String),

    #[error("path is empty")]
    EmptyPath,
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("invalid template JSON: {0}")]
    Json(#[from] serde_json::Error),
}
