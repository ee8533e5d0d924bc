//! FILENAME: core/engine/src/calculation.rs
//! PURPOSE: Calculation configuration attached to a calculated field.
//! CONTEXT: A `CalculationConfig` is either declared verbatim in a template
//! or derived by the registry builder from metadata / legacy formulas.

use serde::{Deserialize, Serialize};

use crate::dependency_extractor::extract_dependencies;
use crate::error::ConfigIssue;

/// The calculation strategy.
///
/// Unknown kind strings survive deserialization as `Unknown` so that a
/// template typo degrades one field instead of failing the whole load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CalculationKind {
    Sum,
    Product,
    Average,
    Custom,
    Unknown(String),
}

impl From<String> for CalculationKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "sum" => CalculationKind::Sum,
            "product" => CalculationKind::Product,
            "average" => CalculationKind::Average,
            "custom" => CalculationKind::Custom,
            _ => CalculationKind::Unknown(kind),
        }
    }
}

impl From<CalculationKind> for String {
    fn from(kind: CalculationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl CalculationKind {
    pub fn as_str(&self) -> &str {
        match self {
            CalculationKind::Sum => "sum",
            CalculationKind::Product => "product",
            CalculationKind::Average => "average",
            CalculationKind::Custom => "custom",
            CalculationKind::Unknown(kind) => kind,
        }
    }
}

impl std::fmt::Display for CalculationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a computed value is written back to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    #[default]
    Number,
    Currency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationConfig {
    pub kind: CalculationKind,
    pub source_fields: Vec<String>,
    /// Fields whose change triggers recomputation. Defaults to `source_fields`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_expression: Option<String>,
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl CalculationConfig {
    pub fn new(kind: CalculationKind, source_fields: Vec<String>) -> Self {
        CalculationConfig {
            kind,
            source_fields,
            dependencies: None,
            custom_expression: None,
            output_format: OutputFormat::Number,
        }
    }

    /// Custom config whose dependencies are the given list.
    pub fn custom(expression: impl Into<String>, dependencies: Vec<String>) -> Self {
        CalculationConfig {
            kind: CalculationKind::Custom,
            source_fields: dependencies.clone(),
            dependencies: Some(dependencies),
            custom_expression: Some(expression.into()),
            output_format: OutputFormat::Number,
        }
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    /// The fields that drive recomputation.
    pub fn effective_dependencies(&self) -> &[String] {
        self.dependencies.as_deref().unwrap_or(&self.source_fields)
    }

    /// Every field path whose value the calculation reads.
    pub fn input_fields(&self) -> Vec<&str> {
        let mut inputs: Vec<&str> = Vec::new();
        for field in self.source_fields.iter().chain(self.effective_dependencies()) {
            if !inputs.contains(&field.as_str()) {
                inputs.push(field);
            }
        }
        inputs
    }

    /// Static checks. Issues are reported, never enforced: a malformed
    /// config still evaluates (to 0).
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.source_fields.is_empty() {
            issues.push(ConfigIssue::EmptySourceFields);
        }

        match (&self.kind, &self.custom_expression) {
            (CalculationKind::Unknown(kind), _) => {
                issues.push(ConfigIssue::UnknownKind(kind.clone()));
            }
            (CalculationKind::Custom, None) => {
                issues.push(ConfigIssue::MissingCustomExpression);
            }
            (CalculationKind::Custom, Some(expression)) => {
                let deps = self.effective_dependencies();
                for ident in extract_dependencies(expression) {
                    if !deps.iter().any(|d| d == &ident) {
                        issues.push(ConfigIssue::UncoveredIdentifier(ident));
                    }
                }
            }
            _ => {}
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_kind_from_string() {
        assert_eq!(CalculationKind::from("sum".to_string()), CalculationKind::Sum);
        assert_eq!(CalculationKind::from("custom".to_string()), CalculationKind::Custom);
        assert_eq!(
            CalculationKind::from("median".to_string()),
            CalculationKind::Unknown("median".to_string())
        );
    }

    #[test]
    fn test_deserialize_explicit_config() {
        let config: CalculationConfig = serde_json::from_value(json!({
            "kind": "custom",
            "sourceFields": ["total_extent_plot", "valuation_rate"],
            "customExpression": "total_extent_plot * valuation_rate",
            "outputFormat": "currency"
        }))
        .unwrap();

        assert_eq!(config.kind, CalculationKind::Custom);
        assert_eq!(config.output_format, OutputFormat::Currency);
        assert_eq!(
            config.effective_dependencies(),
            &fields(&["total_extent_plot", "valuation_rate"])[..]
        );
    }

    #[test]
    fn test_unknown_kind_survives_deserialization() {
        let config: CalculationConfig =
            serde_json::from_value(json!({"kind": "median", "sourceFields": ["a"]})).unwrap();
        assert_eq!(config.kind, CalculationKind::Unknown("median".to_string()));
        assert_eq!(config.output_format, OutputFormat::Number);
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({"kind": "median", "sourceFields": ["a"], "outputFormat": "number"})
        );
    }

    #[test]
    fn test_explicit_dependencies_override_source_fields() {
        let mut config = CalculationConfig::new(CalculationKind::Sum, fields(&["a", "b"]));
        config.dependencies = Some(fields(&["a", "b", "trigger"]));

        assert_eq!(config.effective_dependencies(), &fields(&["a", "b", "trigger"])[..]);
        assert_eq!(config.input_fields(), vec!["a", "b", "trigger"]);
    }

    #[test]
    fn test_validate_well_formed() {
        let config = CalculationConfig::custom("a * b", fields(&["a", "b"]));
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let config = CalculationConfig::new(CalculationKind::Custom, vec![]);
        assert_eq!(
            config.validate(),
            vec![ConfigIssue::EmptySourceFields, ConfigIssue::MissingCustomExpression]
        );

        let config = CalculationConfig::custom("a * b + c", fields(&["a", "b"]));
        assert_eq!(
            config.validate(),
            vec![ConfigIssue::UncoveredIdentifier("c".to_string())]
        );

        let config = CalculationConfig::new(CalculationKind::from("mode".to_string()), fields(&["a"]));
        assert_eq!(config.validate(), vec![ConfigIssue::UnknownKind("mode".to_string())]);
    }
}
