//! FILENAME: core/engine/src/template.rs
//! PURPOSE: Field-definition tree of a report template.
//! CONTEXT: Templates are fetched per (bank, property type) by the host and
//! are immutable once loaded. A calculated field may be declared in one of
//! three styles:
//! - `calculation`: an explicit `CalculationConfig`
//! - `calculationMetadata`: a formula and/or dependency list
//! - legacy: `fieldType: "calculated"` with an inline `formula`

use serde::{Deserialize, Serialize};

use crate::calculation::{CalculationConfig, OutputFormat};
use crate::error::TemplateError;

pub const LEGACY_CALCULATED_TYPE: &str = "calculated";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationMetadata {
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
    #[serde(default)]
    pub output_format: Option<OutputFormat>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation: Option<CalculationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_metadata: Option<CalculationMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_fields: Vec<FieldDefinition>,
}

impl FieldDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        FieldDefinition {
            id: id.into(),
            ..Default::default()
        }
    }

    /// A legacy `calculated` field with an inline formula.
    pub fn legacy(id: impl Into<String>, formula: impl Into<String>) -> Self {
        FieldDefinition {
            id: id.into(),
            field_type: Some(LEGACY_CALCULATED_TYPE.to_string()),
            formula: Some(formula.into()),
            ..Default::default()
        }
    }

    pub fn with_calculation(mut self, calculation: CalculationConfig) -> Self {
        self.calculation = Some(calculation);
        self
    }

    pub fn with_metadata(mut self, metadata: CalculationMetadata) -> Self {
        self.calculation_metadata = Some(metadata);
        self
    }

    pub fn with_sub_fields(mut self, sub_fields: Vec<FieldDefinition>) -> Self {
        self.sub_fields = sub_fields;
        self
    }

    pub fn is_group(&self) -> bool {
        !self.sub_fields.is_empty()
    }

    /// The inline formula of a legacy calculated field.
    pub fn legacy_formula(&self) -> Option<&str> {
        match self.field_type.as_deref() {
            Some(LEGACY_CALCULATED_TYPE) => self.formula.as_deref(),
            _ => None,
        }
    }
}

/// A bank- and property-type-specific report template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub bank: String,
    #[serde(default)]
    pub property_type: String,
    pub fields: Vec<FieldDefinition>,
}

impl Template {
    pub fn from_json_str(json: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::CalculationKind;

    const TEMPLATE: &str = r#"{
        "bank": "SBI",
        "propertyType": "land",
        "fields": [
            { "id": "total_extent_plot", "type": "number", "label": "Extent" },
            { "id": "valuation_rate", "type": "number" },
            {
                "id": "land_value",
                "calculation": {
                    "kind": "custom",
                    "sourceFields": ["total_extent_plot", "valuation_rate"],
                    "customExpression": "total_extent_plot * valuation_rate",
                    "outputFormat": "currency"
                }
            },
            {
                "id": "building",
                "subFields": [
                    { "id": "ground", "type": "number" },
                    { "id": "built_total", "type": "calculated", "formula": "ground + first" }
                ]
            },
            {
                "id": "depreciated",
                "calculationMetadata": { "formula": "land_value - depreciation" }
            }
        ]
    }"#;

    #[test]
    fn test_loads_template_json() {
        let template = Template::from_json_str(TEMPLATE).unwrap();
        assert_eq!(template.bank, "SBI");
        assert_eq!(template.property_type, "land");
        assert_eq!(template.fields.len(), 5);

        let land_value = &template.fields[2];
        let config = land_value.calculation.as_ref().unwrap();
        assert_eq!(config.kind, CalculationKind::Custom);
        assert_eq!(config.output_format, OutputFormat::Currency);

        let building = &template.fields[3];
        assert!(building.is_group());
        assert_eq!(building.sub_fields[1].legacy_formula(), Some("ground + first"));

        let metadata = template.fields[4].calculation_metadata.as_ref().unwrap();
        assert_eq!(metadata.formula.as_deref(), Some("land_value - depreciation"));
        assert_eq!(metadata.dependencies, None);
    }

    #[test]
    fn test_formula_without_calculated_type_is_not_legacy() {
        let mut field = FieldDefinition::new("x");
        field.formula = Some("a + b".to_string());
        assert_eq!(field.legacy_formula(), None);
    }

    #[test]
    fn test_rejects_malformed_template() {
        assert!(matches!(
            Template::from_json_str(r#"{"fields": [{"label": "no id"}]}"#),
            Err(TemplateError::Json(_))
        ));
    }
}
