//! FILENAME: tests/common/mod.rs
//! Fixtures for calculated-field engine integration tests.

#![allow(dead_code)]

use calc_engine::{CalculationRegistry, CollectingSink, EngineSettings, FormValues, Template};
use serde_json::{json, Value};

/// A land-and-building template using all three declaration styles.
pub const LAND_AND_BUILDING: &str = r#"{
    "bank": "SBI",
    "propertyType": "land_and_building",
    "fields": [
        { "id": "total_extent_plot", "type": "number" },
        { "id": "valuation_rate", "type": "number" },
        {
            "id": "land_value",
            "calculation": {
                "kind": "custom",
                "sourceFields": ["total_extent_plot", "valuation_rate"],
                "dependencies": ["total_extent_plot", "valuation_rate"],
                "customExpression": "total_extent_plot * valuation_rate",
                "outputFormat": "currency"
            }
        },
        {
            "id": "built_up_area",
            "subFields": [
                { "id": "ground_floor", "type": "number" },
                { "id": "first_floor", "type": "number" },
                { "id": "second_floor", "type": "number" }
            ]
        },
        { "id": "built_up_area_total", "type": "number" },
        { "id": "construction_rate", "type": "number" },
        {
            "id": "building_value",
            "calculationMetadata": {
                "formula": "built_up_area_total * construction_rate",
                "outputFormat": "currency"
            }
        },
        {
            "id": "amenities",
            "subFields": [
                { "id": "compound_wall", "type": "number" },
                { "id": "borewell", "type": "number" },
                { "id": "amenities_sum", "type": "calculated", "formula": "compound_wall + borewell" }
            ]
        },
        {
            "id": "average_rate",
            "calculation": {
                "kind": "average",
                "sourceFields": ["valuation_rate", "construction_rate"]
            }
        }
    ]
}"#;

pub fn land_and_building() -> Template {
    Template::from_json_str(LAND_AND_BUILDING).unwrap()
}

pub fn registry() -> CalculationRegistry {
    CalculationRegistry::from_template(&land_and_building())
}

/// A filled-in form for `LAND_AND_BUILDING`.
pub fn form_values() -> FormValues {
    values(json!({
        "total_extent_plot": "1,000",
        "valuation_rate": 500,
        "land_value": null,
        "built_up_area": {
            "ground_floor": 1200,
            "first_floor": "800",
            "second_floor": null
        },
        "built_up_area_total": null,
        "construction_rate": "₹1,500",
        "building_value": null,
        "amenities": {
            "compound_wall": 25000,
            "borewell": "15,000",
            "amenities_sum": null
        },
        "average_rate": null
    }))
}

pub fn values(json: Value) -> FormValues {
    FormValues::from_json(json).unwrap()
}

pub fn settings() -> EngineSettings {
    EngineSettings::default()
}

pub fn sink() -> CollectingSink {
    CollectingSink::new()
}
