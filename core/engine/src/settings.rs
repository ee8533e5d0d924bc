//! FILENAME: core/engine/src/settings.rs
//! PURPOSE: Engine configuration.
//! CONTEXT: Settings are plain data loaded once by the host (usually from
//! JSON shipped with the front end) and passed into recalculation calls.

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// How digits of the integer part are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DigitGrouping {
    /// 12,34,56,789 (lakh/crore)
    Indian,
    /// 123,456,789
    Western,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrencySettings {
    pub symbol: String,
    pub grouping: DigitGrouping,
    pub decimal_places: u8,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        CurrencySettings {
            symbol: "₹".to_string(),
            grouping: DigitGrouping::Indian,
            decimal_places: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub currency: CurrencySettings,
}

impl EngineSettings {
    /// Parses settings from JSON. Missing keys fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: EngineSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let symbol = &self.currency.symbol;
        if symbol.chars().any(|c| c.is_ascii_digit() || c == '-' || c == '.') {
            return Err(SettingsError::Invalid(format!(
                "currency symbol '{}' must not contain digits, '-' or '.'",
                symbol
            )));
        }
        if self.currency.decimal_places > 6 {
            return Err(SettingsError::Invalid(format!(
                "decimal places {} out of range (0-6)",
                self.currency.decimal_places
            )));
        }
        Ok(())
    }
}
