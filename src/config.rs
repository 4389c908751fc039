//! Engine configuration.
//!
//! Passed explicitly to the `*_with` entry points; the plain entry points use
//! `EngineConfig::default()`.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub diagram: DiagramConfig,
    pub time: TimeConfig,
    pub document: DocumentConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagramConfig {
    /// Direction used when the source lacks a `graph`/`flowchart` directive.
    pub default_direction: String,
    /// Identifier substituted for nodes named with the reserved closer keyword.
    pub reserved_word_replacement: String,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            default_direction: "TD".into(),
            reserved_word_replacement: "endProcess".into(),
        }
    }
}

/// Working-time convention for day and week units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeConfig {
    pub hours_per_day: u32,
    pub days_per_week: u32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            hours_per_day: 8,
            days_per_week: 5,
        }
    }
}

impl TimeConfig {
    pub fn minutes_per_day(&self) -> u32 {
        self.hours_per_day.max(1).saturating_mul(60)
    }

    pub fn minutes_per_week(&self) -> u32 {
        self.minutes_per_day().saturating_mul(self.days_per_week.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentConfig {
    /// Prefix of the positional title given to tables nothing else names.
    pub section_title_prefix: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            section_title_prefix: "Section".into(),
        }
    }
}

impl EngineConfig {
    /// Deserialize a config JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str::<EngineConfig>(json).map_err(|e| {
            EngineError::config("C001", format!("Failed to parse engine config JSON: {}", e))
        })
    }
}
