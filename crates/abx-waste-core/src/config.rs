//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::FrequencyOption;
use crate::tables::{ImpactLayout, WasteLayout, WeightLayout};

/// What to do when a lookup key appears on more than one row.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep loading; lookups take the first matching row
    #[default]
    FirstMatch,
    /// Fail the load
    Reject,
}

/// Settings for table loading and session defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub waste_layout: WasteLayout,
    pub weight_layout: WeightLayout,
    pub impact_layout: ImpactLayout,
    pub duplicate_policy: DuplicatePolicy,
    /// Administration method preselected in a fresh impact form
    pub default_method: String,
    pub frequency_options: Vec<FrequencyOption>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            waste_layout: WasteLayout::default(),
            weight_layout: WeightLayout::default(),
            impact_layout: ImpactLayout::default(),
            duplicate_policy: DuplicatePolicy::default(),
            default_method: "IV".to_string(),
            frequency_options: FrequencyOption::defaults(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }
}

/// Config loading errors.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
