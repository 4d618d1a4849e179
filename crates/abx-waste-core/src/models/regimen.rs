//! Saved regimen models.

use serde::{Deserialize, Serialize};

use super::{EnvironmentalImpact, WasteItem};

/// Dose chosen for a waste regimen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DoseSelection {
    /// A catalog dose label
    Fixed(String),
    /// A validated custom dose inside one of the drug's bands
    Custom(f64),
}

impl std::fmt::Display for DoseSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DoseSelection::Fixed(label) => write!(f, "{}", label),
            DoseSelection::Custom(dose) => write!(f, "{}", dose),
        }
    }
}

/// A dosing interval offered to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrequencyOption {
    /// Display label, e.g. "Every 8 hours (q8h)"
    pub label: String,
    /// Hours between doses
    pub hours: f64,
    /// Doses per day, as the multiplier string the impact calculator takes
    pub per_day: String,
}

impl FrequencyOption {
    pub fn new(label: &str, hours: f64, per_day: &str) -> Self {
        Self {
            label: label.into(),
            hours,
            per_day: per_day.into(),
        }
    }

    /// Standard intervals from q4h to q48h.
    pub fn defaults() -> Vec<FrequencyOption> {
        vec![
            Self::new("Every 4 hours (q4h)", 4.0, "6"),
            Self::new("Every 6 hours (q6h)", 6.0, "4"),
            Self::new("Every 8 hours (q8h)", 8.0, "3"),
            Self::new("Every 12 hours (q12h)", 12.0, "2"),
            Self::new("Every 24 hours (q24h)", 24.0, "1"),
            Self::new("Every 48 hours (q48h)", 48.0, "0.5"),
        ]
    }
}

/// A saved waste-calculator regimen (immutable snapshot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasteRegimen {
    /// Unique regimen ID
    pub id: String,
    /// Save timestamp
    pub saved_at: String,
    pub drug: String,
    pub dose: DoseSelection,
    pub form: Option<String>,
    pub method: String,
    /// Hours between doses
    pub frequency_hours: f64,
    /// Days of therapy
    pub duration_days: u32,
    /// Per-dose waste items resolved at save time
    pub waste_items: Vec<WasteItem>,
}

/// A saved impact-calculator regimen (immutable snapshot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactRegimen {
    /// Unique regimen ID
    pub id: String,
    /// Save timestamp
    pub saved_at: String,
    pub drug: String,
    pub method: String,
    pub disposal_method: Option<String>,
    pub dose: Option<String>,
    pub form: Option<String>,
    pub days: u32,
    /// Doses-per-day multiplier; `None` uses the per-DOT figures
    pub frequency: Option<String>,
    pub environmental_impact: EnvironmentalImpact,
}

pub(crate) fn new_regimen_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dose_selection_display() {
        assert_eq!(DoseSelection::Fixed("500".into()).to_string(), "500");
        assert_eq!(DoseSelection::Custom(750.0).to_string(), "750");
        assert_eq!(DoseSelection::Custom(12.5).to_string(), "12.5");
    }

    #[test]
    fn test_default_frequencies_are_consistent() {
        for option in FrequencyOption::defaults() {
            let per_day: f64 = option.per_day.parse().unwrap();
            assert!((per_day * option.hours - 24.0).abs() < 1e-9, "{}", option.label);
        }
    }
}
