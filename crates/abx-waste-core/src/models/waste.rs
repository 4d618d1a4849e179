//! Waste item models.

use serde::{Deserialize, Serialize};

/// Item-name fragment that marks tubing replaced on a fixed cadence
/// rather than per dose.
pub const IV_TUBING_MARKER: &str = "iv tubing";

/// One kind of plastic waste produced per dose of a regimen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasteItem {
    /// Item name, as in the waste list header
    pub item: String,
    /// Units per dose
    pub quantity: f64,
    /// Grams per unit
    pub weight: f64,
    /// quantity * weight, grams
    pub total_waste: f64,
}

impl WasteItem {
    pub fn new(item: impl Into<String>, quantity: f64, weight: f64) -> Self {
        Self {
            item: item.into(),
            quantity,
            weight,
            total_waste: quantity * weight,
        }
    }

    /// Check if this item is IV tubing.
    pub fn is_iv_tubing(&self) -> bool {
        self.item.to_lowercase().contains(IV_TUBING_MARKER)
    }
}
