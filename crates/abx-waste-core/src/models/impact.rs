//! Environmental impact models.

use serde::{Deserialize, Serialize};

/// Lookup granularity that produced a base impact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImpactTier {
    /// Drug + method
    DrugMethod = 1,
    /// Drug + method + dose
    Dose = 2,
    /// Drug + method + dose + form
    DoseForm = 3,
}

/// Per-dose and per-DOT figures read from one impact table row.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BaseImpact {
    /// Metric tons CO2e per dose
    pub co2e_per_dose: f64,
    /// Metric tons CO2e per day of therapy
    pub co2e_per_dot: f64,
    /// Grams of waste per dose
    pub weight_per_dose: f64,
    /// Grams of waste per day of therapy
    pub weight_per_dot: f64,
}

/// Impact of a regimen over its duration, with everyday equivalents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentalImpact {
    /// Figures the derived values were computed from
    pub base: BaseImpact,
    /// Tier the base figures came from
    pub tier: ImpactTier,
    /// Kilograms of waste
    pub waste: f64,
    /// Metric tons CO2e
    pub co2e: f64,
    /// Miles driven by an average passenger vehicle
    pub distance: f64,
    /// Liters of gasoline burned
    pub gas: f64,
    /// Kilograms of coal burned
    pub coal: f64,
    /// Smartphones charged
    pub phones: f64,
    /// Label of the distance band containing `distance`
    pub distance_comparison: String,
}

/// Sum of impacts across regimens.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImpactTotals {
    pub waste: f64,
    pub co2e: f64,
    pub distance: f64,
    pub gas: f64,
    pub coal: f64,
    pub phones: f64,
    pub distance_comparison: String,
    /// Number of impacts summed
    pub count: usize,
}

impl ImpactTotals {
    /// Add one impact's additive figures.
    pub fn add(&mut self, impact: &EnvironmentalImpact) {
        self.waste += impact.waste;
        self.co2e += impact.co2e;
        self.distance += impact.distance;
        self.gas += impact.gas;
        self.coal += impact.coal;
        self.phones += impact.phones;
        self.count += 1;
    }
}
