//! Column layouts for the lookup sheets.
//!
//! The sheets carry no machine-readable schema, so the positions live here
//! and nowhere else. Loaders turn rows into named records once; resolvers
//! never index columns.

use serde::{Deserialize, Serialize};

/// Descriptor columns of the master waste list.
///
/// Every column from `first_item` onward is a waste item whose name is the
/// header cell and whose value is a per-dose quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasteLayout {
    pub header_rows: usize,
    pub drug: usize,
    pub fixed_dose: usize,
    pub min_dose: usize,
    pub max_dose: usize,
    pub form: usize,
    pub method: usize,
    pub first_item: usize,
}

impl Default for WasteLayout {
    fn default() -> Self {
        Self {
            header_rows: 1,
            drug: 0,
            fixed_dose: 1,
            min_dose: 2,
            max_dose: 3,
            form: 5,
            method: 6,
            first_item: 7,
        }
    }
}

/// Item-name and weight-in-grams columns of the weights sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightLayout {
    pub header_rows: usize,
    pub item: usize,
    pub weight: usize,
}

impl Default for WeightLayout {
    fn default() -> Self {
        Self {
            header_rows: 1,
            item: 0,
            weight: 1,
        }
    }
}

/// One tier block of the impact sheet.
///
/// `values` is the first of four consecutive numeric columns:
/// CO2e per dose, CO2e per DOT, weight per dose, weight per DOT.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierColumns {
    pub drug: usize,
    pub method: usize,
    pub disposal: Option<usize>,
    pub dose: Option<usize>,
    pub form: Option<usize>,
    pub values: usize,
}

/// Distance comparison band columns of the impact sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistanceColumns {
    pub lower: usize,
    pub upper: usize,
    pub label: usize,
}

/// Full layout of the multi-table impact sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactLayout {
    /// Rows before the first data row (titles and headers).
    pub header_rows: usize,
    /// Drug + method.
    pub tier1: TierColumns,
    /// Drug + method + dose.
    pub tier2: TierColumns,
    /// Drug + method + dose + form.
    pub tier3: TierColumns,
    pub distance: DistanceColumns,
}

impl Default for ImpactLayout {
    fn default() -> Self {
        Self {
            header_rows: 5,
            tier1: TierColumns {
                drug: 0,
                method: 1,
                disposal: None,
                dose: None,
                form: None,
                values: 2,
            },
            tier2: TierColumns {
                drug: 7,
                method: 8,
                disposal: None,
                dose: Some(9),
                form: None,
                values: 10,
            },
            tier3: TierColumns {
                drug: 15,
                method: 16,
                disposal: None,
                dose: Some(17),
                form: Some(18),
                values: 19,
            },
            distance: DistanceColumns {
                lower: 27,
                upper: 28,
                label: 29,
            },
        }
    }
}

impl ImpactLayout {
    /// Layout of the sheet revision that records a disposal method after
    /// the administration method in every tier block.
    pub fn disposal_aware() -> Self {
        Self {
            header_rows: 5,
            tier1: TierColumns {
                drug: 0,
                method: 1,
                disposal: Some(2),
                dose: None,
                form: None,
                values: 3,
            },
            tier2: TierColumns {
                drug: 8,
                method: 9,
                disposal: Some(10),
                dose: Some(11),
                form: None,
                values: 12,
            },
            tier3: TierColumns {
                drug: 17,
                method: 18,
                disposal: Some(19),
                dose: Some(20),
                form: Some(21),
                values: 22,
            },
            distance: DistanceColumns {
                lower: 27,
                upper: 28,
                label: 29,
            },
        }
    }

    /// Whether rows carry a disposal method.
    pub fn has_disposal(&self) -> bool {
        self.tier1.disposal.is_some()
    }
}
