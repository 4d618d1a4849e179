//! Tiered impact tables and distance comparison bands.

use std::collections::HashSet;

use super::grid::{cell, number_or_zero, Grid};
use super::schema::{DistanceColumns, ImpactLayout, TierColumns};
use crate::models::{BaseImpact, ImpactTier};

/// Label returned when no distance band contains a distance.
pub const DISTANCE_EXCEEDS_RANGE: &str = "Distance exceeds comparison range";

/// One row of one impact tier.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactRow {
    /// Physical row index in the source, for diagnostics
    pub line: usize,
    pub drug: String,
    pub method: String,
    /// Present only in disposal-aware layouts
    pub disposal: Option<String>,
    /// Present in tiers 2 and 3
    pub dose: Option<String>,
    /// Present in tier 3
    pub form: Option<String>,
    pub base: BaseImpact,
}

/// Lookup key for an impact row. `None` fields are not compared.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImpactKey<'a> {
    pub drug: &'a str,
    pub method: &'a str,
    pub disposal: Option<&'a str>,
    pub dose: Option<&'a str>,
    pub form: Option<&'a str>,
}

impl ImpactRow {
    /// Check if this row serves `key`.
    ///
    /// Dose and form must match whenever the row carries them. Disposal is
    /// compared only when both the row and the key carry one.
    pub fn matches(&self, key: &ImpactKey<'_>) -> bool {
        if self.drug != key.drug || self.method != key.method {
            return false;
        }
        if let Some(dose) = &self.dose {
            if key.dose != Some(dose.as_str()) {
                return false;
            }
        }
        if let Some(form) = &self.form {
            if key.form != Some(form.as_str()) {
                return false;
            }
        }
        match (&self.disposal, key.disposal) {
            (Some(row), Some(wanted)) => row == wanted,
            _ => true,
        }
    }

    fn key_string(&self, tier: ImpactTier) -> String {
        let mut parts = vec![self.drug.as_str(), self.method.as_str()];
        parts.extend(self.disposal.as_deref());
        parts.extend(self.dose.as_deref());
        parts.extend(self.form.as_deref());
        format!("impact tier {}: {}", tier as u8, parts.join(" "))
    }
}

/// A labelled distance band, inclusive at both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceBand {
    pub lower: f64,
    pub upper: f64,
    pub label: String,
}

/// Ordered distance bands; the first band containing a distance wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceScale {
    bands: Vec<DistanceBand>,
}

impl DistanceScale {
    pub fn new(bands: Vec<DistanceBand>) -> Self {
        Self { bands }
    }

    fn from_grid(grid: &Grid, offset: usize, columns: &DistanceColumns) -> Self {
        let bands = grid
            .data_rows(offset)
            .filter_map(|(_, row)| {
                let label = cell(row, columns.label);
                if label.is_empty() {
                    return None;
                }
                Some(DistanceBand {
                    lower: number_or_zero(cell(row, columns.lower)),
                    upper: number_or_zero(cell(row, columns.upper)),
                    label: label.to_string(),
                })
            })
            .collect();
        Self { bands }
    }

    /// Everyday comparison for a distance in miles.
    pub fn compare(&self, distance: f64) -> String {
        self.bands
            .iter()
            .find(|band| band.lower <= distance && distance <= band.upper)
            .map(|band| band.label.clone())
            .unwrap_or_else(|| DISTANCE_EXCEEDS_RANGE.to_string())
    }

    pub fn bands(&self) -> &[DistanceBand] {
        &self.bands
    }
}

/// The impact sheet: three lookup tiers and the distance scale.
#[derive(Debug, Clone, Default)]
pub struct ImpactTables {
    tier1: Vec<ImpactRow>,
    tier2: Vec<ImpactRow>,
    tier3: Vec<ImpactRow>,
    distances: DistanceScale,
    has_disposal: bool,
}

impl ImpactTables {
    pub fn from_grid(grid: &Grid, layout: &ImpactLayout) -> Self {
        let offset = layout.header_rows;
        Self {
            tier1: read_tier(grid, offset, &layout.tier1),
            tier2: read_tier(grid, offset, &layout.tier2),
            tier3: read_tier(grid, offset, &layout.tier3),
            distances: DistanceScale::from_grid(grid, offset, &layout.distance),
            has_disposal: layout.has_disposal(),
        }
    }

    /// Rows of one tier, in source order.
    pub fn tier_rows(&self, tier: ImpactTier) -> &[ImpactRow] {
        match tier {
            ImpactTier::DrugMethod => &self.tier1,
            ImpactTier::Dose => &self.tier2,
            ImpactTier::DoseForm => &self.tier3,
        }
    }

    /// First row of `tier` that serves `key`.
    pub fn find(&self, tier: ImpactTier, key: &ImpactKey<'_>) -> Option<&ImpactRow> {
        self.tier_rows(tier).iter().find(|row| row.matches(key))
    }

    pub fn distances(&self) -> &DistanceScale {
        &self.distances
    }

    /// Whether rows are keyed by disposal method too.
    pub fn has_disposal(&self) -> bool {
        self.has_disposal
    }

    /// Drug names of tier 1, first-seen order, without repeats.
    pub fn drug_names(&self) -> Vec<String> {
        unique(self.tier1.iter().map(|row| row.drug.as_str()))
    }

    /// Administration methods of tier 1 for a drug.
    pub fn methods_for(&self, drug: &str) -> Vec<String> {
        unique(
            self.tier1
                .iter()
                .filter(|row| row.drug == drug)
                .map(|row| row.method.as_str()),
        )
    }

    /// Disposal methods recorded for a drug, sorted.
    pub fn disposals_for(&self, drug: &str) -> Vec<String> {
        let mut disposals = unique(
            self.tier1
                .iter()
                .filter(|row| row.drug == drug)
                .filter_map(|row| row.disposal.as_deref()),
        );
        disposals.sort();
        disposals
    }

    /// Tier 2 doses for a drug, first-seen order, without repeats.
    pub fn doses_for(&self, drug: &str) -> Vec<String> {
        unique(
            self.tier2
                .iter()
                .filter(|row| row.drug == drug)
                .filter_map(|row| row.dose.as_deref()),
        )
    }

    /// Tier 3 forms for a drug, optionally narrowed to a dose; sorted.
    pub fn forms_for(&self, drug: &str, dose: Option<&str>) -> Vec<String> {
        let mut forms = unique(
            self.tier3
                .iter()
                .filter(|row| row.drug == drug)
                .filter(|row| dose.map_or(true, |d| row.dose.as_deref() == Some(d)))
                .filter_map(|row| row.form.as_deref()),
        );
        forms.sort();
        forms
    }

    /// Whether tier 3 has a row for this drug/dose/form.
    pub fn is_form_compatible(&self, drug: &str, dose: &str, form: &str) -> bool {
        self.tier3.iter().any(|row| {
            row.drug == drug
                && row.dose.as_deref() == Some(dose)
                && row.form.as_deref() == Some(form)
        })
    }

    /// First tier 3 dose recorded for a drug in a form.
    pub fn first_dose_for_form(&self, drug: &str, form: &str) -> Option<String> {
        self.tier3
            .iter()
            .find(|row| row.drug == drug && row.form.as_deref() == Some(form))
            .and_then(|row| row.dose.clone())
    }

    /// Keys that appear on more than one row of the same tier.
    pub fn duplicate_keys(&self) -> Vec<String> {
        let mut duplicates = Vec::new();
        for tier in [ImpactTier::DrugMethod, ImpactTier::Dose, ImpactTier::DoseForm] {
            let mut seen = HashSet::new();
            for row in self.tier_rows(tier) {
                let key = row.key_string(tier);
                if !seen.insert(key.clone()) {
                    duplicates.push(key);
                }
            }
        }
        duplicates
    }
}

fn read_tier(grid: &Grid, offset: usize, columns: &TierColumns) -> Vec<ImpactRow> {
    let optional = |row: &[String], col: Option<usize>| -> Result<Option<String>, ()> {
        match col {
            None => Ok(None),
            Some(col) => match cell(row, col) {
                "" => Err(()),
                value => Ok(Some(value.to_string())),
            },
        }
    };

    grid.data_rows(offset)
        .filter_map(|(line, row)| {
            let drug = cell(row, columns.drug);
            let method = cell(row, columns.method);
            if drug.is_empty() || method.is_empty() {
                return None;
            }

            // A tier row missing one of its own key cells can never match.
            let disposal = optional(row, columns.disposal).ok()?;
            let dose = optional(row, columns.dose).ok()?;
            let form = optional(row, columns.form).ok()?;

            let value = |i: usize| number_or_zero(cell(row, columns.values + i));
            Some(ImpactRow {
                line,
                drug: drug.to_string(),
                method: method.to_string(),
                disposal,
                dose,
                form,
                base: BaseImpact {
                    co2e_per_dose: value(0),
                    co2e_per_dot: value(1),
                    weight_per_dose: value(2),
                    weight_per_dot: value(3),
                },
            })
        })
        .collect()
}

fn unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .map(|v| v.to_string())
        .collect()
}
