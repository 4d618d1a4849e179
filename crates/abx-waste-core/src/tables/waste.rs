//! Master waste list and item weights.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::grid::{cell, parse_number, number_or_zero, Grid};
use super::schema::{WasteLayout, WeightLayout};

/// One row of the master waste list.
#[derive(Debug, Clone, PartialEq)]
pub struct WasteRow {
    /// Physical row index in the source, for diagnostics
    pub line: usize,
    pub drug: String,
    /// Fixed dose label, when the cell is non-empty
    pub fixed_dose: Option<String>,
    /// Both min and max dose cells are non-empty
    pub has_range_cells: bool,
    /// Parsed (min, max) when both cells are numeric
    pub dose_range: Option<(f64, f64)>,
    pub form: String,
    pub method: String,
    /// Per-dose quantity for each item column, 0 when blank or malformed
    pub quantities: Vec<f64>,
}

impl WasteRow {
    /// Row describes a fixed dose: a dose label and no complete range.
    pub fn is_fixed(&self) -> bool {
        self.fixed_dose.is_some() && !self.has_range_cells
    }

    /// Row describes a dose band with numeric bounds.
    pub fn is_variable(&self) -> bool {
        self.dose_range.is_some()
    }

    /// Check if a numeric dose is inside this row's band (inclusive).
    pub fn range_contains(&self, dose: f64) -> bool {
        self.dose_range
            .map_or(false, |(min, max)| min <= dose && dose <= max)
    }

    /// Row can describe an orderable option at all.
    pub fn is_complete(&self) -> bool {
        !self.drug.is_empty() && !self.form.is_empty() && !self.method.is_empty()
    }
}

/// The master waste list: item names plus typed rows.
#[derive(Debug, Clone, Default)]
pub struct WasteTable {
    item_names: Vec<String>,
    rows: Vec<WasteRow>,
}

impl WasteTable {
    /// Build from a parsed grid. Item names come from the last header row.
    pub fn from_grid(grid: &Grid, layout: &WasteLayout) -> Self {
        let header = layout
            .header_rows
            .checked_sub(1)
            .and_then(|idx| grid.row(idx))
            .unwrap_or(&[]);

        // (column, name) for every named item column
        let items: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .skip(layout.first_item)
            .filter(|(_, name)| !name.is_empty())
            .map(|(col, name)| (col, name.clone()))
            .collect();

        let mut rows = Vec::new();
        let mut malformed = 0usize;

        for (line, row) in grid.data_rows(layout.header_rows) {
            let drug = cell(row, layout.drug);
            if drug.is_empty() {
                continue;
            }

            let fixed = cell(row, layout.fixed_dose);
            let min = cell(row, layout.min_dose);
            let max = cell(row, layout.max_dose);
            let has_range_cells = !min.is_empty() && !max.is_empty();
            let dose_range = if has_range_cells {
                match (parse_number(min), parse_number(max)) {
                    (Some(min), Some(max)) => Some((min, max)),
                    _ => {
                        malformed += 1;
                        None
                    }
                }
            } else {
                None
            };

            rows.push(WasteRow {
                line,
                drug: drug.to_string(),
                fixed_dose: (!fixed.is_empty()).then(|| fixed.to_string()),
                has_range_cells,
                dose_range,
                form: cell(row, layout.form).to_string(),
                method: cell(row, layout.method).to_string(),
                quantities: items
                    .iter()
                    .map(|(col, _)| number_or_zero(cell(row, *col)))
                    .collect(),
            });
        }

        if malformed > 0 {
            warn!(count = malformed, "Skipping dose ranges with non-numeric bounds");
        }

        Self {
            item_names: items.into_iter().map(|(_, name)| name).collect(),
            rows,
        }
    }

    /// Waste item names, in column order.
    pub fn item_names(&self) -> &[String] {
        &self.item_names
    }

    pub fn rows(&self) -> &[WasteRow] {
        &self.rows
    }

    /// Keys that appear on more than one row.
    ///
    /// Fixed rows are keyed by drug/dose/form/method, band rows by
    /// drug/min/max/form/method.
    pub fn duplicate_keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();

        for row in &self.rows {
            let key = match (&row.fixed_dose, row.dose_range) {
                (_, Some((min, max))) => {
                    format!("waste: {} {}-{} {} {}", row.drug, min, max, row.form, row.method)
                }
                (Some(dose), None) if row.is_fixed() => {
                    format!("waste: {} {} {} {}", row.drug, dose, row.form, row.method)
                }
                _ => continue,
            };
            if !seen.insert(key.clone()) {
                duplicates.push(key);
            }
        }

        duplicates
    }
}

/// Grams per unit of each waste item, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    weights: HashMap<String, f64>,
}

impl WeightTable {
    pub fn from_grid(grid: &Grid, layout: &WeightLayout) -> Self {
        let mut weights = HashMap::new();

        for (line, row) in grid.data_rows(layout.header_rows) {
            let item = cell(row, layout.item);
            let weight = cell(row, layout.weight);
            if item.is_empty() || weight.is_empty() {
                continue;
            }
            match parse_number(weight) {
                Some(grams) => {
                    // First entry wins for repeated names.
                    weights.entry(item.to_lowercase()).or_insert(grams);
                }
                None => warn!(line, item, weight, "Skipping non-numeric item weight"),
            }
        }

        Self { weights }
    }

    /// Weight of an item, matched case-insensitively.
    pub fn weight(&self, item: &str) -> Option<f64> {
        self.weights.get(&item.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
