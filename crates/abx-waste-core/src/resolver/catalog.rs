//! Drug catalog built from the master waste list.
//!
//! Per drug, fixed doses are keyed by their label and the variable dose by
//! a single entry whose forms are the union of all band forms. The bands
//! themselves are regrouped from the rows so each literal (min, max, form)
//! stays distinct; overlapping or adjacent bands are never merged.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{DoseOption, DoseRange, DoseSpec, DrugOption, FormOption};
use crate::tables::{leading_number, WasteRow, WasteTable};

/// form -> methods
type FormMethods = BTreeMap<String, BTreeSet<String>>;

#[derive(Default)]
struct DrugEntry {
    /// Fixed dose labels in first-seen order
    fixed: Vec<(String, FormMethods)>,
    variable: Option<FormMethods>,
}

impl DrugEntry {
    fn fixed_forms(&mut self, label: &str) -> &mut FormMethods {
        let idx = match self.fixed.iter().position(|(l, _)| l == label) {
            Some(idx) => idx,
            None => {
                self.fixed.push((label.to_string(), FormMethods::new()));
                self.fixed.len() - 1
            }
        };
        &mut self.fixed[idx].1
    }
}

/// Build the sorted drug catalog from the waste list.
pub fn build_catalog(table: &WasteTable) -> Vec<DrugOption> {
    let mut entries: HashMap<&str, DrugEntry> = HashMap::new();

    for row in table.rows().iter().filter(|r| r.is_complete()) {
        let entry = entries.entry(row.drug.as_str()).or_default();

        let forms = if row.is_fixed() {
            entry.fixed_forms(row.fixed_dose.as_deref().unwrap_or_default())
        } else if row.is_variable() {
            entry.variable.get_or_insert_with(BTreeMap::new)
        } else {
            continue;
        };

        forms
            .entry(row.form.clone())
            .or_default()
            .insert(row.method.clone());
    }

    let mut drugs: Vec<DrugOption> = entries
        .into_iter()
        .map(|(name, entry)| {
            let mut doses: Vec<DoseOption> = entry
                .fixed
                .into_iter()
                .map(|(label, forms)| DoseOption {
                    spec: DoseSpec::Fixed(label),
                    forms: form_options(forms),
                })
                .collect();
            doses.sort_by(|a, b| compare_fixed_labels(&a.spec, &b.spec));

            if let Some(forms) = entry.variable {
                doses.push(DoseOption {
                    spec: DoseSpec::Variable(dose_ranges(table.rows(), name)),
                    forms: form_options(forms),
                });
            }

            DrugOption {
                name: name.to_string(),
                doses,
            }
        })
        .collect();

    drugs.sort_by(|a, b| a.name.cmp(&b.name));
    drugs
}

fn form_options(forms: FormMethods) -> Vec<FormOption> {
    forms
        .into_iter()
        .map(|(form, methods)| FormOption {
            form,
            methods: methods.into_iter().collect(),
        })
        .collect()
}

/// Distinct (min, max, form) bands of a drug with their methods, ordered by
/// lower bound.
fn dose_ranges(rows: &[WasteRow], drug: &str) -> Vec<DoseRange> {
    // Bands grouped per form, forms in first-seen order.
    let mut by_form: Vec<(String, Vec<(f64, f64, BTreeSet<String>)>)> = Vec::new();

    for row in rows.iter().filter(|r| r.drug == drug && r.is_complete()) {
        let Some((min, max)) = row.dose_range else {
            continue;
        };

        let idx = match by_form.iter().position(|(form, _)| *form == row.form) {
            Some(idx) => idx,
            None => {
                by_form.push((row.form.clone(), Vec::new()));
                by_form.len() - 1
            }
        };
        let bands = &mut by_form[idx].1;

        match bands.iter_mut().find(|(lo, hi, _)| *lo == min && *hi == max) {
            Some((_, _, methods)) => {
                methods.insert(row.method.clone());
            }
            None => bands.push((min, max, BTreeSet::from([row.method.clone()]))),
        }
    }

    let mut ranges = Vec::new();
    for (form, mut bands) in by_form {
        bands.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        ranges.extend(bands.into_iter().map(|(min_dose, max_dose, methods)| DoseRange {
            min_dose,
            max_dose,
            form: form.clone(),
            methods: methods.into_iter().collect(),
        }));
    }

    ranges.sort_by(|a, b| a.min_dose.partial_cmp(&b.min_dose).unwrap_or(Ordering::Equal));
    ranges
}

/// Order fixed doses by the number before the first `/`. Labels without
/// a number sort after numeric ones, in the order the sheet lists them.
fn compare_fixed_labels(a: &DoseSpec, b: &DoseSpec) -> Ordering {
    let key = |spec: &DoseSpec| {
        spec.fixed()
            .and_then(|label| label.split('/').next())
            .and_then(leading_number)
    };

    match (key(a), key(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The drug catalog with lookups used by validation and the FFI layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    drugs: Vec<DrugOption>,
}

impl Catalog {
    pub fn build(table: &WasteTable) -> Self {
        Self {
            drugs: build_catalog(table),
        }
    }

    pub fn drugs(&self) -> &[DrugOption] {
        &self.drugs
    }

    /// Look up a drug by exact name.
    pub fn drug(&self, name: &str) -> Option<&DrugOption> {
        self.drugs.iter().find(|d| d.name == name)
    }

    /// Drug names in catalog order.
    pub fn drug_names(&self) -> Vec<String> {
        self.drugs.iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.drugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drugs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{fixtures, Grid, WasteLayout};

    fn catalog() -> Catalog {
        let table = WasteTable::from_grid(&Grid::parse(fixtures::WASTE_CSV).unwrap(), &WasteLayout::default());
        Catalog::build(&table)
    }

    #[test]
    fn test_drugs_sorted() {
        assert_eq!(catalog().drug_names(), vec!["Amoxicillin", "Ampicillin"]);
    }

    #[test]
    fn test_fixed_doses_sorted_numerically_variable_last() {
        let catalog = catalog();
        let amp = catalog.drug("Ampicillin").unwrap();
        let labels: Vec<Option<&str>> = amp.doses.iter().map(|d| d.spec.fixed()).collect();

        assert_eq!(labels, vec![Some("500"), Some("1000/50mL"), Some("2000"), None]);

        let amox = catalog.drug("Amoxicillin").unwrap();
        let labels: Vec<Option<&str>> = amox.doses.iter().map(|d| d.spec.fixed()).collect();
        assert_eq!(labels, vec![Some("250"), Some("500")]);
    }

    #[test]
    fn test_methods_deduplicated_per_form() {
        let catalog = catalog();
        let amp = catalog.drug("Ampicillin").unwrap();
        let vial = amp.fixed_dose("500").unwrap().form("Vial").unwrap();
        assert_eq!(vial.methods, vec!["IM", "IV"]);
    }

    #[test]
    fn test_variable_ranges_kept_distinct() {
        let catalog = catalog();
        let amp = catalog.drug("Ampicillin").unwrap();
        let ranges = amp.dose_ranges();

        assert_eq!(ranges.len(), 2);
        assert_eq!((ranges[0].min_dose, ranges[0].max_dose), (250.0, 750.0));
        assert_eq!(ranges[0].methods, vec!["IM", "IV"]);
        assert_eq!((ranges[1].min_dose, ranges[1].max_dose), (751.0, 1500.0));
        assert_eq!(ranges[1].methods, vec!["IV"]);

        let variable = amp.variable_dose().unwrap();
        assert_eq!(variable.forms.len(), 1);
        assert_eq!(variable.forms[0].methods, vec!["IM", "IV"]);
    }

    #[test]
    fn test_malformed_ranges_dropped() {
        let catalog = catalog();
        let amox = catalog.drug("Amoxicillin").unwrap();
        assert!(amox.variable_dose().is_none());
        assert!(amox.doses.iter().all(|d| d.form("Suspension").is_none()));
    }

    #[test]
    fn test_every_dose_has_forms_and_methods() {
        for drug in catalog().drugs() {
            for dose in &drug.doses {
                assert!(!dose.forms.is_empty(), "{} has a dose without forms", drug.name);
                for form in &dose.forms {
                    assert!(!form.methods.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_same_bounds_different_forms_stay_separate() {
        let csv = "\
Drug,Dose,Min,Max,Unit,Form,Method,Vial
Vancomycin,,500,1000,mg,Vial,IV,1
Vancomycin,,500,1000,mg,Premix,IV,1
Vancomycin,,100,400,mg,Premix,IV,1
";
        let table = WasteTable::from_grid(&Grid::parse(csv).unwrap(), &WasteLayout::default());
        let catalog = Catalog::build(&table);
        let ranges = catalog.drug("Vancomycin").unwrap().dose_ranges();

        let summary: Vec<(f64, &str)> = ranges.iter().map(|r| (r.min_dose, r.form.as_str())).collect();
        assert_eq!(summary, vec![(100.0, "Premix"), (500.0, "Vial"), (500.0, "Premix")]);
    }

    #[test]
    fn test_non_numeric_labels_keep_sheet_order() {
        let csv = "\
Drug,Dose,Min,Max,Unit,Form,Method,Vial
Nystatin,swish,,,,Suspension,PO,1
Nystatin,troche,,,,Lozenge,PO,1
Nystatin,250,,,mg,Tablet,PO,1
Nystatin,paste,,,,Tube,Topical,1
Nystatin,cream,,,,Tube,Topical,1
Nystatin,powder,,,,Bottle,Topical,1
Nystatin,ointment,,,,Tube,Topical,1
";
        let table = WasteTable::from_grid(&Grid::parse(csv).unwrap(), &WasteLayout::default());
        let expected = vec!["250", "swish", "troche", "paste", "cream", "powder", "ointment"];

        for _ in 0..20 {
            let catalog = Catalog::build(&table);
            let labels: Vec<&str> = catalog
                .drug("Nystatin")
                .unwrap()
                .doses
                .iter()
                .filter_map(|d| d.spec.fixed())
                .collect();
            assert_eq!(labels, expected);
        }
    }
}
