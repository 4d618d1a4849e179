//! Waste resolution: selection -> per-dose waste items.

use crate::models::{DoseSelection, WasteItem};
use crate::tables::{WasteRow, WasteTable, WeightTable};

use super::{ResolverError, ResolverResult, ValidatedWasteSelection};

/// Resolves a drug/dose/method selection against the master waste list.
pub struct WasteResolver<'a> {
    table: &'a WasteTable,
    weights: &'a WeightTable,
}

impl<'a> WasteResolver<'a> {
    pub fn new(table: &'a WasteTable, weights: &'a WeightTable) -> Self {
        Self { table, weights }
    }

    /// Resolve the waste items produced by one dose.
    ///
    /// A fixed dose matches the dose label exactly; a custom dose matches
    /// any row whose band contains it. The first matching row is used.
    pub fn resolve(
        &self,
        drug: &str,
        dose: &DoseSelection,
        method: &str,
        form: Option<&str>,
    ) -> ResolverResult<Vec<WasteItem>> {
        let row = self
            .find_row(drug, dose, method, form)
            .ok_or_else(|| ResolverError::NotFound {
                drug: drug.to_string(),
                dose: dose.to_string(),
                method: method.to_string(),
            })?;

        Ok(self.items_for(row))
    }

    /// Resolve a validated waste-calculator selection.
    pub fn resolve_selection(
        &self,
        selection: &ValidatedWasteSelection,
    ) -> ResolverResult<Vec<WasteItem>> {
        self.resolve(
            selection.drug(),
            selection.dose(),
            selection.method(),
            selection.form(),
        )
    }

    /// First row serving the selection.
    pub fn find_row(
        &self,
        drug: &str,
        dose: &DoseSelection,
        method: &str,
        form: Option<&str>,
    ) -> Option<&'a WasteRow> {
        self.table.rows().iter().find(|row| {
            row.drug == drug
                && row.method == method
                && form.map_or(true, |f| row.form == f)
                && match dose {
                    DoseSelection::Fixed(label) => row.fixed_dose.as_deref() == Some(label.as_str()),
                    DoseSelection::Custom(value) => row.range_contains(*value),
                }
        })
    }

    /// Waste items of a row. Items with a quantity, or with a known weight,
    /// are kept; the latter show up with zero total so callers can tell
    /// "not used for this method" from "unknown item".
    fn items_for(&self, row: &WasteRow) -> Vec<WasteItem> {
        self.table
            .item_names()
            .iter()
            .zip(row.quantities.iter())
            .filter_map(|(name, &quantity)| {
                let weight = self.weights.weight(name);
                if quantity > 0.0 || weight.is_some() {
                    Some(WasteItem::new(name.clone(), quantity, weight.unwrap_or(0.0)))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::fixtures;

    fn names(items: &[WasteItem]) -> Vec<&str> {
        items.iter().map(|i| i.item.as_str()).collect()
    }

    #[test]
    fn test_fixed_dose_resolution() {
        let tables = fixtures::tables();
        let resolver = WasteResolver::new(&tables.waste, &tables.weights);

        let items = resolver
            .resolve("Ampicillin", &DoseSelection::Fixed("500".into()), "IV", None)
            .unwrap();

        assert_eq!(names(&items), vec!["Vial", "Vial Cap", "100mL IVPB", "IV Tubing", "Admin Cup"]);
        for item in &items {
            assert_eq!(item.total_waste, item.quantity * item.weight);
        }
        assert_eq!(items[0].total_waste, 10.5);
    }

    #[test]
    fn test_known_weight_zero_quantity_is_kept() {
        let tables = fixtures::tables();
        let resolver = WasteResolver::new(&tables.waste, &tables.weights);

        let items = resolver
            .resolve("Ampicillin", &DoseSelection::Fixed("500".into()), "IM", None)
            .unwrap();

        let ivpb = items.iter().find(|i| i.item == "100mL IVPB").unwrap();
        assert_eq!(ivpb.quantity, 0.0);
        assert_eq!(ivpb.total_waste, 0.0);
        // No weight and no quantity: dropped
        assert!(items.iter().all(|i| i.item != "Blister Card"));
    }

    #[test]
    fn test_unknown_weight_with_quantity_is_kept() {
        let tables = fixtures::tables();
        let resolver = WasteResolver::new(&tables.waste, &tables.weights);

        let items = resolver
            .resolve("Amoxicillin", &DoseSelection::Fixed("500".into()), "PO", None)
            .unwrap();

        let blister = items.iter().find(|i| i.item == "Blister Card").unwrap();
        assert_eq!(blister.quantity, 1.0);
        assert_eq!(blister.weight, 0.0);
    }

    #[test]
    fn test_custom_dose_uses_band() {
        let tables = fixtures::tables();
        let resolver = WasteResolver::new(&tables.waste, &tables.weights);

        let low = resolver
            .resolve("Ampicillin", &DoseSelection::Custom(750.0), "IV", None)
            .unwrap();
        let high = resolver
            .resolve("Ampicillin", &DoseSelection::Custom(751.0), "IV", None)
            .unwrap();

        assert_eq!(low[0].quantity, 1.0);
        assert_eq!(high[0].quantity, 2.0);
    }

    #[test]
    fn test_form_narrows_match() {
        let tables = fixtures::tables();
        let resolver = WasteResolver::new(&tables.waste, &tables.weights);

        assert!(resolver
            .resolve("Ampicillin", &DoseSelection::Fixed("500".into()), "IV", Some("Premix"))
            .is_err());
        assert!(resolver
            .resolve("Ampicillin", &DoseSelection::Fixed("1000/50mL".into()), "IV", Some("Premix"))
            .is_ok());
    }

    #[test]
    fn test_not_found_names_selection() {
        let tables = fixtures::tables();
        let resolver = WasteResolver::new(&tables.waste, &tables.weights);

        let err = resolver
            .resolve("Ampicillin", &DoseSelection::Fixed("250".into()), "IV", None)
            .unwrap_err();

        assert!(matches!(err, ResolverError::NotFound { .. }));
        assert_eq!(err.to_string(), "Data not found for Ampicillin 250mg with method: IV");
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let tables = fixtures::tables();
        let resolver = WasteResolver::new(&tables.waste, &tables.weights);
        let dose = DoseSelection::Fixed("2000".into());

        let first = resolver.resolve("Ampicillin", &dose, "IV", None).unwrap();
        let second = resolver.resolve("Ampicillin", &dose, "IV", None).unwrap();
        assert_eq!(first, second);
    }
}
