//! In-memory comparison session.
//!
//! Holds the loaded tables, the two calculator forms and the regimens saved
//! from each. Nothing is persisted; dropping the session drops everything.
//!
//! Impact results can be computed off the calling thread. A
//! [`CalculationTicket`] taken before the calculation is checked on commit,
//! so a result computed for a selection that has since changed is dropped
//! instead of overwriting the newer one.

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::models::{
    new_regimen_id, now_rfc3339, DoseSelection, EnvironmentalImpact, FrequencyOption,
    ImpactRegimen, ImpactTotals, WasteItem, WasteRegimen,
};
use crate::resolver::{
    reconcile_selection, search_drugs, Catalog, ImpactSelection, Resolver, SelectionEvent,
    ValidatedWasteSelection, ValidationError, WasteSelection,
};
use crate::tables::LookupTables;

use super::{
    aggregate, doses_for_days, is_lowest_waste, total_for_items, total_waste_grams,
    RegimenError, RegimenResult,
};

/// Which list a saved regimen belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegimenKind {
    Waste,
    Impact,
}

/// Identifies the impact selection a calculation started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculationTicket {
    generation: u64,
}

/// A resolved, unsaved waste calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct WasteCalculation {
    pub selection: ValidatedWasteSelection,
    /// Per-dose items
    pub items: Vec<WasteItem>,
    pub total_doses: u32,
    /// Grams over the full course
    pub total_waste: f64,
}

/// Calculator state for one user.
pub struct Session {
    config: EngineConfig,
    tables: LookupTables,
    catalog: Catalog,
    waste_selection: WasteSelection,
    impact_selection: ImpactSelection,
    waste_regimens: Vec<WasteRegimen>,
    impact_regimens: Vec<ImpactRegimen>,
    current_impact: Option<EnvironmentalImpact>,
    generation: u64,
}

impl Session {
    /// Start a session over loaded tables.
    pub fn new(tables: LookupTables, config: EngineConfig) -> Self {
        let catalog = Catalog::build(&tables.waste);
        debug!(
            drugs = catalog.len(),
            impact_drugs = tables.impact.drug_names().len(),
            "Session opened"
        );
        let impact_selection = ImpactSelection::new(&config.default_method);
        Self {
            config,
            tables,
            catalog,
            waste_selection: WasteSelection::default(),
            impact_selection,
            waste_regimens: Vec::new(),
            impact_regimens: Vec::new(),
            current_impact: None,
            generation: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tables(&self) -> &LookupTables {
        &self.tables
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.tables)
    }

    pub fn frequency_options(&self) -> &[FrequencyOption] {
        &self.config.frequency_options
    }

    /// Search the waste catalog's drug names.
    pub fn search_drugs(&self, query: &str) -> Vec<String> {
        search_drugs(&self.catalog.drug_names(), query)
    }

    /// Search the impact sheet's drug names.
    pub fn search_impact_drugs(&self, query: &str) -> Vec<String> {
        search_drugs(&self.tables.impact.drug_names(), query)
    }

    // =========================================================================
    // Waste calculator
    // =========================================================================

    pub fn waste_selection(&self) -> &WasteSelection {
        &self.waste_selection
    }

    pub fn set_waste_selection(&mut self, selection: WasteSelection) {
        self.waste_selection = selection;
    }

    /// Validate the waste form and resolve it over the whole course.
    pub fn calculate_waste(&self) -> RegimenResult<WasteCalculation> {
        let (selection, items) = self
            .resolver()
            .resolve_waste(&self.waste_selection, &self.catalog)?;
        let total_doses = doses_for_days(selection.duration_days(), selection.frequency_hours());
        let total_waste = total_for_items(&items, total_doses, selection.duration_days());
        Ok(WasteCalculation {
            selection,
            items,
            total_doses,
            total_waste,
        })
    }

    /// Snapshot the waste form as a new regimen and clear the form.
    pub fn save_waste_regimen(&mut self) -> RegimenResult<WasteRegimen> {
        let regimen = self.snapshot_waste(new_regimen_id())?;
        info!(id = %regimen.id, drug = %regimen.drug, "Waste regimen saved");

        self.waste_regimens.push(regimen.clone());
        self.waste_selection = WasteSelection::default();
        Ok(regimen)
    }

    fn snapshot_waste(&self, id: String) -> RegimenResult<WasteRegimen> {
        let WasteCalculation {
            selection, items, ..
        } = self.calculate_waste()?;
        Ok(WasteRegimen {
            id,
            saved_at: now_rfc3339(),
            drug: selection.drug().to_string(),
            dose: selection.dose().clone(),
            form: selection.form().map(str::to_string),
            method: selection.method().to_string(),
            frequency_hours: selection.frequency_hours(),
            duration_days: selection.duration_days(),
            waste_items: items,
        })
    }

    pub fn waste_regimens(&self) -> &[WasteRegimen] {
        &self.waste_regimens
    }

    /// Grams across all saved waste regimens.
    pub fn total_waste_grams(&self) -> f64 {
        total_waste_grams(&self.waste_regimens)
    }

    // =========================================================================
    // Impact calculator
    // =========================================================================

    pub fn impact_selection(&self) -> &ImpactSelection {
        &self.impact_selection
    }

    /// Apply one input to the impact form, reconciling dose and form.
    pub fn apply(&mut self, event: SelectionEvent) -> &ImpactSelection {
        let next = reconcile_selection(&self.impact_selection, event, &self.tables.impact);
        self.replace_impact_selection(next);
        &self.impact_selection
    }

    fn replace_impact_selection(&mut self, selection: ImpactSelection) {
        self.impact_selection = selection;
        self.current_impact = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Take a ticket for the current impact selection.
    pub fn begin_calculation(&self) -> CalculationTicket {
        CalculationTicket {
            generation: self.generation,
        }
    }

    /// Whether the selection a ticket was taken for is still active.
    pub fn is_current(&self, ticket: CalculationTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Store a result if its selection is still active. Returns whether the
    /// result was kept.
    pub fn commit_impact(
        &mut self,
        ticket: CalculationTicket,
        impact: Option<EnvironmentalImpact>,
    ) -> bool {
        if !self.is_current(ticket) {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale impact result"
            );
            return false;
        }
        self.current_impact = impact;
        true
    }

    /// Resolve the impact form and keep the result as the current impact.
    pub fn calculate_impact(&mut self) -> Option<EnvironmentalImpact> {
        let ticket = self.begin_calculation();
        let impact = self.resolver().resolve_impact(&self.impact_selection);
        self.commit_impact(ticket, impact.clone());
        impact
    }

    /// The last committed, unsaved impact.
    pub fn current_impact(&self) -> Option<&EnvironmentalImpact> {
        self.current_impact.as_ref()
    }

    /// Snapshot the impact form as a new regimen and reset the form.
    pub fn save_impact_regimen(&mut self) -> RegimenResult<ImpactRegimen> {
        let regimen = self.snapshot_impact(new_regimen_id())?;
        info!(id = %regimen.id, drug = %regimen.drug, "Impact regimen saved");

        self.impact_regimens.push(regimen.clone());
        self.replace_impact_selection(ImpactSelection::new(&self.config.default_method));
        Ok(regimen)
    }

    fn snapshot_impact(&self, id: String) -> RegimenResult<ImpactRegimen> {
        let selection = &self.impact_selection;
        let drug = selection
            .drug
            .clone()
            .ok_or(ValidationError::MissingField("drug"))?;
        let impact = self
            .resolver()
            .resolve_impact(selection)
            .ok_or(RegimenError::NothingToSave)?;

        Ok(ImpactRegimen {
            id,
            saved_at: now_rfc3339(),
            drug,
            method: selection.method.clone(),
            disposal_method: selection.disposal.clone(),
            dose: selection.dose.clone(),
            form: selection.form.clone(),
            days: selection.days.max(1),
            frequency: selection.frequency.clone(),
            environmental_impact: impact,
        })
    }

    pub fn impact_regimens(&self) -> &[ImpactRegimen] {
        &self.impact_regimens
    }

    /// Totals over saved impact regimens, plus the current unsaved impact
    /// when `include_current` is set.
    pub fn impact_totals(&self, include_current: bool) -> ImpactTotals {
        let current = if include_current {
            self.current_impact.as_ref()
        } else {
            None
        };
        aggregate(&self.impact_regimens, current, self.tables.impact.distances())
    }

    // =========================================================================
    // Saved regimens
    // =========================================================================

    /// Load a saved regimen back into its calculator form.
    pub fn edit_regimen(&mut self, id: &str) -> RegimenResult<RegimenKind> {
        if let Some(regimen) = self.waste_regimens.iter().find(|r| r.id == id) {
            self.waste_selection = waste_selection_from(regimen);
            return Ok(RegimenKind::Waste);
        }
        if let Some(regimen) = self.impact_regimens.iter().find(|r| r.id == id) {
            let selection = impact_selection_from(regimen);
            self.replace_impact_selection(selection);
            return Ok(RegimenKind::Impact);
        }
        Err(RegimenError::UnknownRegimen(id.to_string()))
    }

    /// Replace a saved regimen with the current form, keeping its id.
    pub fn update_regimen(&mut self, id: &str) -> RegimenResult<RegimenKind> {
        if let Some(index) = self.waste_regimens.iter().position(|r| r.id == id) {
            let regimen = self.snapshot_waste(id.to_string())?;
            self.waste_regimens[index] = regimen;
            self.waste_selection = WasteSelection::default();
            info!(id, "Waste regimen updated");
            return Ok(RegimenKind::Waste);
        }
        if let Some(index) = self.impact_regimens.iter().position(|r| r.id == id) {
            let regimen = self.snapshot_impact(id.to_string())?;
            self.impact_regimens[index] = regimen;
            self.replace_impact_selection(ImpactSelection::new(&self.config.default_method));
            info!(id, "Impact regimen updated");
            return Ok(RegimenKind::Impact);
        }
        Err(RegimenError::UnknownRegimen(id.to_string()))
    }

    /// Remove a saved regimen from whichever list holds it.
    pub fn delete_regimen(&mut self, id: &str) -> RegimenResult<RegimenKind> {
        if let Some(index) = self.waste_regimens.iter().position(|r| r.id == id) {
            self.waste_regimens.remove(index);
            info!(id, "Waste regimen deleted");
            return Ok(RegimenKind::Waste);
        }
        if let Some(index) = self.impact_regimens.iter().position(|r| r.id == id) {
            self.impact_regimens.remove(index);
            info!(id, "Impact regimen deleted");
            return Ok(RegimenKind::Impact);
        }
        Err(RegimenError::UnknownRegimen(id.to_string()))
    }

    /// Whether a saved regimen has the lowest waste in its list.
    pub fn is_lowest_waste(&self, id: &str) -> RegimenResult<bool> {
        if let Some(regimen) = self.waste_regimens.iter().find(|r| r.id == id) {
            return Ok(is_lowest_waste(regimen, &self.waste_regimens));
        }
        if let Some(regimen) = self.impact_regimens.iter().find(|r| r.id == id) {
            return Ok(is_lowest_waste(regimen, &self.impact_regimens));
        }
        Err(RegimenError::UnknownRegimen(id.to_string()))
    }

    /// Drop every saved regimen and clear both forms.
    pub fn reset(&mut self) {
        info!(
            waste = self.waste_regimens.len(),
            impact = self.impact_regimens.len(),
            "Session reset"
        );
        self.waste_regimens.clear();
        self.impact_regimens.clear();
        self.waste_selection = WasteSelection::default();
        self.replace_impact_selection(ImpactSelection::new(&self.config.default_method));
    }
}

fn waste_selection_from(regimen: &WasteRegimen) -> WasteSelection {
    let (dose, custom_dose) = match &regimen.dose {
        DoseSelection::Fixed(label) => (Some(label.clone()), None),
        DoseSelection::Custom(dose) => (None, Some(dose.to_string())),
    };
    WasteSelection {
        drug: Some(regimen.drug.clone()),
        dose,
        custom_dose,
        form: regimen.form.clone(),
        method: Some(regimen.method.clone()),
        frequency_hours: Some(regimen.frequency_hours),
        duration: Some(regimen.duration_days.to_string()),
    }
}

fn impact_selection_from(regimen: &ImpactRegimen) -> ImpactSelection {
    ImpactSelection {
        drug: Some(regimen.drug.clone()),
        method: regimen.method.clone(),
        disposal: regimen.disposal_method.clone(),
        dose: regimen.dose.clone(),
        form: regimen.form.clone(),
        days: regimen.days,
        frequency: regimen.frequency.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolverError;
    use crate::tables::fixtures;

    fn session() -> Session {
        Session::new(fixtures::tables(), EngineConfig::default())
    }

    fn ampicillin(frequency_hours: f64, days: &str) -> WasteSelection {
        WasteSelection {
            drug: Some("Ampicillin".into()),
            dose: Some("500".into()),
            form: Some("Vial".into()),
            method: Some("IV".into()),
            frequency_hours: Some(frequency_hours),
            duration: Some(days.into()),
            ..WasteSelection::default()
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_calculate_waste_over_course() {
        let mut session = session();
        session.set_waste_selection(ampicillin(6.0, "7"));

        let calc = session.calculate_waste().unwrap();
        assert_eq!(calc.total_doses, 28);
        // 28 doses * (10.5 + 1.2 + 25) g + 2 tubing sets * 30 g
        assert!(approx(calc.total_waste, 28.0 * 36.7 + 60.0), "{}", calc.total_waste);
    }

    #[test]
    fn test_save_waste_regimen_resets_form() {
        let mut session = session();
        session.set_waste_selection(ampicillin(6.0, "7"));

        let saved = session.save_waste_regimen().unwrap();
        assert_eq!(saved.drug, "Ampicillin");
        assert_eq!(saved.duration_days, 7);
        assert!(!saved.id.is_empty());
        assert_eq!(session.waste_regimens(), &[saved]);
        assert_eq!(session.waste_selection(), &WasteSelection::default());
    }

    #[test]
    fn test_invalid_selection_saves_nothing() {
        let mut session = session();
        session.set_waste_selection(ampicillin(6.0, "0"));

        assert!(matches!(
            session.save_waste_regimen(),
            Err(RegimenError::Resolver(ResolverError::Validation(
                ValidationError::DurationNotPositiveInteger(_)
            )))
        ));
        assert!(session.waste_regimens().is_empty());
        assert_eq!(session.waste_selection(), &ampicillin(6.0, "0"));
    }

    #[test]
    fn test_longest_course_calculates() {
        let mut session = session();
        session.set_waste_selection(ampicillin(8.0, "3650"));

        let calc = session.calculate_waste().unwrap();
        assert_eq!(calc.total_doses, 3650 * 3);

        session.set_waste_selection(ampicillin(8.0, "4294967295"));
        assert!(matches!(
            session.calculate_waste(),
            Err(RegimenError::Resolver(ResolverError::Validation(
                ValidationError::DurationTooLong { .. }
            )))
        ));
    }

    #[test]
    fn test_lowest_waste_flag() {
        let mut session = session();
        session.set_waste_selection(ampicillin(6.0, "7"));
        let frequent = session.save_waste_regimen().unwrap();

        assert!(!session.is_lowest_waste(&frequent.id).unwrap());

        session.set_waste_selection(ampicillin(12.0, "7"));
        let sparse = session.save_waste_regimen().unwrap();

        assert!(session.is_lowest_waste(&sparse.id).unwrap());
        assert!(!session.is_lowest_waste(&frequent.id).unwrap());
        assert!(approx(
            session.total_waste_grams(),
            (28.0 * 36.7 + 60.0) + (14.0 * 36.7 + 60.0)
        ));
    }

    #[test]
    fn test_edit_and_update_keep_id() {
        let mut session = session();
        session.set_waste_selection(ampicillin(6.0, "7"));
        let saved = session.save_waste_regimen().unwrap();

        assert_eq!(session.edit_regimen(&saved.id).unwrap(), RegimenKind::Waste);
        assert_eq!(session.waste_selection(), &ampicillin(6.0, "7"));

        session.set_waste_selection(ampicillin(6.0, "3"));
        assert_eq!(session.update_regimen(&saved.id).unwrap(), RegimenKind::Waste);

        let regimens = session.waste_regimens();
        assert_eq!(regimens.len(), 1);
        assert_eq!(regimens[0].id, saved.id);
        assert_eq!(regimens[0].duration_days, 3);
    }

    #[test]
    fn test_edit_custom_dose_round_trip() {
        let mut session = session();
        session.set_waste_selection(WasteSelection {
            dose: None,
            custom_dose: Some("900".into()),
            ..ampicillin(8.0, "2")
        });
        let saved = session.save_waste_regimen().unwrap();
        assert_eq!(saved.dose, DoseSelection::Custom(900.0));

        session.edit_regimen(&saved.id).unwrap();
        assert_eq!(session.waste_selection().custom_dose.as_deref(), Some("900"));
        assert!(session.calculate_waste().is_ok());
    }

    #[test]
    fn test_delete_and_unknown_ids() {
        let mut session = session();
        session.set_waste_selection(ampicillin(6.0, "7"));
        let saved = session.save_waste_regimen().unwrap();

        assert!(matches!(
            session.delete_regimen("missing"),
            Err(RegimenError::UnknownRegimen(_))
        ));
        assert_eq!(session.delete_regimen(&saved.id).unwrap(), RegimenKind::Waste);
        assert!(session.waste_regimens().is_empty());
        assert!(session.is_lowest_waste(&saved.id).is_err());
    }

    #[test]
    fn test_save_impact_regimen() {
        let mut session = session();
        session.apply(SelectionEvent::Drug(Some("Ampicillin".into())));
        session.apply(SelectionEvent::Days(3));

        let saved = session.save_impact_regimen().unwrap();
        assert_eq!(saved.days, 3);
        assert!(approx(saved.environmental_impact.waste, 0.48));
        assert_eq!(session.impact_selection(), &ImpactSelection::new("IV"));
        assert_eq!(session.impact_regimens().len(), 1);
    }

    #[test]
    fn test_impact_without_data_is_not_saved() {
        let mut session = session();
        assert!(matches!(
            session.save_impact_regimen(),
            Err(RegimenError::Resolver(ResolverError::Validation(
                ValidationError::MissingField("drug")
            )))
        ));

        session.apply(SelectionEvent::Drug(Some("Ampicillin".into())));
        session.apply(SelectionEvent::Method("IM".into()));
        assert!(session.calculate_impact().is_none());
        assert!(matches!(
            session.save_impact_regimen(),
            Err(RegimenError::NothingToSave)
        ));
        assert!(session.impact_regimens().is_empty());
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut session = session();
        session.apply(SelectionEvent::Drug(Some("Ampicillin".into())));

        let ticket = session.begin_calculation();
        let stale = session.resolver().resolve_impact(session.impact_selection());

        session.apply(SelectionEvent::Days(5));
        assert!(!session.commit_impact(ticket, stale));
        assert!(session.current_impact().is_none());

        let fresh = session.calculate_impact().unwrap();
        assert_eq!(session.current_impact(), Some(&fresh));
    }

    #[test]
    fn test_impact_totals_with_current() {
        let mut session = session();
        session.apply(SelectionEvent::Drug(Some("Ampicillin".into())));
        session.save_impact_regimen().unwrap();

        session.apply(SelectionEvent::Drug(Some("Ampicillin".into())));
        session.apply(SelectionEvent::Days(2));
        session.calculate_impact().unwrap();

        let saved_only = session.impact_totals(false);
        assert_eq!(saved_only.count, 1);
        assert!(approx(saved_only.waste, 0.16));

        let with_current = session.impact_totals(true);
        assert_eq!(with_current.count, 2);
        assert!(approx(with_current.waste, 0.48));
        assert!(approx(with_current.co2e, 0.0012));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = session();
        session.set_waste_selection(ampicillin(6.0, "7"));
        session.save_waste_regimen().unwrap();
        session.apply(SelectionEvent::Drug(Some("Ampicillin".into())));
        session.save_impact_regimen().unwrap();

        session.reset();
        assert!(session.waste_regimens().is_empty());
        assert!(session.impact_regimens().is_empty());
        assert_eq!(session.impact_totals(true), ImpactTotals::default());
    }

    #[test]
    fn test_search_drugs() {
        let session = session();
        assert_eq!(session.search_drugs("amox"), vec!["Amoxicillin"]);
        assert_eq!(session.search_impact_drugs("ampi"), vec!["Ampicillin"]);
    }
}
