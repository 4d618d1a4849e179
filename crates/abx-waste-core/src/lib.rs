//! Antibiotic Waste Core Library
//!
//! Estimates the plastic waste and environmental impact of antibiotic
//! regimens from a set of lookup tables, and compares saved regimens.
//!
//! # Architecture
//!
//! ```text
//!   waste list CSV      weights CSV        impact sheet CSV
//!          │                 │                     │
//!          └────────┬────────┘                     │
//!                   ▼                              ▼
//!              Table Loader ─────────────► tier 1/2/3 rows + distance bands
//!                   │                              │
//!                   ▼                              │
//!             Drug Catalog ◄── user selection ──►  │
//!                   │        (validated /          │
//!                   │         reconciled)          │
//!                   ▼                              ▼
//!            Waste Resolver              Impact Resolver
//!          per-dose WasteItems       EnvironmentalImpact | None
//!                   │                              │
//!                   └──────────────┬───────────────┘
//!                                  ▼
//!                        Regimen Aggregator
//!                   course totals, IV tubing cadence,
//!                   multi-regimen sums, lowest waste
//!                                  │
//!                                  ▼
//!                        Comparison Export
//! ```
//!
//! # Modules
//!
//! - [`tables`]: CSV parsing and the typed waste, weight and impact tables
//! - [`models`]: Domain types (DrugOption, WasteItem, EnvironmentalImpact, etc.)
//! - [`resolver`]: Catalog, waste and impact resolution, selection validation
//! - [`regimen`]: Course arithmetic, aggregation and the in-memory session
//! - [`export`]: Comparison report as JSON or CSV
//! - [`config`]: Table layouts and session defaults

pub mod config;
pub mod export;
pub mod models;
pub mod regimen;
pub mod resolver;
pub mod tables;

// Re-export commonly used types
pub use config::{DuplicatePolicy, EngineConfig};
pub use export::ComparisonReport;
pub use models::{
    DoseSelection, DrugOption, EnvironmentalImpact, ImpactRegimen, ImpactTier, ImpactTotals,
    WasteItem, WasteRegimen,
};
pub use regimen::{RegimenKind, Session};
pub use resolver::{Catalog, ImpactSelection, Resolver, SelectionEvent, WasteSelection};
pub use tables::LookupTables;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum AbxWasteError {
    #[error("Load error: {0}")]
    LoadError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl From<tables::TableError> for AbxWasteError {
    fn from(e: tables::TableError) -> Self {
        AbxWasteError::LoadError(e.to_string())
    }
}

impl From<config::ConfigError> for AbxWasteError {
    fn from(e: config::ConfigError) -> Self {
        AbxWasteError::LoadError(e.to_string())
    }
}

impl From<resolver::ResolverError> for AbxWasteError {
    fn from(e: resolver::ResolverError) -> Self {
        match e {
            resolver::ResolverError::NotFound { .. } => AbxWasteError::NotFound(e.to_string()),
            resolver::ResolverError::Validation(v) => AbxWasteError::InvalidInput(v.to_string()),
        }
    }
}

impl From<regimen::RegimenError> for AbxWasteError {
    fn from(e: regimen::RegimenError) -> Self {
        match e {
            regimen::RegimenError::UnknownRegimen(_) => AbxWasteError::NotFound(e.to_string()),
            regimen::RegimenError::NothingToSave => AbxWasteError::NoData(e.to_string()),
            regimen::RegimenError::Resolver(e) => e.into(),
        }
    }
}

impl From<serde_json::Error> for AbxWasteError {
    fn from(e: serde_json::Error) -> Self {
        AbxWasteError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for AbxWasteError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        AbxWasteError::LockError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

fn parse_config(config_json: Option<String>) -> Result<EngineConfig, AbxWasteError> {
    match config_json {
        Some(json) => EngineConfig::from_json(&json)
            .map_err(|e| AbxWasteError::LoadError(format!("Invalid config: {}", e))),
        None => Ok(EngineConfig::default()),
    }
}

fn wrap(session: Session) -> Arc<AbxWasteCore> {
    Arc::new(AbxWasteCore {
        session: Arc::new(Mutex::new(session)),
    })
}

/// Open a session from the text of the three CSV sheets.
#[uniffi::export]
pub fn open_session_from_csv(
    waste_csv: String,
    weights_csv: String,
    impact_csv: String,
    config_json: Option<String>,
) -> Result<Arc<AbxWasteCore>, AbxWasteError> {
    let config = parse_config(config_json)?;
    let tables = LookupTables::from_csv(&waste_csv, &weights_csv, &impact_csv, &config)?;
    Ok(wrap(Session::new(tables, config)))
}

/// Open a session from a directory holding the three standard CSV files.
#[uniffi::export]
pub fn open_session_from_dir(
    dir: String,
    config_json: Option<String>,
) -> Result<Arc<AbxWasteCore>, AbxWasteError> {
    let config = parse_config(config_json)?;
    let tables = LookupTables::load_dir(&dir, &config)?;
    Ok(wrap(Session::new(tables, config)))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe session wrapper for FFI.
#[derive(uniffi::Object)]
pub struct AbxWasteCore {
    session: Arc<Mutex<Session>>,
}

#[uniffi::export]
impl AbxWasteCore {
    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// Every drug in the waste list with its doses, forms and methods.
    pub fn drug_catalog(&self) -> Result<Vec<FfiDrugOption>, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.catalog().drugs().iter().map(FfiDrugOption::from).collect())
    }

    /// Search waste-list drug names.
    pub fn search_drugs(&self, query: String) -> Result<Vec<String>, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.search_drugs(&query))
    }

    /// Search impact-sheet drug names.
    pub fn search_impact_drugs(&self, query: String) -> Result<Vec<String>, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.search_impact_drugs(&query))
    }

    /// Methods recorded for a drug in the impact sheet.
    pub fn impact_methods(&self, drug: String) -> Result<Vec<String>, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.tables().impact.methods_for(&drug))
    }

    /// Disposal methods recorded for a drug, when the sheet has them.
    pub fn impact_disposal_methods(&self, drug: String) -> Result<Vec<String>, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.tables().impact.disposals_for(&drug))
    }

    /// Doses recorded for a drug in the impact sheet.
    pub fn impact_doses(&self, drug: String) -> Result<Vec<String>, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.tables().impact.doses_for(&drug))
    }

    /// Forms recorded for a drug, optionally narrowed to one dose.
    pub fn impact_forms(
        &self,
        drug: String,
        dose: Option<String>,
    ) -> Result<Vec<String>, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.tables().impact.forms_for(&drug, dose.as_deref()))
    }

    pub fn frequency_options(&self) -> Result<Vec<FfiFrequencyOption>, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session
            .frequency_options()
            .iter()
            .map(|f| FfiFrequencyOption {
                label: f.label.clone(),
                hours: f.hours,
                per_day: f.per_day.clone(),
            })
            .collect())
    }

    /// Lookup keys that appear on more than one row.
    pub fn duplicate_keys(&self) -> Result<Vec<String>, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.tables().duplicate_keys())
    }

    // =========================================================================
    // Waste Calculator
    // =========================================================================

    pub fn set_waste_selection(&self, selection: FfiWasteSelection) -> Result<(), AbxWasteError> {
        let mut session = self.session.lock()?;
        session.set_waste_selection(selection.into());
        Ok(())
    }

    pub fn get_waste_selection(&self) -> Result<FfiWasteSelection, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.waste_selection().clone().into())
    }

    /// Validate and resolve the waste form over its full course.
    pub fn calculate_waste(&self) -> Result<FfiWasteCalculation, AbxWasteError> {
        let session = self.session.lock()?;
        let calc = session.calculate_waste()?;
        Ok(FfiWasteCalculation {
            items: calc.items.into_iter().map(FfiWasteItem::from).collect(),
            total_doses: calc.total_doses,
            total_waste: calc.total_waste,
        })
    }

    pub fn save_waste_regimen(&self) -> Result<FfiWasteRegimen, AbxWasteError> {
        let mut session = self.session.lock()?;
        Ok(session.save_waste_regimen()?.into())
    }

    pub fn list_waste_regimens(&self) -> Result<Vec<FfiWasteRegimen>, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.waste_regimens().iter().cloned().map(Into::into).collect())
    }

    /// Grams across all saved waste regimens.
    pub fn total_waste_grams(&self) -> Result<f64, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.total_waste_grams())
    }

    // =========================================================================
    // Impact Calculator
    // =========================================================================

    /// Apply one input to the impact form; returns the reconciled form.
    pub fn apply_impact_event(
        &self,
        event: FfiSelectionEvent,
    ) -> Result<FfiImpactSelection, AbxWasteError> {
        let mut session = self.session.lock()?;
        Ok(session.apply(event.into()).clone().into())
    }

    pub fn get_impact_selection(&self) -> Result<FfiImpactSelection, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.impact_selection().clone().into())
    }

    /// Impact of the current form, or `None` when there is no data for it.
    pub fn calculate_impact(&self) -> Result<Option<FfiEnvironmentalImpact>, AbxWasteError> {
        let mut session = self.session.lock()?;
        Ok(session.calculate_impact().map(Into::into))
    }

    pub fn save_impact_regimen(&self) -> Result<FfiImpactRegimen, AbxWasteError> {
        let mut session = self.session.lock()?;
        Ok(session.save_impact_regimen()?.into())
    }

    pub fn list_impact_regimens(&self) -> Result<Vec<FfiImpactRegimen>, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.impact_regimens().iter().cloned().map(Into::into).collect())
    }

    /// Totals over saved impact regimens, optionally with the current one.
    pub fn impact_totals(&self, include_current: bool) -> Result<FfiImpactTotals, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.impact_totals(include_current).into())
    }

    // =========================================================================
    // Saved Regimens
    // =========================================================================

    pub fn edit_regimen(&self, id: String) -> Result<FfiRegimenKind, AbxWasteError> {
        let mut session = self.session.lock()?;
        Ok(session.edit_regimen(&id)?.into())
    }

    pub fn update_regimen(&self, id: String) -> Result<FfiRegimenKind, AbxWasteError> {
        let mut session = self.session.lock()?;
        Ok(session.update_regimen(&id)?.into())
    }

    pub fn delete_regimen(&self, id: String) -> Result<FfiRegimenKind, AbxWasteError> {
        let mut session = self.session.lock()?;
        Ok(session.delete_regimen(&id)?.into())
    }

    pub fn is_lowest_waste(&self, id: String) -> Result<bool, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(session.is_lowest_waste(&id)?)
    }

    /// Drop all saved regimens and clear both forms.
    pub fn reset(&self) -> Result<(), AbxWasteError> {
        let mut session = self.session.lock()?;
        session.reset();
        Ok(())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    pub fn export_comparison_json(&self) -> Result<String, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(ComparisonReport::from_session(&session).to_json()?)
    }

    pub fn export_comparison_csv(&self) -> Result<String, AbxWasteError> {
        let session = self.session.lock()?;
        Ok(ComparisonReport::from_session(&session).to_csv())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe catalog drug.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDrugOption {
    pub name: String,
    pub fixed_doses: Vec<FfiFixedDose>,
    pub dose_ranges: Vec<FfiDoseRange>,
}

impl From<&DrugOption> for FfiDrugOption {
    fn from(drug: &DrugOption) -> Self {
        let fixed_doses = drug
            .doses
            .iter()
            .filter_map(|dose| {
                dose.spec.fixed().map(|label| FfiFixedDose {
                    label: label.to_string(),
                    forms: dose
                        .forms
                        .iter()
                        .map(|f| FfiFormOption {
                            form: f.form.clone(),
                            methods: f.methods.clone(),
                        })
                        .collect(),
                })
            })
            .collect();

        Self {
            name: drug.name.clone(),
            fixed_doses,
            dose_ranges: drug
                .dose_ranges()
                .iter()
                .map(|r| FfiDoseRange {
                    min_dose: r.min_dose,
                    max_dose: r.max_dose,
                    form: r.form.clone(),
                    methods: r.methods.clone(),
                })
                .collect(),
        }
    }
}

/// FFI-safe fixed dose.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFixedDose {
    pub label: String,
    pub forms: Vec<FfiFormOption>,
}

/// FFI-safe form option.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFormOption {
    pub form: String,
    pub methods: Vec<String>,
}

/// FFI-safe variable dose band.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoseRange {
    pub min_dose: f64,
    pub max_dose: f64,
    pub form: String,
    pub methods: Vec<String>,
}

/// FFI-safe dosing interval.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFrequencyOption {
    pub label: String,
    pub hours: f64,
    pub per_day: String,
}

/// FFI-safe waste form state.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiWasteSelection {
    pub drug: Option<String>,
    pub dose: Option<String>,
    pub custom_dose: Option<String>,
    pub form: Option<String>,
    pub method: Option<String>,
    pub frequency_hours: Option<f64>,
    pub duration: Option<String>,
}

impl From<FfiWasteSelection> for WasteSelection {
    fn from(s: FfiWasteSelection) -> Self {
        WasteSelection {
            drug: s.drug,
            dose: s.dose,
            custom_dose: s.custom_dose,
            form: s.form,
            method: s.method,
            frequency_hours: s.frequency_hours,
            duration: s.duration,
        }
    }
}

impl From<WasteSelection> for FfiWasteSelection {
    fn from(s: WasteSelection) -> Self {
        Self {
            drug: s.drug,
            dose: s.dose,
            custom_dose: s.custom_dose,
            form: s.form,
            method: s.method,
            frequency_hours: s.frequency_hours,
            duration: s.duration,
        }
    }
}

/// FFI-safe waste item.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiWasteItem {
    pub item: String,
    pub quantity: f64,
    pub weight: f64,
    pub total_waste: f64,
}

impl From<WasteItem> for FfiWasteItem {
    fn from(item: WasteItem) -> Self {
        Self {
            item: item.item,
            quantity: item.quantity,
            weight: item.weight,
            total_waste: item.total_waste,
        }
    }
}

/// FFI-safe waste calculation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiWasteCalculation {
    pub items: Vec<FfiWasteItem>,
    pub total_doses: u32,
    pub total_waste: f64,
}

/// FFI-safe saved waste regimen.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiWasteRegimen {
    pub id: String,
    pub saved_at: String,
    pub drug: String,
    pub dose: String,
    pub is_custom_dose: bool,
    pub form: Option<String>,
    pub method: String,
    pub frequency_hours: f64,
    pub duration_days: u32,
    pub waste_items: Vec<FfiWasteItem>,
}

impl From<WasteRegimen> for FfiWasteRegimen {
    fn from(regimen: WasteRegimen) -> Self {
        Self {
            id: regimen.id,
            saved_at: regimen.saved_at,
            dose: regimen.dose.to_string(),
            is_custom_dose: matches!(regimen.dose, DoseSelection::Custom(_)),
            drug: regimen.drug,
            form: regimen.form,
            method: regimen.method,
            frequency_hours: regimen.frequency_hours,
            duration_days: regimen.duration_days,
            waste_items: regimen.waste_items.into_iter().map(Into::into).collect(),
        }
    }
}

/// FFI-safe impact form input.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiSelectionEvent {
    Drug { value: Option<String> },
    Method { value: String },
    Disposal { value: Option<String> },
    Dose { value: Option<String> },
    Form { value: Option<String> },
    Days { value: u32 },
    Frequency { value: Option<String> },
}

impl From<FfiSelectionEvent> for SelectionEvent {
    fn from(event: FfiSelectionEvent) -> Self {
        match event {
            FfiSelectionEvent::Drug { value } => SelectionEvent::Drug(value),
            FfiSelectionEvent::Method { value } => SelectionEvent::Method(value),
            FfiSelectionEvent::Disposal { value } => SelectionEvent::Disposal(value),
            FfiSelectionEvent::Dose { value } => SelectionEvent::Dose(value),
            FfiSelectionEvent::Form { value } => SelectionEvent::Form(value),
            FfiSelectionEvent::Days { value } => SelectionEvent::Days(value),
            FfiSelectionEvent::Frequency { value } => SelectionEvent::Frequency(value),
        }
    }
}

/// FFI-safe impact form state.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImpactSelection {
    pub drug: Option<String>,
    pub method: String,
    pub disposal: Option<String>,
    pub dose: Option<String>,
    pub form: Option<String>,
    pub days: u32,
    pub frequency: Option<String>,
}

impl From<ImpactSelection> for FfiImpactSelection {
    fn from(s: ImpactSelection) -> Self {
        Self {
            drug: s.drug,
            method: s.method,
            disposal: s.disposal,
            dose: s.dose,
            form: s.form,
            days: s.days,
            frequency: s.frequency,
        }
    }
}

/// FFI-safe environmental impact.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEnvironmentalImpact {
    /// 1 = drug + method, 2 = + dose, 3 = + form
    pub tier: u8,
    pub co2e_per_dose: f64,
    pub co2e_per_dot: f64,
    pub weight_per_dose: f64,
    pub weight_per_dot: f64,
    pub waste: f64,
    pub co2e: f64,
    pub distance: f64,
    pub gas: f64,
    pub coal: f64,
    pub phones: f64,
    pub distance_comparison: String,
}

impl From<EnvironmentalImpact> for FfiEnvironmentalImpact {
    fn from(impact: EnvironmentalImpact) -> Self {
        Self {
            tier: impact.tier as u8,
            co2e_per_dose: impact.base.co2e_per_dose,
            co2e_per_dot: impact.base.co2e_per_dot,
            weight_per_dose: impact.base.weight_per_dose,
            weight_per_dot: impact.base.weight_per_dot,
            waste: impact.waste,
            co2e: impact.co2e,
            distance: impact.distance,
            gas: impact.gas,
            coal: impact.coal,
            phones: impact.phones,
            distance_comparison: impact.distance_comparison,
        }
    }
}

/// FFI-safe saved impact regimen.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImpactRegimen {
    pub id: String,
    pub saved_at: String,
    pub drug: String,
    pub method: String,
    pub disposal_method: Option<String>,
    pub dose: Option<String>,
    pub form: Option<String>,
    pub days: u32,
    pub frequency: Option<String>,
    pub environmental_impact: FfiEnvironmentalImpact,
}

impl From<ImpactRegimen> for FfiImpactRegimen {
    fn from(regimen: ImpactRegimen) -> Self {
        Self {
            id: regimen.id,
            saved_at: regimen.saved_at,
            drug: regimen.drug,
            method: regimen.method,
            disposal_method: regimen.disposal_method,
            dose: regimen.dose,
            form: regimen.form,
            days: regimen.days,
            frequency: regimen.frequency,
            environmental_impact: regimen.environmental_impact.into(),
        }
    }
}

/// FFI-safe impact totals.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImpactTotals {
    pub waste: f64,
    pub co2e: f64,
    pub distance: f64,
    pub gas: f64,
    pub coal: f64,
    pub phones: f64,
    pub distance_comparison: String,
    pub count: u32,
}

impl From<ImpactTotals> for FfiImpactTotals {
    fn from(totals: ImpactTotals) -> Self {
        Self {
            waste: totals.waste,
            co2e: totals.co2e,
            distance: totals.distance,
            gas: totals.gas,
            coal: totals.coal,
            phones: totals.phones,
            distance_comparison: totals.distance_comparison,
            count: totals.count as u32,
        }
    }
}

/// FFI-safe regimen list tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiRegimenKind {
    Waste,
    Impact,
}

impl From<RegimenKind> for FfiRegimenKind {
    fn from(kind: RegimenKind) -> Self {
        match kind {
            RegimenKind::Waste => FfiRegimenKind::Waste,
            RegimenKind::Impact => FfiRegimenKind::Impact,
        }
    }
}
