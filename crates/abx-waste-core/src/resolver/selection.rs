//! User selections, input validation and dose/form reconciliation.
//!
//! Resolution never runs against raw form input. Waste selections become a
//! [`ValidatedWasteSelection`] only through [`WasteSelection::validate`];
//! impact selections are kept consistent by [`reconcile_selection`], which
//! is applied once per input event.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DoseSelection, DrugOption};
use crate::tables::{parse_number, ImpactTables};

use super::{Catalog, ImpactQuery};

/// Field-level validation failures. Recoverable: they block resolution,
/// nothing else.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Dose must be a number: {0}")]
    DoseNotNumeric(String),

    #[error("Dose {dose} is outside every range for {drug}{}", form_suffix(.form))]
    DoseOutOfRange {
        dose: f64,
        drug: String,
        form: Option<String>,
    },

    #[error("Duration must be a positive whole number of days: {0}")]
    DurationNotPositiveInteger(String),

    #[error("Duration of {days} days is longer than the {max}-day limit")]
    DurationTooLong { days: u32, max: u32 },

    #[error("Frequency must be a positive number of hours")]
    FrequencyNotPositive,

    #[error("A dose every {frequency_hours} hours for {days} days is more than {max} doses")]
    TooManyDoses {
        frequency_hours: f64,
        days: u32,
        max: u32,
    },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} is not offered for this selection: {value}")]
    NotOffered { field: &'static str, value: String },
}

fn form_suffix(form: &Option<String>) -> String {
    form.as_deref().map(|f| format!(" ({})", f)).unwrap_or_default()
}

/// Parse and range-check a custom dose for a drug, optionally in one form.
pub fn validate_custom_dose(
    input: &str,
    drug: &DrugOption,
    form: Option<&str>,
) -> Result<f64, ValidationError> {
    let dose = parse_number(input)
        .ok_or_else(|| ValidationError::DoseNotNumeric(input.trim().to_string()))?;

    if drug.ranges_containing(dose, form).next().is_none() {
        return Err(ValidationError::DoseOutOfRange {
            dose,
            drug: drug.name.clone(),
            form: form.map(str::to_string),
        });
    }
    Ok(dose)
}

/// Longest course accepted, in days.
pub const MAX_DURATION_DAYS: u32 = 3650;

/// Most doses a single course may count.
pub const MAX_COURSE_DOSES: u32 = 1_000_000;

/// Parse a duration in days: a positive integer no longer than
/// [`MAX_DURATION_DAYS`].
pub fn validate_duration(input: &str) -> Result<u32, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::DurationNotPositiveInteger(trimmed.to_string()));
    }
    match trimmed.parse::<u32>() {
        Ok(0) => Err(ValidationError::DurationNotPositiveInteger(trimmed.to_string())),
        Ok(days) if days <= MAX_DURATION_DAYS => Ok(days),
        Ok(days) => Err(ValidationError::DurationTooLong {
            days,
            max: MAX_DURATION_DAYS,
        }),
        // All digits, so a parse failure means it overflowed u32
        Err(_) => Err(ValidationError::DurationTooLong {
            days: u32::MAX,
            max: MAX_DURATION_DAYS,
        }),
    }
}

/// Check that a course's dose count stays within [`MAX_COURSE_DOSES`].
pub fn validate_course(frequency_hours: f64, days: u32) -> Result<(), ValidationError> {
    let doses = (f64::from(days) * 24.0 / frequency_hours).ceil();
    if doses > f64::from(MAX_COURSE_DOSES) {
        return Err(ValidationError::TooManyDoses {
            frequency_hours,
            days,
            max: MAX_COURSE_DOSES,
        });
    }
    Ok(())
}

/// Check a dosing interval in hours.
pub fn validate_frequency_hours(hours: f64) -> Result<f64, ValidationError> {
    if hours.is_finite() && hours > 0.0 {
        Ok(hours)
    } else {
        Err(ValidationError::FrequencyNotPositive)
    }
}

/// Waste calculator form state, as entered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WasteSelection {
    pub drug: Option<String>,
    /// Catalog dose label
    pub dose: Option<String>,
    /// Raw custom dose input; takes precedence over `dose` when present
    pub custom_dose: Option<String>,
    pub form: Option<String>,
    pub method: Option<String>,
    /// Hours between doses
    pub frequency_hours: Option<f64>,
    /// Raw duration input, in days
    pub duration: Option<String>,
}

/// A waste selection that passed validation against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedWasteSelection {
    drug: String,
    dose: DoseSelection,
    form: Option<String>,
    method: String,
    frequency_hours: f64,
    duration_days: u32,
}

impl ValidatedWasteSelection {
    pub fn drug(&self) -> &str {
        &self.drug
    }

    pub fn dose(&self) -> &DoseSelection {
        &self.dose
    }

    pub fn form(&self) -> Option<&str> {
        self.form.as_deref()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn frequency_hours(&self) -> f64 {
        self.frequency_hours
    }

    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }
}

impl WasteSelection {
    /// Validate every field against the catalog.
    ///
    /// The method, and the form when one is given, must be offered for the
    /// chosen dose, so a validated selection always names a combination the
    /// catalog advertises.
    pub fn validate(&self, catalog: &Catalog) -> Result<ValidatedWasteSelection, ValidationError> {
        let drug_name = required(&self.drug, "drug")?;
        let drug = catalog.drug(drug_name).ok_or_else(|| ValidationError::NotOffered {
            field: "drug",
            value: drug_name.to_string(),
        })?;
        let method = required(&self.method, "method")?;
        let form = non_empty(&self.form);

        let dose = match non_empty(&self.custom_dose) {
            Some(input) => {
                let dose = validate_custom_dose(input, drug, form)?;
                let offered = drug
                    .ranges_containing(dose, form)
                    .any(|r| r.methods.iter().any(|m| m == method));
                if !offered {
                    return Err(not_offered("method", method));
                }
                DoseSelection::Custom(dose)
            }
            None => {
                let label = required(&self.dose, "dose")?;
                let option = drug
                    .fixed_dose(label)
                    .ok_or_else(|| not_offered("dose", label))?;
                let offered = match form {
                    Some(form) => {
                        let form_option = option.form(form).ok_or_else(|| not_offered("form", form))?;
                        form_option.methods.iter().any(|m| m == method)
                    }
                    None => option
                        .forms
                        .iter()
                        .any(|f| f.methods.iter().any(|m| m == method)),
                };
                if !offered {
                    return Err(not_offered("method", method));
                }
                DoseSelection::Fixed(label.to_string())
            }
        };

        let frequency_hours = validate_frequency_hours(
            self.frequency_hours
                .ok_or(ValidationError::MissingField("frequency"))?,
        )?;
        let duration_days = validate_duration(required(&self.duration, "duration")?)?;
        validate_course(frequency_hours, duration_days)?;

        Ok(ValidatedWasteSelection {
            drug: drug.name.clone(),
            dose,
            form: form.map(str::to_string),
            method: method.to_string(),
            frequency_hours,
            duration_days,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ValidationError> {
    non_empty(value).ok_or(ValidationError::MissingField(field))
}

fn not_offered(field: &'static str, value: &str) -> ValidationError {
    ValidationError::NotOffered {
        field,
        value: value.to_string(),
    }
}

/// Impact calculator form state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactSelection {
    pub drug: Option<String>,
    pub method: String,
    pub disposal: Option<String>,
    pub dose: Option<String>,
    pub form: Option<String>,
    /// Days of therapy; 0 while the field is being edited, treated as 1
    pub days: u32,
    /// Doses-per-day multiplier
    pub frequency: Option<String>,
}

impl ImpactSelection {
    /// A fresh form with the given default method.
    pub fn new(default_method: &str) -> Self {
        Self {
            drug: None,
            method: default_method.to_string(),
            disposal: None,
            dose: None,
            form: None,
            days: 1,
            frequency: None,
        }
    }

    /// The impact query for this selection, once a drug is chosen.
    pub fn query(&self) -> Option<ImpactQuery<'_>> {
        let drug = self.drug.as_deref().filter(|d| !d.is_empty())?;
        if self.method.is_empty() {
            return None;
        }
        Some(ImpactQuery {
            drug,
            method: &self.method,
            dose: self.dose.as_deref(),
            form: self.form.as_deref(),
            disposal: self.disposal.as_deref(),
            days: self.days,
            frequency: self.frequency.as_deref(),
        })
    }
}

/// One user input on the impact form.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    Drug(Option<String>),
    Method(String),
    Disposal(Option<String>),
    Dose(Option<String>),
    Form(Option<String>),
    Days(u32),
    Frequency(Option<String>),
}

/// Apply one input event and return the next consistent selection.
///
/// The field the user just changed always keeps its new value; the other
/// of dose/form adapts:
///
/// - a new drug clears dose and form,
/// - clearing the dose clears the form,
/// - a dose the current form is not recorded for clears the form,
/// - a form with no dose, or with a dose it is not recorded for, selects
///   the first dose recorded for that form.
pub fn reconcile_selection(
    current: &ImpactSelection,
    event: SelectionEvent,
    tables: &ImpactTables,
) -> ImpactSelection {
    let mut next = current.clone();
    let blank_to_none = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    match event {
        SelectionEvent::Drug(drug) => {
            next.drug = blank_to_none(drug);
            if next.drug != current.drug {
                next.dose = None;
                next.form = None;
            }
        }
        SelectionEvent::Method(method) => next.method = method,
        SelectionEvent::Disposal(disposal) => next.disposal = blank_to_none(disposal),
        SelectionEvent::Days(days) => next.days = days,
        SelectionEvent::Frequency(frequency) => next.frequency = blank_to_none(frequency),
        SelectionEvent::Dose(dose) => {
            next.dose = blank_to_none(dose);
            let clear_form = match (&next.drug, &next.dose, &next.form) {
                (_, None, _) => true,
                (Some(drug), Some(dose), Some(form)) => !tables.is_form_compatible(drug, dose, form),
                _ => false,
            };
            if clear_form {
                next.form = None;
            }
        }
        SelectionEvent::Form(form) => {
            next.form = blank_to_none(form);
            if let (Some(drug), Some(form)) = (&next.drug, &next.form) {
                let compatible = next
                    .dose
                    .as_deref()
                    .map_or(false, |dose| tables.is_form_compatible(drug, dose, form));
                if !compatible {
                    if let Some(dose) = tables.first_dose_for_form(drug, form) {
                        next.dose = Some(dose);
                    }
                }
            }
        }
    }

    next
}
