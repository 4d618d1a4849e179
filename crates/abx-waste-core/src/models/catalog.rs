//! Drug catalog models.

use serde::{Deserialize, Serialize};

/// A continuous dose band for one form, served by a set of methods.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoseRange {
    /// Lower bound (inclusive)
    pub min_dose: f64,
    /// Upper bound (inclusive)
    pub max_dose: f64,
    /// Dosage form this band applies to
    pub form: String,
    /// Administration methods, sorted
    pub methods: Vec<String>,
}

impl DoseRange {
    /// Check if a numeric dose falls in this band. Both ends are inclusive.
    pub fn contains(&self, dose: f64) -> bool {
        self.min_dose <= dose && dose <= self.max_dose
    }
}

/// How a catalog dose is expressed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DoseSpec {
    /// A discrete dose label matched by exact string equality (e.g. "500")
    Fixed(String),
    /// Numeric bands; a custom dose matches any band containing it
    Variable(Vec<DoseRange>),
}

impl DoseSpec {
    /// The fixed dose label, if any.
    pub fn fixed(&self) -> Option<&str> {
        match self {
            DoseSpec::Fixed(label) => Some(label),
            DoseSpec::Variable(_) => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, DoseSpec::Variable(_))
    }
}

/// A dosage form and the methods it can be given by.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormOption {
    pub form: String,
    pub methods: Vec<String>,
}

/// One selectable dose of a drug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoseOption {
    pub spec: DoseSpec,
    /// Forms, sorted alphabetically; never empty
    pub forms: Vec<FormOption>,
}

impl DoseOption {
    /// Look up a form by name.
    pub fn form(&self, form: &str) -> Option<&FormOption> {
        self.forms.iter().find(|f| f.form == form)
    }
}

/// A drug with every dose the lookup tables can serve.
///
/// Fixed doses come first in ascending numeric order; the variable dose,
/// if any, is last.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugOption {
    pub name: String,
    pub doses: Vec<DoseOption>,
}

impl DrugOption {
    /// Find the fixed dose with this label.
    pub fn fixed_dose(&self, label: &str) -> Option<&DoseOption> {
        self.doses
            .iter()
            .find(|d| d.spec.fixed() == Some(label))
    }

    /// The variable dose entry, if the drug has one.
    pub fn variable_dose(&self) -> Option<&DoseOption> {
        self.doses.iter().find(|d| d.spec.is_variable())
    }

    /// All dose bands, across forms.
    pub fn dose_ranges(&self) -> &[DoseRange] {
        match self.variable_dose().map(|d| &d.spec) {
            Some(DoseSpec::Variable(ranges)) => ranges.as_slice(),
            _ => &[],
        }
    }

    /// Bands that contain `dose`, optionally restricted to one form.
    pub fn ranges_containing<'a>(
        &'a self,
        dose: f64,
        form: Option<&'a str>,
    ) -> impl Iterator<Item = &'a DoseRange> + 'a {
        self.dose_ranges()
            .iter()
            .filter(move |r| r.contains(dose))
            .filter(move |r| form.map_or(true, |f| r.form == f))
    }
}
