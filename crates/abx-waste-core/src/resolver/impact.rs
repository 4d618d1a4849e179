//! Environmental impact resolution.
//!
//! Base figures come from the most specific tier the selection allows:
//!
//! | Selection          | Tiers tried |
//! |--------------------|-------------|
//! | dose and form      | 3, 2, 1     |
//! | dose only          | 2, 1        |
//! | neither, form only | 1           |
//!
//! Derived figures scale the per-dose values by the frequency multiplier
//! when one is given, and the per-DOT values otherwise.

use tracing::debug;

use crate::models::{BaseImpact, EnvironmentalImpact, ImpactTier};
use crate::tables::{DistanceScale, ImpactKey, ImpactTables};

/// Metric tons CO2e per mile driven by an average passenger vehicle.
pub const CO2E_PER_MILE: f64 = 0.000391;

/// Metric tons CO2e per gallon of gasoline burned.
pub const CO2E_PER_GALLON_GAS: f64 = 0.00887;

/// Liters per US gallon.
pub const LITERS_PER_GALLON: f64 = 3.78541;

/// Metric tons CO2e per kilogram of coal burned.
pub const CO2E_PER_KG_COAL: f64 = 0.000907;

/// Metric tons CO2e per smartphone charge.
pub const CO2E_PER_PHONE_CHARGE: f64 = 0.0000151;

const GRAMS_PER_KG: f64 = 1000.0;

/// What to look up and over how long.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImpactQuery<'a> {
    pub drug: &'a str,
    pub method: &'a str,
    pub dose: Option<&'a str>,
    pub form: Option<&'a str>,
    pub disposal: Option<&'a str>,
    /// Days of therapy; values below 1 count as 1
    pub days: u32,
    /// Doses-per-day multiplier; blank or absent uses the per-DOT figures
    pub frequency: Option<&'a str>,
}

impl<'a> ImpactQuery<'a> {
    /// Query for one day of a drug given by a method.
    pub fn new(drug: &'a str, method: &'a str) -> Self {
        Self {
            drug,
            method,
            days: 1,
            ..Self::default()
        }
    }

    /// Tiers to try, most specific first.
    pub fn tiers(&self) -> &'static [ImpactTier] {
        match (present(self.dose), present(self.form)) {
            (Some(_), Some(_)) => &[ImpactTier::DoseForm, ImpactTier::Dose, ImpactTier::DrugMethod],
            (Some(_), None) => &[ImpactTier::Dose, ImpactTier::DrugMethod],
            _ => &[ImpactTier::DrugMethod],
        }
    }

    fn key(&self) -> ImpactKey<'a> {
        ImpactKey {
            drug: self.drug,
            method: self.method,
            disposal: present(self.disposal),
            dose: present(self.dose),
            form: present(self.form),
        }
    }
}

/// Resolves impact queries against the impact sheet.
pub struct ImpactResolver<'a> {
    tables: &'a ImpactTables,
}

impl<'a> ImpactResolver<'a> {
    pub fn new(tables: &'a ImpactTables) -> Self {
        Self { tables }
    }

    /// Base figures and the tier they came from, or `None` when no tier
    /// has data for the selection.
    pub fn lookup_base(&self, query: &ImpactQuery<'_>) -> Option<(ImpactTier, BaseImpact)> {
        let key = query.key();
        query.tiers().iter().find_map(|&tier| {
            self.tables.find(tier, &key).map(|row| {
                debug!(
                    drug = query.drug,
                    method = query.method,
                    tier = tier as u8,
                    line = row.line,
                    "Impact tier matched"
                );
                (tier, row.base)
            })
        })
    }

    /// Resolve the impact of a query. `None` means no data, which is an
    /// expected outcome and not an error.
    pub fn resolve(&self, query: &ImpactQuery<'_>) -> Option<EnvironmentalImpact> {
        let (tier, base) = self.lookup_base(query)?;
        Some(derive_impact(
            base,
            tier,
            query.days,
            query.frequency,
            self.tables.distances(),
        ))
    }

    pub fn distances(&self) -> &DistanceScale {
        self.tables.distances()
    }
}

/// Parse a doses-per-day multiplier. Blank, absent or malformed input is 0,
/// which selects the per-DOT path.
pub fn frequency_multiplier(frequency: Option<&str>) -> f64 {
    present(frequency)
        .and_then(|f| f.parse::<f64>().ok())
        .filter(|f| f.is_finite())
        .unwrap_or(0.0)
}

/// Compute totals and everyday equivalents from base figures.
pub fn derive_impact(
    base: BaseImpact,
    tier: ImpactTier,
    days: u32,
    frequency: Option<&str>,
    distances: &DistanceScale,
) -> EnvironmentalImpact {
    let days = f64::from(days.max(1));
    let multiplier = frequency_multiplier(frequency);

    let (grams, co2e) = if multiplier != 0.0 {
        (
            days * base.weight_per_dose * multiplier,
            days * base.co2e_per_dose * multiplier,
        )
    } else {
        (days * base.weight_per_dot, days * base.co2e_per_dot)
    };

    let equivalents = Equivalents::from_co2e(co2e);
    EnvironmentalImpact {
        base,
        tier,
        waste: grams / GRAMS_PER_KG,
        co2e,
        distance: equivalents.distance,
        gas: equivalents.gas,
        coal: equivalents.coal,
        phones: equivalents.phones,
        distance_comparison: distances.compare(equivalents.distance),
    }
}

/// Everyday equivalents of an amount of CO2e.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equivalents {
    /// Miles driven
    pub distance: f64,
    /// Liters of gasoline
    pub gas: f64,
    /// Kilograms of coal
    pub coal: f64,
    /// Phone charges
    pub phones: f64,
}

impl Equivalents {
    pub fn from_co2e(co2e: f64) -> Self {
        Self {
            distance: co2e / CO2E_PER_MILE,
            gas: (co2e / CO2E_PER_GALLON_GAS) * LITERS_PER_GALLON,
            coal: co2e / CO2E_PER_KG_COAL,
            phones: co2e / CO2E_PER_PHONE_CHARGE,
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
