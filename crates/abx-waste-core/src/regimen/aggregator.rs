//! Scaling per-dose waste over a course, and combining regimens.
//!
//! Everything scales linearly with the number of doses except IV tubing,
//! which is replaced every [`TUBING_CHANGE_DAYS`] days whatever the dosing
//! interval.

use crate::models::{EnvironmentalImpact, ImpactRegimen, ImpactTotals, WasteItem, WasteRegimen};
use crate::tables::DistanceScale;

/// Days between IV tubing replacements.
pub const TUBING_CHANGE_DAYS: u32 = 4;

/// Doses given over `duration_hours` at one dose every `frequency_hours`,
/// rounded up. A non-positive or NaN input gives no doses.
///
/// Saturates at `u32::MAX`; validated selections stay below
/// [`MAX_COURSE_DOSES`](crate::resolver::MAX_COURSE_DOSES).
pub fn doses_for_duration(duration_hours: f64, frequency_hours: f64) -> u32 {
    if frequency_hours.is_nan() || duration_hours.is_nan() {
        return 0;
    }
    if frequency_hours <= 0.0 || duration_hours <= 0.0 {
        return 0;
    }
    (duration_hours / frequency_hours)
        .ceil()
        .min(f64::from(u32::MAX)) as u32
}

/// Doses given over a course of whole days.
pub fn doses_for_days(duration_days: u32, frequency_hours: f64) -> u32 {
    doses_for_duration(f64::from(duration_days) * 24.0, frequency_hours)
}

/// Number of tubing sets used over a course, rounded up.
pub fn tubing_changes(duration_days: u32) -> u32 {
    duration_days.div_ceil(TUBING_CHANGE_DAYS)
}

/// Grams of one item over a whole course.
pub fn total_for_item(item: &WasteItem, total_doses: u32, duration_days: u32) -> f64 {
    let multiplier = if item.is_iv_tubing() {
        tubing_changes(duration_days)
    } else {
        total_doses
    };
    item.quantity * item.weight * f64::from(multiplier)
}

/// Grams of all items over a whole course.
pub fn total_for_items(items: &[WasteItem], total_doses: u32, duration_days: u32) -> f64 {
    items
        .iter()
        .map(|item| total_for_item(item, total_doses, duration_days))
        .sum()
}

/// Anything with a comparable total waste figure.
pub trait WasteTotal {
    fn total_waste(&self) -> f64;
}

impl WasteTotal for WasteRegimen {
    /// Grams over the full course.
    fn total_waste(&self) -> f64 {
        let doses = doses_for_days(self.duration_days, self.frequency_hours);
        total_for_items(&self.waste_items, doses, self.duration_days)
    }
}

impl WasteTotal for ImpactRegimen {
    /// Kilograms over the full course.
    fn total_waste(&self) -> f64 {
        self.environmental_impact.waste
    }
}

/// Sum saved impacts, plus the unsaved current one when given.
///
/// The distance comparison is looked up again from the summed distance.
pub fn aggregate(
    regimens: &[ImpactRegimen],
    current: Option<&EnvironmentalImpact>,
    distances: &DistanceScale,
) -> ImpactTotals {
    let mut totals = ImpactTotals::default();
    for impact in regimens
        .iter()
        .map(|r| &r.environmental_impact)
        .chain(current)
    {
        totals.add(impact);
    }
    totals.distance_comparison = if totals.count == 0 {
        String::new()
    } else {
        distances.compare(totals.distance)
    };
    totals
}

/// Grams across all saved waste regimens.
pub fn total_waste_grams(regimens: &[WasteRegimen]) -> f64 {
    regimens.iter().map(WasteTotal::total_waste).sum()
}

/// True when no regimen in `all` has strictly less waste than `regimen`.
/// Needs at least two regimens to mean anything, so it is false otherwise.
pub fn is_lowest_waste<R: WasteTotal>(regimen: &R, all: &[R]) -> bool {
    if all.len() < 2 {
        return false;
    }
    let own = regimen.total_waste();
    all.iter().all(|other| other.total_waste() >= own)
}
