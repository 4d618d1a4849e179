//! Side-by-side comparison of saved regimens.

use serde::{Deserialize, Serialize};

use crate::models::{ImpactRegimen, ImpactTotals, WasteRegimen};
use crate::regimen::{doses_for_days, is_lowest_waste, Session, WasteTotal};

/// Comparison of every saved regimen in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Export timestamp
    pub exported_at: String,
    /// Waste calculator regimens, in save order
    pub waste: Vec<WasteRegimenSummary>,
    /// Grams across all waste regimens
    pub total_waste_grams: f64,
    /// Impact calculator regimens, in save order
    pub impact: Vec<ImpactRegimenSummary>,
    /// Sum over impact regimens
    pub impact_totals: ImpactTotals,
}

/// One waste regimen with its course totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteRegimenSummary {
    pub id: String,
    pub drug: String,
    pub dose: String,
    pub form: Option<String>,
    pub method: String,
    pub frequency_hours: f64,
    pub duration_days: u32,
    pub total_doses: u32,
    /// Grams over the full course
    pub total_waste_grams: f64,
    pub lowest_waste: bool,
}

/// One impact regimen with its derived figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactRegimenSummary {
    pub id: String,
    pub drug: String,
    pub method: String,
    pub disposal_method: Option<String>,
    pub dose: Option<String>,
    pub form: Option<String>,
    pub days: u32,
    pub frequency: Option<String>,
    /// Kilograms
    pub waste: f64,
    pub co2e: f64,
    pub distance: f64,
    pub gas: f64,
    pub coal: f64,
    pub phones: f64,
    pub distance_comparison: String,
    pub lowest_waste: bool,
}

impl WasteRegimenSummary {
    pub fn from_regimen(regimen: &WasteRegimen, all: &[WasteRegimen]) -> Self {
        Self {
            id: regimen.id.clone(),
            drug: regimen.drug.clone(),
            dose: regimen.dose.to_string(),
            form: regimen.form.clone(),
            method: regimen.method.clone(),
            frequency_hours: regimen.frequency_hours,
            duration_days: regimen.duration_days,
            total_doses: doses_for_days(regimen.duration_days, regimen.frequency_hours),
            total_waste_grams: regimen.total_waste(),
            lowest_waste: is_lowest_waste(regimen, all),
        }
    }
}

impl ImpactRegimenSummary {
    pub fn from_regimen(regimen: &ImpactRegimen, all: &[ImpactRegimen]) -> Self {
        let impact = &regimen.environmental_impact;
        Self {
            id: regimen.id.clone(),
            drug: regimen.drug.clone(),
            method: regimen.method.clone(),
            disposal_method: regimen.disposal_method.clone(),
            dose: regimen.dose.clone(),
            form: regimen.form.clone(),
            days: regimen.days,
            frequency: regimen.frequency.clone(),
            waste: impact.waste,
            co2e: impact.co2e,
            distance: impact.distance,
            gas: impact.gas,
            coal: impact.coal,
            phones: impact.phones,
            distance_comparison: impact.distance_comparison.clone(),
            lowest_waste: is_lowest_waste(regimen, all),
        }
    }
}

const CSV_HEADER: &str = "kind,id,drug,dose,form,method,frequency,days,doses,waste_g,co2e_t,distance_mi,gas_l,coal_kg,phones,distance_comparison,lowest_waste\n";

impl ComparisonReport {
    /// Build the report from a session's saved regimens.
    pub fn from_session(session: &Session) -> Self {
        let waste_regimens = session.waste_regimens();
        let impact_regimens = session.impact_regimens();

        Self {
            exported_at: chrono::Utc::now().to_rfc3339(),
            waste: waste_regimens
                .iter()
                .map(|r| WasteRegimenSummary::from_regimen(r, waste_regimens))
                .collect(),
            total_waste_grams: session.total_waste_grams(),
            impact: impact_regimens
                .iter()
                .map(|r| ImpactRegimenSummary::from_regimen(r, impact_regimens))
                .collect(),
            impact_totals: session.impact_totals(false),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.waste.is_empty() && self.impact.is_empty()
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV, one line per regimen. Columns that do not apply to a
    /// regimen's calculator are left blank.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);

        for r in &self.waste {
            csv.push_str(&format!(
                "waste,{},{},{},{},{},{},{},{},{},,,,,,,{}\n",
                escape_csv(&r.id),
                escape_csv(&r.drug),
                escape_csv(&r.dose),
                escape_csv(r.form.as_deref().unwrap_or("")),
                escape_csv(&r.method),
                r.frequency_hours,
                r.duration_days,
                r.total_doses,
                r.total_waste_grams,
                r.lowest_waste,
            ));
        }

        for r in &self.impact {
            csv.push_str(&format!(
                "impact,{},{},{},{},{},{},{},,{},{},{},{},{},{},{},{}\n",
                escape_csv(&r.id),
                escape_csv(&r.drug),
                escape_csv(r.dose.as_deref().unwrap_or("")),
                escape_csv(r.form.as_deref().unwrap_or("")),
                escape_csv(&r.method),
                escape_csv(r.frequency.as_deref().unwrap_or("")),
                r.days,
                r.waste * 1000.0,
                r.co2e,
                r.distance,
                r.gas,
                r.coal,
                r.phones,
                escape_csv(&r.distance_comparison),
                r.lowest_waste,
            ));
        }

        csv
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::resolver::{SelectionEvent, WasteSelection};
    use crate::tables::fixtures;

    fn session_with_regimens() -> Session {
        let mut session = Session::new(fixtures::tables(), EngineConfig::default());
        for hours in [6.0, 12.0] {
            session.set_waste_selection(WasteSelection {
                drug: Some("Ampicillin".into()),
                dose: Some("500".into()),
                method: Some("IV".into()),
                frequency_hours: Some(hours),
                duration: Some("7".into()),
                ..WasteSelection::default()
            });
            session.save_waste_regimen().unwrap();
        }
        session.apply(SelectionEvent::Drug(Some("Ampicillin".into())));
        session.save_impact_regimen().unwrap();
        session
    }

    #[test]
    fn test_report_from_session() {
        let report = ComparisonReport::from_session(&session_with_regimens());

        assert_eq!(report.waste.len(), 2);
        assert_eq!(report.waste[0].total_doses, 28);
        assert_eq!(report.waste[1].total_doses, 14);
        assert!(!report.waste[0].lowest_waste);
        assert!(report.waste[1].lowest_waste);

        assert_eq!(report.impact.len(), 1);
        // A single impact regimen is never flagged
        assert!(!report.impact[0].lowest_waste);
        assert_eq!(report.impact_totals.count, 1);
        assert_eq!(report.impact_totals.distance_comparison, "a short drive to the store");
    }

    #[test]
    fn test_report_json() {
        let report = ComparisonReport::from_session(&session_with_regimens());
        let json = report.to_json().unwrap();
        assert!(json.contains("\"total_doses\": 28"));
        assert!(json.contains("a short drive to the store"));
    }

    #[test]
    fn test_report_csv() {
        let report = ComparisonReport::from_session(&session_with_regimens());
        let csv = report.to_csv();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4); // Header + 2 waste + 1 impact
        assert!(lines[0].starts_with("kind,id,drug"));
        assert!(lines[1].starts_with("waste,"));
        assert!(lines[2].ends_with(",true"));
        assert!(lines[3].starts_with("impact,"));

        let header_columns = lines[0].split(',').count();
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), header_columns, "{line}");
        }
    }

    #[test]
    fn test_empty_report() {
        let session = Session::new(fixtures::tables(), EngineConfig::default());
        let report = ComparisonReport::from_session(&session);
        assert!(report.is_empty());
        assert_eq!(report.to_csv(), CSV_HEADER);
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("1000/50mL, premix"), "\"1000/50mL, premix\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
    }
}
