//! Session integration tests through the exported API object.

use std::fs;
use std::path::PathBuf;

use abx_waste_core::tables::{TableError, IMPACT_FILE, WASTE_LIST_FILE, WEIGHTS_FILE};
use abx_waste_core::{
    open_session_from_csv, open_session_from_dir, AbxWasteCore, AbxWasteError, EngineConfig,
    FfiRegimenKind, FfiSelectionEvent, FfiWasteSelection, LookupTables,
};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

fn open() -> std::sync::Arc<AbxWasteCore> {
    open_session_from_dir(data_dir().display().to_string(), None).unwrap()
}

fn cefazolin(frequency_hours: f64, days: &str) -> FfiWasteSelection {
    FfiWasteSelection {
        drug: Some("Cefazolin".to_string()),
        dose: Some("1000".to_string()),
        custom_dose: None,
        form: Some("Vial".to_string()),
        method: Some("IV".to_string()),
        frequency_hours: Some(frequency_hours),
        duration: Some(days.to_string()),
    }
}

fn event_drug(name: &str) -> FfiSelectionEvent {
    FfiSelectionEvent::Drug {
        value: Some(name.to_string()),
    }
}

#[test]
fn test_open_from_csv_text() -> anyhow::Result<()> {
    let dir = data_dir();
    let core = open_session_from_csv(
        fs::read_to_string(dir.join(WASTE_LIST_FILE))?,
        fs::read_to_string(dir.join(WEIGHTS_FILE))?,
        fs::read_to_string(dir.join(IMPACT_FILE))?,
        Some(r#"{"default_method":"PO"}"#.to_string()),
    )?;

    assert_eq!(core.drug_catalog()?.len(), 3);
    assert_eq!(core.get_impact_selection()?.method, "PO");
    assert_eq!(core.frequency_options()?.len(), 6);
    Ok(())
}

#[test]
fn test_open_rejects_bad_config() {
    let result = open_session_from_dir(
        data_dir().display().to_string(),
        Some("{not json".to_string()),
    );
    assert!(matches!(result, Err(AbxWasteError::LoadError(_))));
}

#[test]
fn test_missing_table_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::copy(data_dir().join(WASTE_LIST_FILE), dir.path().join(WASTE_LIST_FILE))?;
    fs::copy(data_dir().join(WEIGHTS_FILE), dir.path().join(WEIGHTS_FILE))?;

    let result = LookupTables::load_dir(dir.path(), &EngineConfig::default());
    assert!(matches!(result, Err(TableError::Io(_))));

    let result = open_session_from_dir(dir.path().display().to_string(), None);
    assert!(matches!(result, Err(AbxWasteError::LoadError(_))));
    Ok(())
}

#[test]
fn test_empty_table_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    for file in [WASTE_LIST_FILE, WEIGHTS_FILE] {
        fs::copy(data_dir().join(file), dir.path().join(file))?;
    }
    fs::write(dir.path().join(IMPACT_FILE), "\n\n")?;

    let result = LookupTables::load_dir(dir.path(), &EngineConfig::default());
    assert!(matches!(result, Err(TableError::Empty(_))));
    Ok(())
}

#[test]
fn test_duplicate_rows_rejected_when_strict() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    for file in [WEIGHTS_FILE, IMPACT_FILE] {
        fs::copy(data_dir().join(file), dir.path().join(file))?;
    }
    let mut waste = fs::read_to_string(data_dir().join(WASTE_LIST_FILE))?;
    waste.push_str("Cefazolin,1000,,,mg,Vial,IV,3,3,1,1,1,,\n");
    fs::write(dir.path().join(WASTE_LIST_FILE), waste)?;

    let lenient = LookupTables::load_dir(dir.path(), &EngineConfig::default())?;
    assert_eq!(lenient.duplicate_keys().len(), 1);

    let strict = EngineConfig::from_json(r#"{"duplicate_policy":"reject"}"#)?;
    let result = LookupTables::load_dir(dir.path(), &strict);
    assert!(matches!(result, Err(TableError::DuplicateKey(_))));
    Ok(())
}

#[test]
fn test_waste_calculator_flow() -> anyhow::Result<()> {
    let core = open();

    core.set_waste_selection(cefazolin(8.0, "7"))?;
    let calc = core.calculate_waste()?;
    assert_eq!(calc.total_doses, 21);
    assert!((calc.total_waste - 935.7).abs() < 1e-6);

    let first = core.save_waste_regimen()?;
    assert_eq!(first.dose, "1000");
    assert!(!first.is_custom_dose);
    assert_eq!(core.get_waste_selection()?.drug, None);

    core.set_waste_selection(cefazolin(12.0, "7"))?;
    let second = core.save_waste_regimen()?;

    assert_eq!(core.list_waste_regimens()?.len(), 2);
    assert!(core.is_lowest_waste(second.id.clone())?);
    assert!(!core.is_lowest_waste(first.id.clone())?);

    assert_eq!(core.delete_regimen(second.id)?, FfiRegimenKind::Waste);
    // One regimen left: nothing to compare against
    assert!(!core.is_lowest_waste(first.id)?);
    Ok(())
}

#[test]
fn test_waste_errors_map_to_ffi() -> anyhow::Result<()> {
    let core = open();

    core.set_waste_selection(FfiWasteSelection {
        dose: None,
        custom_dose: Some("5000".to_string()),
        ..cefazolin(8.0, "7")
    })?;
    assert!(matches!(
        core.calculate_waste(),
        Err(AbxWasteError::InvalidInput(_))
    ));
    assert!(matches!(
        core.save_waste_regimen(),
        Err(AbxWasteError::InvalidInput(_))
    ));

    assert!(matches!(
        core.delete_regimen("no-such-id".to_string()),
        Err(AbxWasteError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn test_oversized_duration_keeps_session_usable() -> anyhow::Result<()> {
    let core = open();

    core.set_waste_selection(cefazolin(8.0, "4294967295"))?;
    assert!(matches!(
        core.calculate_waste(),
        Err(AbxWasteError::InvalidInput(_))
    ));

    core.set_waste_selection(cefazolin(8.0, "3650"))?;
    assert_eq!(core.calculate_waste()?.total_doses, 3650 * 3);
    Ok(())
}

#[test]
fn test_impact_calculator_flow() -> anyhow::Result<()> {
    let core = open();

    core.apply_impact_event(event_drug("Cefazolin"))?;
    let selection = core.apply_impact_event(FfiSelectionEvent::Form {
        value: Some("Premix".to_string()),
    })?;
    // Choosing a form with no dose picks the first dose recorded for it
    assert_eq!(selection.dose.as_deref(), Some("2000"));

    core.apply_impact_event(FfiSelectionEvent::Days { value: 5 })?;
    core.apply_impact_event(FfiSelectionEvent::Frequency {
        value: Some("2".to_string()),
    })?;

    let impact = core.calculate_impact()?.expect("impact data for premix");
    assert_eq!(impact.tier, 3);
    assert!((impact.waste - 0.9).abs() < 1e-9);
    assert_eq!(impact.distance_comparison, "a trip to the next city");

    let saved = core.save_impact_regimen()?;
    assert_eq!(saved.form.as_deref(), Some("Premix"));
    assert_eq!(core.get_impact_selection()?.drug, None);

    core.apply_impact_event(event_drug("Cefazolin"))?;
    core.calculate_impact()?;

    let totals = core.impact_totals(true)?;
    assert_eq!(totals.count, 2);
    assert!((totals.waste - 1.035).abs() < 1e-9);
    assert!((totals.co2e - 0.0046).abs() < 1e-12);
    // 11.76 miles together
    assert_eq!(totals.distance_comparison, "a trip to the next city");

    assert_eq!(core.impact_totals(false)?.count, 1);
    Ok(())
}

#[test]
fn test_impact_without_data() -> anyhow::Result<()> {
    let core = open();

    core.apply_impact_event(event_drug("Vancomycin"))?;
    core.apply_impact_event(FfiSelectionEvent::Method {
        value: "PO".to_string(),
    })?;

    assert!(core.calculate_impact()?.is_none());
    assert!(matches!(
        core.save_impact_regimen(),
        Err(AbxWasteError::NoData(_))
    ));
    assert!(core.list_impact_regimens()?.is_empty());
    Ok(())
}

#[test]
fn test_edit_and_update_impact_regimen() -> anyhow::Result<()> {
    let core = open();

    core.apply_impact_event(event_drug("Cefazolin"))?;
    let saved = core.save_impact_regimen()?;

    assert_eq!(core.edit_regimen(saved.id.clone())?, FfiRegimenKind::Impact);
    assert_eq!(core.get_impact_selection()?.drug.as_deref(), Some("Cefazolin"));

    core.apply_impact_event(FfiSelectionEvent::Days { value: 3 })?;
    core.update_regimen(saved.id.clone())?;

    let regimens = core.list_impact_regimens()?;
    assert_eq!(regimens.len(), 1);
    assert_eq!(regimens[0].id, saved.id);
    assert_eq!(regimens[0].days, 3);
    assert!((regimens[0].environmental_impact.waste - 0.405).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_catalog_queries() -> anyhow::Result<()> {
    let core = open();

    assert_eq!(core.search_drugs("CEF".to_string())?, vec!["Cefazolin"]);
    assert_eq!(core.search_drugs("vancomicin".to_string())?, vec!["Vancomycin"]);
    assert_eq!(core.search_impact_drugs("".to_string())?.len(), 3);

    assert_eq!(core.impact_methods("Cefazolin".to_string())?, vec!["IV", "IM"]);
    assert_eq!(
        core.impact_forms("Cefazolin".to_string(), Some("2000".to_string()))?,
        vec!["Premix", "Vial"]
    );
    assert!(core.impact_disposal_methods("Cefazolin".to_string())?.is_empty());
    assert!(core.duplicate_keys()?.is_empty());

    let vancomycin = core
        .drug_catalog()?
        .into_iter()
        .find(|d| d.name == "Vancomycin")
        .expect("vancomycin in catalog");
    assert!(vancomycin.fixed_doses.is_empty());
    assert_eq!(vancomycin.dose_ranges.len(), 3);
    Ok(())
}

#[test]
fn test_export_and_reset() -> anyhow::Result<()> {
    let core = open();

    core.set_waste_selection(cefazolin(8.0, "7"))?;
    core.save_waste_regimen()?;
    core.apply_impact_event(event_drug("Cefazolin"))?;
    core.save_impact_regimen()?;

    let csv = core.export_comparison_csv()?;
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("waste,"));
    assert!(csv.contains("impact,"));

    let json: serde_json::Value = serde_json::from_str(&core.export_comparison_json()?)?;
    assert_eq!(json["waste"][0]["total_doses"], 21);
    assert_eq!(json["impact_totals"]["count"], 1);

    core.reset()?;
    assert!(core.list_waste_regimens()?.is_empty());
    assert!(core.list_impact_regimens()?.is_empty());
    assert_eq!(core.export_comparison_csv()?.lines().count(), 1);
    Ok(())
}
