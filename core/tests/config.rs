//! Data-directory loading and ledger seeding.

use caseload_core::{
    backend::MemoryBackend,
    clock::SystemClock,
    config::{DeskConfig, SimulationConfig},
    error::DeskError,
    ledger::WorkloadLedger,
    validation::SpecializationDraft,
};
use std::sync::Arc;

fn empty_ledger() -> WorkloadLedger {
    WorkloadLedger::new(Arc::new(MemoryBackend::new()), Arc::new(SystemClock))
}

fn data_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("caseload-data-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn loads_data_directory() {
    let dir = data_dir("load");
    std::fs::write(
        dir.join("categories.json"),
        r#"{ "categories": [
            { "category_id": "housing", "name": "Housing" },
            { "category_id": "crisis", "name": "Crisis", "auto_assign": false, "crisis_detection_enabled": true }
        ] }"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("specializations.json"),
        r#"{ "specializations": [
            { "counselor_id": "ana", "category_id": "housing", "priority_level": "primary", "max_workload": 8, "expertise_rating": 4 },
            { "counselor_id": "ben", "category_id": "housing" }
        ] }"#,
    )
    .unwrap();

    let config = DeskConfig::load(dir.to_str().unwrap()).unwrap();
    assert_eq!(config.categories.len(), 2);
    assert!(config.category("housing").unwrap().auto_assign, "auto_assign defaults to true");
    assert!(!config.category("crisis").unwrap().auto_assign);
    assert_eq!(config.simulation, SimulationConfig::default(), "simulation.json is optional");

    let ledger = empty_ledger();
    assert_eq!(config.seed_ledger(&ledger).unwrap(), 2);
    assert_eq!(ledger.get("ana", "housing").unwrap().max_workload, 8);
    assert_eq!(ledger.get("ben", "housing").unwrap().max_workload, 10);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_file_names_the_path() {
    let dir = data_dir("missing");
    let err = DeskConfig::load(dir.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("categories.json"), "got: {err}");
    let _ = std::fs::remove_dir_all(&dir);
}

/// One bad row means nothing is seeded.
#[test]
fn seeding_is_all_or_nothing() {
    let mut config = DeskConfig::default_test();
    config.specializations.push(SpecializationDraft::new("eve", "housing").priority("lead"));
    config.specializations.push(SpecializationDraft::new("ana", "housing"));

    let ledger = empty_ledger();
    let err = config.seed_ledger(&ledger).unwrap_err();
    let fields = match err {
        DeskError::Validation(fields) => fields,
        other => panic!("expected validation error, got {other:?}"),
    };
    let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
    assert_eq!(names, vec!["specializations[5].priority_level", "specializations[6]"]);
    assert!(ledger.is_empty(), "no specialization may be added when validation fails");
}
