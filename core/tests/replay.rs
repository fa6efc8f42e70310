mod common;

use common::*;
use rating_core::{
    config::EngineConfig,
    disability_income_plugin::DisabilityIncomePlugin,
    engine::RatingEngine,
    error::RatingError,
    rate_table::RateTableCatalog,
    store::RatingStore,
};
use serde_json::json;
use std::sync::Arc;

#[test]
fn replay_reproduces_a_completed_run() {
    let engine = build_engine();
    engine.rate_scenario(&di_scenario("scn-replay"), &no_overrides(), None);
    let run = engine.store().runs_for_scenario("scn-replay").unwrap().remove(0);

    let report = engine.replay_run(&run.run_id).unwrap();

    assert!(report.input_hash_matches);
    assert!(report.output_matches, "stored {:?}\nreplayed {:?}", report.stored, report.replayed);
    assert_eq!(report.replayed.premium_modal, 78.44);
    // Replay never writes to the ledger.
    assert_eq!(engine.store().run_count().unwrap(), 1);
}

#[test]
fn replay_uses_the_table_version_the_run_was_priced_with() {
    let engine = build_engine();
    engine.rate_scenario(
        &di_scenario("scn-retired"),
        &overrides(json!({ "rate_table_version": "2025.4", "payment_mode": "annual" })),
        None,
    );
    let run = engine.store().runs_for_scenario("scn-retired").unwrap().remove(0);
    assert_eq!(run.rate_table_version.as_deref(), Some("2025.4"));

    let report = engine.replay_run(&run.run_id).unwrap();

    assert!(report.output_matches);
    assert_eq!(report.replayed.rate_table_version.as_deref(), Some("2025.4"));
    // 30 × 27.00 × 0.97 + 50
    assert_eq!(report.replayed.premium_annual, 835.70);
}

#[test]
fn replay_reports_drift_after_a_table_change() {
    let engine = build_engine();
    engine.rate_scenario(&di_scenario("scn-drift"), &no_overrides(), None);
    let run = engine.store().runs_for_scenario("scn-drift").unwrap().remove(0);

    // Same version string, different numbers.
    let mut tables = EngineConfig::default_test().rate_tables;
    for table in tables.iter_mut().filter(|t| t.version == "2026.1") {
        for rate in table.base_rates.values_mut() {
            *rate *= 1.10;
        }
    }
    let catalog = Arc::new(RateTableCatalog::from_tables(tables));
    let config = EngineConfig::default_test();
    let mut repriced = RatingEngine::new(
        config.engine_version,
        config.clock,
        catalog.clone(),
        RatingStore::in_memory_migrated().unwrap(),
    );
    repriced
        .register(Arc::new(DisabilityIncomePlugin::new(catalog)))
        .unwrap();
    repriced.store().append_rating_run(&run).unwrap();

    let report = repriced.replay_run(&run.run_id).unwrap();

    assert!(report.input_hash_matches);
    assert!(!report.output_matches);
    assert!(report.replayed.premium_modal > report.stored.premium_modal);
}

#[test]
fn replaying_an_unknown_run_is_an_error() {
    let engine = build_engine();
    let err = engine.replay_run("no-such-run").unwrap_err();
    assert!(matches!(err, RatingError::RunNotFound { .. }));
}

#[test]
fn run_without_input_snapshot_cannot_be_replayed() {
    let engine = build_engine();
    engine.rate_scenario(
        &di_scenario("scn-no-input"),
        &overrides(json!({ "age": "unknown" })),
        None,
    );
    let run = engine.store().runs_for_scenario("scn-no-input").unwrap().remove(0);

    let err = engine.replay_run(&run.run_id).unwrap_err();
    assert!(matches!(err, RatingError::InvalidInput { .. }));
}
