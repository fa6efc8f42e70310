mod common;

use common::*;
use rating_core::{
    error::RatingError,
    run::RunStatus,
    scenario::Scenario,
    types::PaymentMode,
};
use serde_json::json;
use std::sync::Arc;

#[test]
fn disability_income_prices_through_every_stage() {
    let engine = build_engine();
    let scenario = di_scenario("scn-a");

    let output = engine.rate_scenario(&scenario, &no_overrides(), Some("agent-7"));

    assert!(output.eligible, "expected eligible, got {:?}", output.ineligible_reason);
    assert!(output.ineligible_reason.is_none());
    assert_eq!(
        output.base_rate_key.as_deref(),
        Some("age:35-39|tob:N|ep:90|bp:to65")
    );
    assert!(approx(output.exposure, 30.0));
    assert!(approx(output.base_premium, 855.0));
    // standard ×1.00, TX ×0.97, occupation default ×1.00
    assert!(approx(output.premium_factored, 829.35));
    assert!(approx(output.premium_with_riders, 829.35));
    // + $50 policy fee
    assert!(approx(output.premium_annual, 879.35));
    // 879.35 × 0.0875 + 1.50
    assert!(approx(output.premium_modal, 78.443125));
    assert_eq!(output.modal_mode, Some(PaymentMode::Monthly));
    assert_eq!(output.rate_table_version.as_deref(), Some("2026.1"));
    assert_eq!(output.product_type.as_deref(), Some("disability_income"));
    assert_eq!(output.payment_mode, Some(PaymentMode::Monthly));
    assert_eq!(output.engine_version.as_deref(), Some(engine.engine_version()));
    assert_eq!(output.input_hash.as_ref().map(String::len), Some(64));
    assert_eq!(output.factors_applied.len(), 3);
    assert_eq!(output.fees_applied.len(), 1);
    assert!(output.riders_applied.is_empty());

    let runs = engine.store().runs_for_scenario("scn-a").unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.user_id.as_deref(), Some("agent-7"));
    assert_eq!(run.final_premium_monthly, Some(78.44));
    assert_eq!(run.final_premium_monthly, Some(output.snapshot().premium_modal));
    assert_eq!(run.final_premium_annual, Some(879.35));
    assert_eq!(run.input_hash, output.input_hash);
    assert_eq!(run.rate_table_version.as_deref(), Some("2026.1"));
    assert!(run.error_message.is_none());
    assert!(run.input_snapshot.is_some());
}

#[test]
fn unregistered_product_type_is_an_error_run() {
    let engine = build_engine();
    let scenario = Scenario::new("scn-b", "pet");

    let output = engine.rate_scenario(&scenario, &no_overrides(), None);

    assert!(!output.eligible);
    let reason = output.ineligible_reason.clone().unwrap_or_default();
    assert!(
        reason.contains("No rating plugin registered for product type: pet"),
        "unexpected reason: {reason}"
    );
    assert_eq!(output.product_type.as_deref(), Some("pet"));

    let runs = engine.store().runs_for_scenario("scn-b").unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Error);
    assert!(runs[0].final_premium_monthly.is_none());
    assert!(runs[0]
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("pet"));
    assert!(engine.store().scenario_summary("scn-b").unwrap().is_none());
}

#[test]
fn no_plugin_is_invoked_for_an_unknown_product() {
    let plugin = Arc::new(FixedPricePlugin::new());
    let engine = bare_engine(vec![plugin.clone()]);

    engine.rate_scenario(&plugin_scenario("scn-unknown", "pet"), &no_overrides(), None);

    assert_eq!(plugin.calls(), 0);
    assert_eq!(engine.store().run_count().unwrap(), 1);
}

#[test]
fn plugin_error_is_contained() {
    let engine = bare_engine(vec![Arc::new(FailingPlugin)]);
    let scenario = plugin_scenario("scn-fail", "failing_product");

    let output = engine.rate_scenario(&scenario, &no_overrides(), None);

    assert!(!output.eligible);
    let reason = output.ineligible_reason.unwrap_or_default();
    assert!(reason.starts_with("Rating engine error:"), "got {reason}");
    assert!(reason.contains("seed data unavailable"));

    let runs = engine.store().runs_for_scenario("scn-fail").unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Error);
    assert!(runs[0].input_hash.is_some());
    assert!(runs[0].input_snapshot.is_some());
}

#[test]
fn plugin_panic_is_contained() {
    let engine = bare_engine(vec![Arc::new(PanickingPlugin)]);
    let scenario = plugin_scenario("scn-panic", "panicking_product");

    let output = engine.rate_scenario(&scenario, &no_overrides(), None);

    assert!(!output.eligible);
    let reason = output.ineligible_reason.unwrap_or_default();
    assert!(reason.contains("rate table index out of bounds"), "got {reason}");

    let runs = engine.store().runs_for_scenario("scn-panic").unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Error);

    // The engine is still usable afterwards.
    engine.rate_scenario(&scenario, &no_overrides(), None);
    assert_eq!(engine.store().run_count().unwrap(), 2);
}

#[test]
fn business_ineligibility_is_not_an_error() {
    let engine = build_engine();
    let mut scenario = di_scenario("scn-old");
    scenario.metadata_json.insert("age".into(), json!(64));
    scenario.insured_objects[0].date_of_birth = None;

    let output = engine.rate_scenario(&scenario, &no_overrides(), None);

    assert!(!output.eligible);
    assert!(output
        .ineligible_reason
        .as_deref()
        .unwrap_or_default()
        .contains("Issue age 64"));
    assert_eq!(output.rate_table_version.as_deref(), Some("2026.1"));

    let runs = engine.store().runs_for_scenario("scn-old").unwrap();
    assert_eq!(runs[0].status, RunStatus::Ineligible);
    assert!(runs[0].error_message.is_none());
    assert!(runs[0].final_premium_monthly.is_none());
    assert!(engine.store().scenario_summary("scn-old").unwrap().is_none());
}

#[test]
fn ineligible_output_always_has_a_reason() {
    let engine = bare_engine(vec![Arc::new(SilentDeclinePlugin)]);

    let output = engine.rate_scenario(
        &plugin_scenario("scn-silent", "silent_product"),
        &no_overrides(),
        None,
    );

    assert!(!output.eligible);
    assert!(output.ineligible_reason.is_some());
    assert_eq!(
        engine.store().run_count_by_status(RunStatus::Ineligible).unwrap(),
        1
    );
}

#[test]
fn best_quote_only_moves_down_and_count_always_moves_up() {
    let plugin = Arc::new(FixedPricePlugin::new());
    let engine = bare_engine(vec![plugin.clone()]);
    let mut scenario = plugin_scenario("scn-best", "fixed_product");

    for price in [120.0, 95.5, 130.0, 95.5] {
        scenario.metadata_json.insert("price".into(), json!(price));
        let output = engine.rate_scenario(&scenario, &no_overrides(), None);
        assert!(output.eligible);
    }

    let summary = engine.store().scenario_summary("scn-best").unwrap().unwrap();
    assert_eq!(summary.best_quoted_premium, Some(95.5));
    assert_eq!(summary.total_quotes_received, 4);
    assert_eq!(plugin.calls(), 4);
}

#[test]
fn existing_summary_is_lowered_not_replaced() {
    let engine = build_engine();
    let mut scenario = di_scenario("scn-existing");
    scenario.best_quoted_premium = Some(60.0);
    scenario.total_quotes_received = 3;
    engine.store().upsert_scenario(&scenario).unwrap();

    engine.rate_scenario(&scenario, &no_overrides(), None);

    let summary = engine.store().scenario_summary("scn-existing").unwrap().unwrap();
    // 78.44 is not lower than 60.00
    assert_eq!(summary.best_quoted_premium, Some(60.0));
    assert_eq!(summary.total_quotes_received, 4);

    let loaded = engine.store().load_scenario("scn-existing").unwrap().unwrap();
    assert_eq!(loaded.total_quotes_received, 4);
}

#[test]
fn failed_runs_leave_the_summary_alone() {
    let plugin = Arc::new(FixedPricePlugin::new());
    let engine = bare_engine(vec![plugin, Arc::new(FailingPlugin)]);

    let mut scenario = plugin_scenario("scn-mixed", "fixed_product");
    scenario.metadata_json.insert("price".into(), json!(50.0));
    engine.rate_scenario(&scenario, &no_overrides(), None);

    scenario.product_type = "failing_product".into();
    engine.rate_scenario(&scenario, &no_overrides(), None);

    let summary = engine.store().scenario_summary("scn-mixed").unwrap().unwrap();
    assert_eq!(summary.best_quoted_premium, Some(50.0));
    assert_eq!(summary.total_quotes_received, 1);
    assert_eq!(engine.store().runs_for_scenario("scn-mixed").unwrap().len(), 2);
}

#[test]
fn duplicate_product_type_registration_is_rejected() {
    let mut engine = bare_engine(vec![Arc::new(FixedPricePlugin::new())]);

    let err = engine
        .register(Arc::new(FixedPricePlugin::new()))
        .unwrap_err();

    assert!(matches!(
        err,
        RatingError::DuplicateProductType { ref plugin, .. } if plugin == "fixed_price"
    ));
    assert_eq!(
        engine.registered_products(),
        vec!["fixed_alias".to_string(), "fixed_product".to_string()]
    );
}

#[test]
fn built_engine_registers_every_product_family() {
    let engine = build_engine();
    assert_eq!(
        engine.registered_products(),
        vec!["disability_income".to_string(), "long_term_care".to_string()]
    );
}

#[test]
fn malformed_override_becomes_an_error_run() {
    let engine = build_engine();
    let scenario = di_scenario("scn-bad-override");

    let output = engine.rate_scenario(
        &scenario,
        &overrides(json!({ "payment_mode": "fortnightly" })),
        None,
    );

    assert!(!output.eligible);
    assert!(output
        .ineligible_reason
        .as_deref()
        .unwrap_or_default()
        .contains("payment_mode"));

    let runs = engine.store().runs_for_scenario("scn-bad-override").unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Error);
    assert!(runs[0].input_snapshot.is_none());
    assert!(runs[0].input_hash.is_none());
}

#[test]
fn every_call_appends_exactly_one_run() {
    let engine = build_engine();
    let scenarios = [
        di_scenario("scn-1"),
        Scenario::new("scn-2", "pet"),
        ltc_scenario("scn-3"),
        di_scenario("scn-1"),
    ];

    for scenario in &scenarios {
        engine.rate_scenario(scenario, &no_overrides(), None);
    }

    assert_eq!(engine.store().run_count().unwrap(), 4);
    assert_eq!(engine.store().run_count_by_status(RunStatus::Completed).unwrap(), 3);
    assert_eq!(engine.store().run_count_by_status(RunStatus::Error).unwrap(), 1);

    let runs = engine.store().runs_for_scenario("scn-1").unwrap();
    assert_eq!(runs.len(), 2);
    assert_ne!(runs[0].run_id, runs[1].run_id);
    assert_eq!(runs[0].input_hash, runs[1].input_hash);
}

#[test]
fn overrides_are_applied_before_rating() {
    let engine = build_engine();
    let scenario = di_scenario("scn-override");

    let output = engine.rate_scenario(
        &scenario,
        &overrides(json!({
            "tobacco": true,
            "payment_mode": "annual",
            "rider_selections": { "cola": true },
        })),
        None,
    );

    assert!(output.eligible);
    assert_eq!(
        output.base_rate_key.as_deref(),
        Some("age:35-39|tob:T|ep:90|bp:to65")
    );
    assert_eq!(output.payment_mode, Some(PaymentMode::Annual));
    assert_eq!(output.riders_applied.len(), 1);
    assert_eq!(output.riders_applied[0].code, "cola");
    assert!(approx(output.premium_modal, output.premium_annual));
}
