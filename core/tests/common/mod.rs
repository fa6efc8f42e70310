//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use rating_core::{
    config::EngineConfig,
    engine::RatingEngine,
    error::{RatingError, RatingResult},
    input::{CoverageTerms, DisabilityTerms, LongTermCareTerms, Overrides, RateInput},
    output::RateOutput,
    plugin::ProductPlugin,
    scenario::{Coverage, InsuredObject, Scenario},
    store::RatingStore,
    types::{PaymentMode, Sex},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn build_engine() -> RatingEngine {
    RatingEngine::build_test().expect("test engine")
}

/// Engine with only the given plugins registered.
pub fn bare_engine(plugins: Vec<Arc<dyn ProductPlugin>>) -> RatingEngine {
    let config = EngineConfig::default_test();
    let store = RatingStore::in_memory_migrated().expect("in-memory store");
    let mut engine = RatingEngine::new(
        config.engine_version.clone(),
        config.clock,
        Arc::new(config.catalog()),
        store,
    );
    for plugin in plugins {
        engine.register(plugin).expect("register");
    }
    engine
}

pub fn no_overrides() -> Overrides {
    Overrides::new()
}

pub fn overrides(value: serde_json::Value) -> Overrides {
    value.as_object().cloned().expect("overrides must be a JSON object")
}

/// Age 35 on the fixed test date (2026-10-18).
pub fn dob_age_35() -> NaiveDate {
    NaiveDate::from_ymd_opt(1991, 3, 2).expect("valid date")
}

pub fn person(dob: NaiveDate, state: &str, tobacco: bool) -> InsuredObject {
    InsuredObject {
        date_of_birth:    Some(dob),
        sex:              Some(Sex::Female),
        state:            Some(state.into()),
        tobacco:          Some(tobacco),
        annual_income:    Some(120_000.0),
        ..InsuredObject::person()
    }
}

pub fn di_terms(monthly_benefit: f64) -> DisabilityTerms {
    DisabilityTerms {
        monthly_benefit_requested: Some(monthly_benefit),
        elimination_period_days:   Some(90),
        benefit_period:            Some("to65".into()),
        uw_class:                  Some("standard".into()),
    }
}

/// Disability income, age 35, TX, non-tobacco, $3,000/month,
/// 90-day elimination, to-65 benefit period, standard class, monthly billing.
pub fn di_scenario(scenario_id: &str) -> Scenario {
    let mut scenario = Scenario::new(scenario_id, "disability_income");
    scenario.payment_mode = Some(PaymentMode::Monthly);
    scenario.insured_objects.push(person(dob_age_35(), "TX", false));
    scenario.coverages.push(Coverage::with_terms(
        "di_base",
        CoverageTerms::DisabilityIncome(di_terms(3000.0)),
    ));
    scenario
}

/// Long-term care, age 55, $150/day for 3 years, annual billing.
pub fn ltc_scenario(scenario_id: &str) -> Scenario {
    let mut scenario = Scenario::new(scenario_id, "long_term_care");
    let dob = NaiveDate::from_ymd_opt(1971, 6, 15).expect("valid date");
    scenario.insured_objects.push(person(dob, "CA", false));
    scenario.coverages.push(Coverage::with_terms(
        "ltc_base",
        CoverageTerms::LongTermCare(LongTermCareTerms {
            daily_benefit:           Some(150.0),
            benefit_period_years:    Some(3),
            elimination_period_days: Some(90),
            inflation_protection:    None,
            uw_class:                Some("standard".into()),
        }),
    ));
    scenario
}

pub fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-6
}

// ── Test plugins ─────────────────────────────────────────────────

/// Returns an error for every input.
pub struct FailingPlugin;

impl ProductPlugin for FailingPlugin {
    fn name(&self) -> &'static str { "failing" }
    fn product_types(&self) -> &'static [&'static str] { &["failing_product"] }
    fn rate_product(&self, _input: &RateInput) -> RatingResult<RateOutput> {
        Err(RatingError::invalid("rate_table", "seed data unavailable"))
    }
}

/// Panics for every input.
pub struct PanickingPlugin;

impl ProductPlugin for PanickingPlugin {
    fn name(&self) -> &'static str { "panicking" }
    fn product_types(&self) -> &'static [&'static str] { &["panicking_product"] }
    fn rate_product(&self, _input: &RateInput) -> RatingResult<RateOutput> {
        panic!("rate table index out of bounds")
    }
}

/// Ineligible without giving a reason.
pub struct SilentDeclinePlugin;

impl ProductPlugin for SilentDeclinePlugin {
    fn name(&self) -> &'static str { "silent_decline" }
    fn product_types(&self) -> &'static [&'static str] { &["silent_product"] }
    fn rate_product(&self, _input: &RateInput) -> RatingResult<RateOutput> {
        Ok(RateOutput {
            eligible: false,
            ..RateOutput::default()
        })
    }
}

/// Prices at a fixed monthly premium taken from `metadata.price`, and
/// counts how often it was called.
pub struct FixedPricePlugin {
    pub calls: AtomicUsize,
}

impl FixedPricePlugin {
    pub fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProductPlugin for FixedPricePlugin {
    fn name(&self) -> &'static str { "fixed_price" }
    fn product_types(&self) -> &'static [&'static str] { &["fixed_product", "fixed_alias"] }
    fn rate_product(&self, input: &RateInput) -> RatingResult<RateOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let monthly = input
            .metadata
            .get("price")
            .and_then(|v| v.as_f64())
            .unwrap_or(10.0);
        Ok(RateOutput {
            premium_annual: monthly * 12.0,
            premium_modal: monthly,
            modal_mode: Some(PaymentMode::Monthly),
            ..RateOutput::default()
        })
    }
}

/// Scenario for one of the test plugins, billed monthly.
pub fn plugin_scenario(scenario_id: &str, product_type: &str) -> Scenario {
    let mut scenario = Scenario::new(scenario_id, product_type);
    scenario.payment_mode = Some(PaymentMode::Monthly);
    scenario
}
