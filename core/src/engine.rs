//! The rating engine orchestrates one rating attempt end to end.
//!
//! ATTEMPT ORDER (fixed):
//!   1. Build    RateInput from the scenario, overrides merged last
//!   2. Hash     curated input fingerprint
//!   3. Resolve  plugin by product type (the only product-keyed lookup)
//!   4. Invoke   plugin inside a fault boundary
//!   5. Record   exactly one RatingRun, whatever happened above
//!   6. Apply    scenario summary update, completed + priced runs only
//!
//! RULES:
//!   - rate_scenario() always returns a RateOutput. Failures become
//!     ineligible outputs plus an `error` run; they never propagate.
//!   - No code here branches on product type. Product behavior lives
//!     in plugins.
//!   - The plugin registry is fixed after construction.

use crate::{
    clock::RatingClock,
    config::EngineConfig,
    disability_income_plugin::DisabilityIncomePlugin,
    error::{RatingError, RatingResult},
    fingerprint::input_hash,
    input::{Overrides, RateInput},
    long_term_care_plugin::LongTermCarePlugin,
    output::{RateOutput, RateOutputSnapshot},
    plugin::ProductPlugin,
    rate_table::{ProductOptions, RateTableSource},
    run::{RatingRun, RunStatus},
    scenario::Scenario,
    store::RatingStore,
    types::RunId,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub struct RatingEngine {
    engine_version: String,
    clock:          RatingClock,
    rate_tables:    Arc<dyn RateTableSource>,
    plugins:        HashMap<String, Arc<dyn ProductPlugin>>,
    store:          RatingStore,
}

/// What is known about an attempt by the time it ends.
#[derive(Default)]
struct AttemptTrace {
    input: Option<RateInput>,
    hash:  Option<String>,
}

/// Outcome of re-rating a stored run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayReport {
    pub run_id:             RunId,
    pub input_hash_matches: bool,
    pub output_matches:     bool,
    pub stored:             RateOutputSnapshot,
    pub replayed:           RateOutputSnapshot,
}

impl RatingEngine {
    /// An engine with no plugins registered.
    pub fn new(
        engine_version: impl Into<String>,
        clock: RatingClock,
        rate_tables: Arc<dyn RateTableSource>,
        store: RatingStore,
    ) -> Self {
        Self {
            engine_version: engine_version.into(),
            clock,
            rate_tables,
            plugins: HashMap::new(),
            store,
        }
    }

    /// Build a fully wired engine with every product plugin registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(config: &EngineConfig, store: RatingStore) -> RatingResult<Self> {
        let rate_tables: Arc<dyn RateTableSource> = Arc::new(config.catalog());
        let mut engine = Self::new(
            config.engine_version.clone(),
            config.clock,
            rate_tables.clone(),
            store,
        );

        // One line per product family. Adding a product means adding a line.
        engine.register(Arc::new(DisabilityIncomePlugin::new(rate_tables.clone())))?;
        engine.register(Arc::new(LongTermCarePlugin::new(rate_tables)))?;

        Ok(engine)
    }

    /// Fully wired engine over the test catalog and a fresh in-memory store.
    pub fn build_test() -> RatingResult<Self> {
        Self::build(&EngineConfig::default_test(), RatingStore::in_memory_migrated()?)
    }

    /// Register a plugin for every product type it declares.
    /// A product type that is already taken rejects the whole plugin.
    pub fn register(&mut self, plugin: Arc<dyn ProductPlugin>) -> RatingResult<()> {
        for product_type in plugin.product_types() {
            if let Some(existing) = self.plugins.get(*product_type) {
                log::warn!(
                    "rating: refusing plugin '{}' for '{product_type}', already served by '{}'",
                    plugin.name(),
                    existing.name()
                );
                return Err(RatingError::DuplicateProductType {
                    product_type: product_type.to_string(),
                    plugin:       existing.name().to_string(),
                });
            }
        }
        for product_type in plugin.product_types() {
            self.plugins.insert(product_type.to_string(), plugin.clone());
        }
        log::debug!(
            "rating: registered plugin '{}' for {:?}",
            plugin.name(),
            plugin.product_types()
        );
        Ok(())
    }

    /// Registered product-type keys, sorted.
    pub fn registered_products(&self) -> Vec<String> {
        let mut products: Vec<String> = self.plugins.keys().cloned().collect();
        products.sort();
        products
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    pub fn rate_tables(&self) -> &Arc<dyn RateTableSource> {
        &self.rate_tables
    }

    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    /// Rate one scenario. Never fails: every call returns a RateOutput and
    /// appends exactly one RatingRun.
    pub fn rate_scenario(
        &self,
        scenario: &Scenario,
        overrides: &Overrides,
        user_id: Option<&str>,
    ) -> RateOutput {
        let started = Instant::now();
        let mut trace = AttemptTrace::default();

        let (output, status, error_message) = match self.attempt(scenario, overrides, &mut trace) {
            Ok(output) => {
                let output = normalize_eligibility(output);
                let status = RunStatus::for_output(&output);
                (output, status, None)
            }
            Err(e @ RatingError::PluginNotRegistered { .. }) => {
                let reason = e.to_string();
                log::warn!("rating: scenario={} {reason}", scenario.scenario_id);
                (RateOutput::ineligible(reason.clone()), RunStatus::Error, Some(reason))
            }
            Err(e) => {
                let message = e.to_string();
                log::error!(
                    "rating: scenario={} rating engine error: {message}",
                    scenario.scenario_id
                );
                (
                    RateOutput::ineligible(format!("Rating engine error: {message}")),
                    RunStatus::Error,
                    Some(message),
                )
            }
        };

        let product_type = trace
            .input
            .as_ref()
            .map_or(scenario.product_type.as_str(), |i| i.product_type.as_str());
        let output = self.stamp(output, product_type, trace.input.as_ref(), trace.hash.clone());

        match status {
            RunStatus::Completed => log::info!(
                "rating: scenario={} {} priced at {:.2} ({})",
                scenario.scenario_id,
                product_type,
                output.premium_modal,
                output.payment_mode.unwrap_or_default()
            ),
            RunStatus::Ineligible => log::info!(
                "rating: scenario={} {} ineligible: {}",
                scenario.scenario_id,
                product_type,
                output.ineligible_reason.as_deref().unwrap_or_default()
            ),
            RunStatus::Error => {}
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let run = self.record_run(scenario, user_id, &trace, &output, status, error_message, duration_ms);

        if let Some(monthly) = run.quoted_monthly() {
            self.apply_rating_result(scenario, monthly);
        }

        output
    }

    /// Read-only picklist view of a product's active rate table.
    /// None means "not configured": no plugin, or no active table.
    pub fn get_product_options(&self, product_type: &str) -> Option<ProductOptions> {
        self.plugins.get(product_type)?;
        let table = self.rate_tables.active_table(product_type, None)?;
        Some(ProductOptions::from_table(&table))
    }

    /// Re-rate a stored run from its input snapshot and compare the result
    /// with the stored output snapshot. Records nothing.
    pub fn replay_run(&self, run_id: &str) -> RatingResult<ReplayReport> {
        let run = self
            .store
            .rating_run(run_id)?
            .ok_or_else(|| RatingError::RunNotFound { run_id: run_id.to_string() })?;
        let snapshot = run
            .input_snapshot
            .as_deref()
            .ok_or_else(|| RatingError::invalid("input_snapshot", "run has no input snapshot"))?;

        let mut input: RateInput = serde_json::from_str(snapshot)?;
        if input.rate_table_version.is_none() {
            input.rate_table_version = run.rate_table_version.clone();
        }

        let hash = input_hash(&input);
        let plugin = self.resolve(&input.product_type)?;
        let output = normalize_eligibility(invoke(plugin.as_ref(), &input)?);
        let output = self.stamp(output, &input.product_type, Some(&input), Some(hash.clone()));

        let stored: RateOutputSnapshot = serde_json::from_str(&run.output_snapshot)?;
        let replayed = output.snapshot();
        // Both sides go through the same text form so float parsing cannot differ.
        let output_matches = serde_json::from_str::<serde_json::Value>(&run.output_snapshot)?
            == serde_json::from_str::<serde_json::Value>(&serde_json::to_string(&replayed)?)?;
        if !output_matches {
            log::warn!("rating: replay of run {run_id} diverged from the stored output");
        }

        Ok(ReplayReport {
            run_id: run.run_id.clone(),
            input_hash_matches: run.input_hash.as_deref() == Some(hash.as_str()),
            output_matches,
            stored,
            replayed,
        })
    }

    // ── Attempt internals ──────────────────────────────────────

    fn attempt(
        &self,
        scenario: &Scenario,
        overrides: &Overrides,
        trace: &mut AttemptTrace,
    ) -> RatingResult<RateOutput> {
        let mut input = RateInput::from_scenario(scenario, &self.clock)?;
        input.apply_overrides(overrides)?;

        let hash = input_hash(&input);
        log::debug!("rating: scenario={} input_hash={hash}", scenario.scenario_id);
        trace.hash = Some(hash);
        let input = &*trace.input.insert(input);

        let plugin = self.resolve(&input.product_type)?;
        log::debug!(
            "rating: scenario={} dispatching to plugin '{}'",
            scenario.scenario_id,
            plugin.name()
        );
        invoke(plugin.as_ref(), input)
    }

    fn resolve(&self, product_type: &str) -> RatingResult<&Arc<dyn ProductPlugin>> {
        self.plugins
            .get(product_type)
            .ok_or_else(|| RatingError::PluginNotRegistered {
                product_type: product_type.to_string(),
            })
    }

    /// Provenance the engine owns, applied to every output it returns.
    fn stamp(
        &self,
        mut output: RateOutput,
        product_type: &str,
        input: Option<&RateInput>,
        hash: Option<String>,
    ) -> RateOutput {
        output.input_hash = hash;
        output.product_type = Some(product_type.to_string());
        output.payment_mode = input.map(|i| i.payment_mode);
        output.engine_version = Some(self.engine_version.clone());
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn record_run(
        &self,
        scenario: &Scenario,
        user_id: Option<&str>,
        trace: &AttemptTrace,
        output: &RateOutput,
        status: RunStatus,
        error_message: Option<String>,
        duration_ms: u64,
    ) -> RatingRun {
        let completed = status == RunStatus::Completed;
        let mut run = RatingRun {
            id:                    None,
            run_id:                Uuid::new_v4().to_string(),
            scenario_id:           scenario.scenario_id.clone(),
            user_id:               user_id.map(str::to_string),
            product_type:          output
                .product_type
                .clone()
                .unwrap_or_else(|| scenario.product_type.clone()),
            rate_table_version:    output.rate_table_version.clone(),
            engine_version:        self.engine_version.clone(),
            input_hash:            trace.hash.clone(),
            input_snapshot:        trace.input.as_ref().map(to_json),
            output_snapshot:       to_json(output),
            final_premium_annual:  completed.then(|| output.final_premium_annual()),
            final_premium_monthly: completed.then(|| output.final_premium_monthly()),
            status,
            error_message,
            duration_ms,
            created_at:            self.clock.now(),
        };

        match self.store.append_rating_run(&run) {
            Ok(id) => run.id = Some(id),
            Err(e) => log::error!(
                "rating: scenario={} failed to append run {}: {e}",
                scenario.scenario_id,
                run.run_id
            ),
        }
        run
    }

    fn apply_rating_result(&self, scenario: &Scenario, monthly: f64) {
        let applied = self
            .store
            .ensure_scenario(scenario)
            .and_then(|_| self.store.apply_rating_result(&scenario.scenario_id, monthly));
        match applied {
            Ok(summary) => log::debug!(
                "rating: scenario={} best={:?} quotes={}",
                summary.scenario_id,
                summary.best_quoted_premium,
                summary.total_quotes_received
            ),
            Err(e) => log::error!(
                "rating: scenario={} failed to update summary: {e}",
                scenario.scenario_id
            ),
        }
    }
}

/// Call the plugin, turning a panic into an error value.
fn invoke(plugin: &dyn ProductPlugin, input: &RateInput) -> RatingResult<RateOutput> {
    match panic::catch_unwind(AssertUnwindSafe(|| plugin.rate_product(input))) {
        Ok(result) => result,
        Err(payload) => Err(RatingError::PluginPanicked {
            plugin:  plugin.name().to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// `ineligible_reason` is set iff the output is ineligible.
fn normalize_eligibility(mut output: RateOutput) -> RateOutput {
    if output.eligible {
        output.ineligible_reason = None;
    } else if output.ineligible_reason.is_none() {
        output.ineligible_reason = Some("Ineligible".to_string());
    }
    output
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::error!("rating: snapshot serialization failed: {e}");
        "null".to_string()
    })
}
