//! Premium worksheet: the staged pricing pipeline shared by plugins.
//!
//! STAGES (fixed order):
//!   1. base rate   exposure × table rate          → base_premium
//!   2. factors     sequential, one option per code → premium_factored
//!   3. riders      each against premium_factored   → premium_with_riders
//!   4. fees        each against premium_with_riders → premium_annual
//!   5. modal       annual × factor + flat fee      → premium_modal
//!
//! A plugin decides eligibility, exposure and the rate key; the
//! worksheet does the rest and records every step in the audit trail.

use crate::{
    error::{RatingError, RatingResult},
    output::{AppliedItem, RateOutput},
    rate_table::RateTable,
    types::PaymentMode,
};
use std::collections::BTreeMap;

pub struct PremiumWorksheet<'t> {
    table:  &'t RateTable,
    output: RateOutput,
}

impl<'t> PremiumWorksheet<'t> {
    pub fn new(table: &'t RateTable) -> Self {
        Self {
            table,
            output: RateOutput {
                rate_table_version: Some(table.version.clone()),
                ..RateOutput::default()
            },
        }
    }

    /// An ineligible result that still records which table was consulted.
    pub fn ineligible(&self, reason: impl Into<String>) -> RateOutput {
        RateOutput {
            rate_table_version: Some(self.table.version.clone()),
            ..RateOutput::ineligible(reason)
        }
    }

    pub fn base_rate(&mut self, key: String, exposure: f64) -> RatingResult<()> {
        let rate = self
            .table
            .base_rate(&key)
            .ok_or_else(|| self.missing("base rate", &key))?;
        let base = exposure * rate;

        self.output.exposure = exposure;
        self.output.base_rate_key = Some(key);
        self.output.base_rate_value = Some(rate);
        self.output.base_premium = base;
        self.carry_forward_from(Stage::Factored, base);
        Ok(())
    }

    /// Apply one option per factor code, in catalog order.
    ///
    /// - `explicit`: user selections; an unknown option is an error.
    /// - `derived`:  selections the plugin infers from the input; an
    ///   unknown option falls back to the factor's default.
    pub fn apply_factors(
        &mut self,
        explicit: &BTreeMap<String, String>,
        derived: &BTreeMap<String, String>,
    ) -> RatingResult<()> {
        let table = self.table;
        let mut running = self.output.base_premium;
        let mut applied = Vec::new();

        for code in table.factor_codes() {
            let row = match explicit.get(code) {
                Some(option) => Some(
                    table
                        .factor_option(code, option)
                        .ok_or_else(|| self.missing("factor", &format!("{code}={option}")))?,
                ),
                None => derived
                    .get(code)
                    .and_then(|option| table.factor_option(code, option))
                    .or_else(|| table.default_factor(code)),
            };
            let Some(row) = row else { continue };

            let delta = row.apply_mode.delta(running, row.value);
            running += delta;
            applied.push(AppliedItem {
                code:   row.code.clone(),
                label:  format!("{}: {}", row.label, row.option_value),
                mode:   row.apply_mode,
                value:  row.value,
                amount: delta,
            });
        }

        self.output.factors_applied = applied;
        self.carry_forward_from(Stage::Factored, running);
        Ok(())
    }

    /// Load every rider that is selected, or on by default when the
    /// selections are silent about it.
    pub fn apply_riders(&mut self, selections: &BTreeMap<String, bool>) {
        let base = self.output.premium_factored;
        let mut loading = 0.0;
        let mut applied = Vec::new();

        for code in selections.keys() {
            if !self.table.riders.iter().any(|r| &r.code == code) {
                log::warn!(
                    "rating: rider '{code}' not offered by {}@{}; ignored",
                    self.table.product_type, self.table.version
                );
            }
        }

        for rider in &self.table.riders {
            let selected = selections.get(&rider.code).copied().unwrap_or(rider.is_default);
            if !selected {
                continue;
            }
            let delta = rider.apply_mode.delta(base, rider.value);
            loading += delta;
            applied.push(AppliedItem {
                code:   rider.code.clone(),
                label:  rider.label.clone(),
                mode:   rider.apply_mode,
                value:  rider.value,
                amount: delta,
            });
        }

        self.output.riders_applied = applied;
        self.carry_forward_from(Stage::WithRiders, base + loading);
    }

    pub fn apply_fees(&mut self) {
        let base = self.output.premium_with_riders;
        let mut total = 0.0;
        let mut applied = Vec::new();

        for fee in &self.table.fees {
            let delta = fee.apply_mode.delta(base, fee.value);
            total += delta;
            applied.push(AppliedItem {
                code:   fee.code.clone(),
                label:  fee.label.clone(),
                mode:   fee.apply_mode,
                value:  fee.value,
                amount: delta,
            });
        }

        self.output.fees_applied = applied;
        self.carry_forward_from(Stage::Annual, base + total);
    }

    /// Convert the annual premium to the billed mode.
    pub fn modalize(&mut self, mode: PaymentMode) -> RatingResult<()> {
        let (factor, fee) = match self.table.modal_factor(mode) {
            Some(m) => (m.factor, m.flat_fee),
            None if mode == PaymentMode::Annual => (1.0, 0.0),
            None => return Err(self.missing("modal factor", mode.as_str())),
        };

        self.output.premium_modal = self.output.premium_annual * factor + fee;
        self.output.modal_mode = Some(mode);
        self.output.modal_factor = Some(factor);
        self.output.modal_fee = Some(fee);
        Ok(())
    }

    pub fn finish(self) -> RateOutput {
        self.output
    }

    /// Later stages start equal to the one just computed so a worksheet
    /// that skips a stage still reports a coherent pipeline.
    fn carry_forward_from(&mut self, stage: Stage, value: f64) {
        if stage <= Stage::Factored {
            self.output.premium_factored = value;
        }
        if stage <= Stage::WithRiders {
            self.output.premium_with_riders = value;
        }
        self.output.premium_annual = value;
    }

    fn missing(&self, kind: &'static str, key: &str) -> RatingError {
        RatingError::MissingRateRow {
            product_type: self.table.product_type.clone(),
            version:      self.table.version.clone(),
            kind,
            key:          key.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Factored,
    WithRiders,
    Annual,
}
