//! RateOutput: the priced result and its audit trail.
//!
//! Stage values are carried at full precision. Rounding happens only
//! when the output is serialized (see `RateOutputSnapshot`): exposure to
//! 4 places, money to 2. Nothing downstream of a stage ever sees a
//! rounded value.

use crate::{rate_table::ApplyMode, types::PaymentMode};
use serde::{Deserialize, Serialize};

/// One itemized line in the audit trail: a factor, rider or fee.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedItem {
    pub code:   String,
    pub label:  String,
    pub mode:   ApplyMode,
    /// The catalog value as applied (factor, flat amount or fraction).
    pub value:  f64,
    /// Premium contributed by this item.
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "RateOutputSnapshot")]
pub struct RateOutput {
    pub eligible:          bool,
    pub ineligible_reason: Option<String>,

    // ── Premium stages ──────────────────────────────
    pub exposure:            f64,
    pub base_premium:        f64,
    pub premium_factored:    f64,
    pub premium_with_riders: f64,
    pub premium_annual:      f64,
    pub premium_modal:       f64,

    // ── Audit trail ─────────────────────────────────
    pub base_rate_key:   Option<String>,
    pub base_rate_value: Option<f64>,
    pub factors_applied: Vec<AppliedItem>,
    pub riders_applied:  Vec<AppliedItem>,
    pub fees_applied:    Vec<AppliedItem>,
    pub modal_mode:      Option<PaymentMode>,
    pub modal_factor:    Option<f64>,
    pub modal_fee:       Option<f64>,

    // ── Provenance ──────────────────────────────────
    pub rate_table_version: Option<String>,
    pub engine_version:     Option<String>,
    pub input_hash:         Option<String>,
    pub product_type:       Option<String>,
    pub payment_mode:       Option<PaymentMode>,
}

impl Default for RateOutput {
    fn default() -> Self {
        Self {
            eligible:            true,
            ineligible_reason:   None,
            exposure:            0.0,
            base_premium:        0.0,
            premium_factored:    0.0,
            premium_with_riders: 0.0,
            premium_annual:      0.0,
            premium_modal:       0.0,
            base_rate_key:       None,
            base_rate_value:     None,
            factors_applied:     Vec::new(),
            riders_applied:      Vec::new(),
            fees_applied:        Vec::new(),
            modal_mode:          None,
            modal_factor:        None,
            modal_fee:           None,
            rate_table_version:  None,
            engine_version:      None,
            input_hash:          None,
            product_type:        None,
            payment_mode:        None,
        }
    }
}

impl RateOutput {
    pub fn ineligible(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            ineligible_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Eligible and carrying a positive modal premium.
    pub fn is_priced(&self) -> bool {
        self.eligible && self.premium_modal > 0.0
    }

    /// Annual premium rounded to cents, for the run ledger.
    pub fn final_premium_annual(&self) -> f64 {
        round_money(self.premium_annual)
    }

    /// Monthly-equivalent premium: the modal premium itself when billed
    /// monthly, otherwise the annual premium spread over 12 months.
    pub fn final_premium_monthly(&self) -> f64 {
        match self.payment_mode.or(self.modal_mode) {
            Some(PaymentMode::Monthly) => round_money(self.premium_modal),
            _ => round_money(self.premium_annual / 12.0),
        }
    }

    pub fn snapshot(&self) -> RateOutputSnapshot {
        RateOutputSnapshot::from(self.clone())
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

pub fn round_money(value: f64) -> f64 {
    round_to(value, 2)
}

/// The serialized, rounded form of a RateOutput. This is the stable shape
/// consumers and the audit ledger rely on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateOutputSnapshot {
    pub eligible:            bool,
    pub ineligible_reason:   Option<String>,
    pub exposure:            f64,
    pub base_premium:        f64,
    pub premium_factored:    f64,
    pub premium_with_riders: f64,
    pub premium_annual:      f64,
    pub premium_modal:       f64,
    pub base_rate_key:       Option<String>,
    pub base_rate_value:     Option<f64>,
    pub factors_applied:     Vec<AppliedItem>,
    pub riders_applied:      Vec<AppliedItem>,
    pub fees_applied:        Vec<AppliedItem>,
    pub modal_mode:          Option<PaymentMode>,
    pub modal_factor:        Option<f64>,
    pub modal_fee:           Option<f64>,
    pub rate_table_version:  Option<String>,
    pub engine_version:      Option<String>,
    pub input_hash:          Option<String>,
    pub product_type:        Option<String>,
    pub payment_mode:        Option<PaymentMode>,
}

fn rounded_items(items: Vec<AppliedItem>) -> Vec<AppliedItem> {
    items
        .into_iter()
        .map(|item| AppliedItem {
            amount: round_money(item.amount),
            ..item
        })
        .collect()
}

impl From<RateOutput> for RateOutputSnapshot {
    fn from(o: RateOutput) -> Self {
        Self {
            eligible:            o.eligible,
            ineligible_reason:   o.ineligible_reason,
            exposure:            round_to(o.exposure, 4),
            base_premium:        round_money(o.base_premium),
            premium_factored:    round_money(o.premium_factored),
            premium_with_riders: round_money(o.premium_with_riders),
            premium_annual:      round_money(o.premium_annual),
            premium_modal:       round_money(o.premium_modal),
            base_rate_key:       o.base_rate_key,
            base_rate_value:     o.base_rate_value,
            factors_applied:     rounded_items(o.factors_applied),
            riders_applied:      rounded_items(o.riders_applied),
            fees_applied:        rounded_items(o.fees_applied),
            modal_mode:          o.modal_mode,
            modal_factor:        o.modal_factor,
            modal_fee:           o.modal_fee.map(round_money),
            rate_table_version:  o.rate_table_version,
            engine_version:      o.engine_version,
            input_hash:          o.input_hash,
            product_type:        o.product_type,
            payment_mode:        o.payment_mode,
        }
    }
}
