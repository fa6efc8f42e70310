//! Input fingerprint: the reproducibility hash stamped on every rating.
//!
//! Only a curated subset of RateInput participates: product type, core
//! demographics, requested benefit, selections and payment mode. The
//! requested benefit is resolved the way the plugins resolve it, from the
//! coverage terms or else from the metadata bag.
//! Occupation class, income, build, the remaining coverage terms,
//! metadata, scenario id and a table version pin do NOT participate,
//! so two inputs differing only there share a hash. Keep the field list
//! stable: changing it changes every stored hash.

use crate::{
    input::RateInput,
    types::{PaymentMode, Sex},
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
struct HashedFields<'a> {
    product_type:      &'a str,
    age:               Option<u32>,
    sex:               Option<Sex>,
    state:             Option<&'a str>,
    tobacco:           bool,
    requested_benefit: Option<f64>,
    factor_selections: &'a BTreeMap<String, String>,
    rider_selections:  &'a BTreeMap<String, bool>,
    payment_mode:      PaymentMode,
}

/// Hex-encoded SHA-256 over the canonical JSON of the hashed fields.
pub fn input_hash(input: &RateInput) -> String {
    let fields = HashedFields {
        product_type:      &input.product_type,
        age:               input.age,
        sex:               input.sex,
        state:             input.state.as_deref(),
        tobacco:           input.tobacco,
        requested_benefit: input.requested_benefit(),
        factor_selections: &input.factor_selections,
        rider_selections:  &input.rider_selections,
        payment_mode:      input.payment_mode,
    };
    // Plain structs and string-keyed maps always serialize; the Debug form
    // still covers only the hashed fields.
    let canonical = serde_json::to_string(&fields).unwrap_or_else(|_| format!("{fields:?}"));

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}
