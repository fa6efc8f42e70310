use rating_core::{
    output::{round_money, AppliedItem, RateOutput, RateOutputSnapshot},
    rate_table::ApplyMode,
    types::PaymentMode,
};

fn unrounded_output() -> RateOutput {
    RateOutput {
        exposure:            12.345_678,
        base_premium:        100.004_9,
        premium_factored:    100.006_1,
        premium_with_riders: 112.994_9,
        premium_annual:      162.994_9,
        premium_modal:       14.266_053_75,
        base_rate_key:       Some("k".into()),
        base_rate_value:     Some(8.1),
        fees_applied:        vec![AppliedItem {
            code:   "policy_fee".into(),
            label:  "Annual policy fee".into(),
            mode:   ApplyMode::Add,
            value:  50.0,
            amount: 49.999_9,
        }],
        modal_mode:          Some(PaymentMode::Monthly),
        modal_factor:        Some(0.0875),
        modal_fee:           Some(1.004),
        payment_mode:        Some(PaymentMode::Monthly),
        ..RateOutput::default()
    }
}

#[test]
fn serialization_rounds_money_and_exposure() {
    let json = serde_json::to_value(unrounded_output()).unwrap();

    assert_eq!(json["exposure"], 12.3457);
    assert_eq!(json["base_premium"], 100.0);
    assert_eq!(json["premium_factored"], 100.01);
    assert_eq!(json["premium_with_riders"], 112.99);
    assert_eq!(json["premium_annual"], 162.99);
    assert_eq!(json["premium_modal"], 14.27);
    assert_eq!(json["fees_applied"][0]["amount"], 50.0);
    assert_eq!(json["fees_applied"][0]["value"], 50.0);
    assert_eq!(json["modal_fee"], 1.0);
    // Catalog values are not money and keep their precision.
    assert_eq!(json["modal_factor"], 0.0875);
    assert_eq!(json["base_rate_value"], 8.1);
}

#[test]
fn in_memory_values_keep_full_precision() {
    let output = unrounded_output();
    let _ = serde_json::to_string(&output).unwrap();

    assert_eq!(output.premium_annual, 162.994_9);
    assert_eq!(output.premium_modal, 14.266_053_75);
}

#[test]
fn rounding_does_not_compound_across_stages() {
    // Each stage sits a fraction of a cent away from a rounding edge.
    let output = RateOutput {
        base_premium:        10.004,
        premium_factored:    10.004 * 1.5,
        premium_with_riders: 10.004 * 1.5 * 1.5,
        premium_annual:      10.004 * 1.5 * 1.5,
        premium_modal:       10.004 * 1.5 * 1.5,
        ..RateOutput::default()
    };

    let snapshot = output.snapshot();
    assert_eq!(snapshot.base_premium, 10.0);
    assert_eq!(snapshot.premium_factored, 15.01);
    // 22.509 from full precision; rounding each stage first would give
    // 10.00 → 15.00 → 22.50.
    assert_eq!(snapshot.premium_with_riders, 22.51);
}

#[test]
fn snapshot_round_trips_through_json() {
    let snapshot = unrounded_output().snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: RateOutputSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);
}

#[test]
fn monthly_equivalent_follows_payment_mode() {
    let mut output = unrounded_output();
    assert_eq!(output.final_premium_monthly(), 14.27);

    output.payment_mode = Some(PaymentMode::Annual);
    output.modal_mode = Some(PaymentMode::Annual);
    assert_eq!(output.final_premium_monthly(), round_money(162.994_9 / 12.0));
    assert_eq!(output.final_premium_annual(), 162.99);
}

#[test]
fn ineligible_output_is_unpriced() {
    let output = RateOutput::ineligible("Applicant age is required");
    assert!(!output.eligible);
    assert!(!output.is_priced());
    assert_eq!(output.premium_modal, 0.0);
    assert_eq!(
        output.ineligible_reason.as_deref(),
        Some("Applicant age is required")
    );
}
