//! Seeded synthetic scenario batches.
//!
//! RULE: Same seed, same batch. All randomness flows through one
//! Pcg64Mcg stream derived from the --seed flag, so a batch (and the
//! input hashes it produces) can be regenerated exactly.

use chrono::{Datelike, NaiveDate};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use rating_core::{
    input::{CoverageTerms, DisabilityTerms, LongTermCareTerms},
    scenario::{Coverage, InsuredObject, Scenario},
    types::{PaymentMode, Sex},
};

const STATES: [&str; 6] = ["TX", "CA", "NY", "FL", "OH", "WA"];
const DI_UW_CLASSES: [&str; 3] = ["preferred", "standard", "substandard"];
const LTC_UW_CLASSES: [&str; 3] = ["preferred", "standard", "class_2"];
const INFLATION: [&str; 3] = ["none", "simple_3", "compound_3"];
const BENEFIT_PERIODS: [&str; 2] = ["to65", "5yr"];

pub struct ScenarioRng {
    inner: Pcg64Mcg,
}

impl ScenarioRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15),
        }
    }

    /// Roll a float in [0.0, 1.0).
    fn next_f64(&mut self) -> f64 {
        (self.inner.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll an integer in [lo, hi].
    fn between(&mut self, lo: u32, hi: u32) -> u32 {
        lo + (self.inner.next_u64() % u64::from(hi - lo + 1)) as u32
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.inner.next_u64() % items.len() as u64) as usize]
    }

    fn payment_mode(&mut self) -> PaymentMode {
        PaymentMode::ALL[(self.inner.next_u64() % PaymentMode::ALL.len() as u64) as usize]
    }
}

/// Generate `count` scenarios alternating between the two reference
/// product families. Ages deliberately run a little past each family's
/// issue range so batches include ineligible quotes.
pub fn generate(seed: u64, count: usize, as_of: NaiveDate) -> Vec<Scenario> {
    let mut rng = ScenarioRng::new(seed);
    (0..count)
        .map(|i| {
            let id = format!("syn-{seed}-{i:04}");
            if i % 2 == 0 {
                disability_income(&mut rng, id, as_of)
            } else {
                long_term_care(&mut rng, id, as_of)
            }
        })
        .collect()
}

fn insured(rng: &mut ScenarioRng, age: u32, as_of: NaiveDate) -> InsuredObject {
    // January 1st birthdays keep the age exact for any as_of date.
    let dob = NaiveDate::from_ymd_opt(as_of.year() - age as i32, 1, 1);
    InsuredObject {
        date_of_birth:    dob,
        sex:              Some(if rng.chance(0.5) { Sex::Male } else { Sex::Female }),
        state:            Some(rng.pick(&STATES).to_string()),
        tobacco:          Some(rng.chance(0.15)),
        occupation_class: Some(rng.between(1, 4).to_string()),
        annual_income:    Some(f64::from(rng.between(30, 250)) * 1000.0),
        ..InsuredObject::person()
    }
}

fn disability_income(rng: &mut ScenarioRng, id: String, as_of: NaiveDate) -> Scenario {
    let age = rng.between(20, 63);
    let mut scenario = Scenario::new(id, "disability_income");
    scenario.payment_mode = Some(rng.payment_mode());
    scenario.insured_objects.push(insured(rng, age, as_of));
    scenario.coverages.push(Coverage::with_terms(
        "di_base",
        CoverageTerms::DisabilityIncome(DisabilityTerms {
            monthly_benefit_requested: Some(f64::from(rng.between(10, 80)) * 100.0),
            elimination_period_days:   Some(if rng.chance(0.2) { 30 } else { 90 }),
            benefit_period:            Some(rng.pick(&BENEFIT_PERIODS).to_string()),
            uw_class:                  Some(rng.pick(&DI_UW_CLASSES).to_string()),
        }),
    ));
    scenario
}

fn long_term_care(rng: &mut ScenarioRng, id: String, as_of: NaiveDate) -> Scenario {
    let age = rng.between(38, 82);
    let mut scenario = Scenario::new(id, "long_term_care");
    scenario.payment_mode = Some(if rng.chance(0.5) {
        PaymentMode::Monthly
    } else {
        PaymentMode::Annual
    });
    scenario.insured_objects.push(insured(rng, age, as_of));
    scenario.coverages.push(Coverage::with_terms(
        "ltc_base",
        CoverageTerms::LongTermCare(LongTermCareTerms {
            daily_benefit:           Some(f64::from(rng.between(10, 30)) * 10.0),
            benefit_period_years:    Some(if rng.chance(0.7) { 3 } else { 5 }),
            elimination_period_days: Some([30, 90, 180][rng.between(0, 2) as usize]),
            inflation_protection:    Some(rng.pick(&INFLATION).to_string()),
            uw_class:                Some(rng.pick(&LTC_UW_CLASSES).to_string()),
        }),
    ));
    scenario
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_batch() {
        let as_of = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(generate(7, 20, as_of), generate(7, 20, as_of));
        assert_ne!(generate(7, 20, as_of), generate(8, 20, as_of));
    }
}
