//! Disability income plugin: individual DI with monthly benefit,
//! elimination period and benefit period.
//!
//! Exposure is the monthly benefit in units of $100. The base rate key is
//! `age:<band>|tob:<N|T>|ep:<days>|bp:<period>`.

use crate::{
    error::{RatingError, RatingResult},
    input::{DisabilityTerms, RateInput},
    output::RateOutput,
    plugin::ProductPlugin,
    pricing::PremiumWorksheet,
    rate_table::RateTableSource,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const PRODUCT_TYPE: &str = "disability_income";

const MIN_ISSUE_AGE: u32 = 18;
const MAX_ISSUE_AGE: u32 = 60;
const MAX_INCOME_REPLACEMENT: f64 = 0.60;
const BENEFIT_UNIT: f64 = 100.0;
const DEFAULT_ELIMINATION_DAYS: u32 = 90;
const DEFAULT_BENEFIT_PERIOD: &str = "to65";

pub struct DisabilityIncomePlugin {
    rate_tables: Arc<dyn RateTableSource>,
}

impl DisabilityIncomePlugin {
    pub fn new(rate_tables: Arc<dyn RateTableSource>) -> Self {
        Self { rate_tables }
    }

    /// First failed rule, if any.
    fn ineligibility(input: &RateInput, terms: &DisabilityTerms) -> Option<String> {
        let Some(age) = input.age else {
            return Some("Applicant age is required".into());
        };
        if !(MIN_ISSUE_AGE..=MAX_ISSUE_AGE).contains(&age) {
            return Some(format!(
                "Issue age {age} is outside the {MIN_ISSUE_AGE}-{MAX_ISSUE_AGE} range"
            ));
        }
        if input.state.is_none() {
            return Some("Applicant state is required".into());
        }
        let benefit = match terms.monthly_benefit_requested {
            Some(b) if b > 0.0 => b,
            _ => return Some("A positive monthly benefit is required".into()),
        };
        if terms
            .uw_class
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("decline"))
        {
            return Some("Applicant was declined in underwriting".into());
        }
        if let Some(income) = input.annual_income.filter(|i| *i > 0.0) {
            let limit = income / 12.0 * MAX_INCOME_REPLACEMENT;
            if benefit > limit {
                return Some(format!(
                    "Requested monthly benefit ${benefit:.2} exceeds the {:.0}% income replacement limit of ${limit:.2}",
                    MAX_INCOME_REPLACEMENT * 100.0
                ));
            }
        }
        None
    }
}

pub(crate) fn age_band(age: u32) -> String {
    if age < 25 {
        return "18-24".into();
    }
    let low = age / 5 * 5;
    format!("{low}-{}", low + 4)
}

impl ProductPlugin for DisabilityIncomePlugin {
    fn name(&self) -> &'static str { "disability_income" }

    fn product_types(&self) -> &'static [&'static str] { &[PRODUCT_TYPE] }

    fn rate_product(&self, input: &RateInput) -> RatingResult<RateOutput> {
        let version = input.rate_table_version.as_deref();
        let table = self
            .rate_tables
            .active_table(&input.product_type, version)
            .ok_or_else(|| RatingError::RateTableMissing {
                product_type: input.product_type.clone(),
                version:      version.unwrap_or("active").to_string(),
            })?;

        let terms = input.disability_terms();
        let mut sheet = PremiumWorksheet::new(&table);

        if let Some(reason) = Self::ineligibility(input, &terms) {
            return Ok(sheet.ineligible(reason));
        }

        // Both unwraps are guarded by ineligibility().
        let age = input.age.unwrap_or_default();
        let benefit = terms.monthly_benefit_requested.unwrap_or_default();
        let elimination = terms.elimination_period_days.unwrap_or(DEFAULT_ELIMINATION_DAYS);
        let period = terms
            .benefit_period
            .clone()
            .unwrap_or_else(|| DEFAULT_BENEFIT_PERIOD.to_string());

        let key = format!(
            "age:{}|tob:{}|ep:{elimination}|bp:{period}",
            age_band(age),
            if input.tobacco { "T" } else { "N" },
        );
        sheet.base_rate(key, benefit / BENEFIT_UNIT)?;

        let mut derived = BTreeMap::new();
        if let Some(class) = &terms.uw_class {
            derived.insert("uw_class".to_string(), class.clone());
        }
        if let Some(state) = &input.state {
            derived.insert("state".to_string(), state.clone());
        }
        if let Some(occupation) = &input.occupation_class {
            derived.insert("occupation_class".to_string(), occupation.clone());
        }
        sheet.apply_factors(&input.factor_selections, &derived)?;
        sheet.apply_riders(&input.rider_selections);
        sheet.apply_fees();
        sheet.modalize(input.payment_mode)?;

        Ok(sheet.finish())
    }
}
