//! Long-term care plugin: daily benefit over a benefit period in years.
//!
//! Exposure is the daily benefit in units of $10. The base rate key is
//! `age:<band>|bp:<years>y`.

use crate::{
    disability_income_plugin::age_band,
    error::{RatingError, RatingResult},
    input::RateInput,
    output::RateOutput,
    plugin::ProductPlugin,
    pricing::PremiumWorksheet,
    rate_table::RateTableSource,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const PRODUCT_TYPE: &str = "long_term_care";

const MIN_ISSUE_AGE: u32 = 40;
const MAX_ISSUE_AGE: u32 = 79;
const BENEFIT_UNIT: f64 = 10.0;
const DEFAULT_BENEFIT_YEARS: u32 = 3;

pub struct LongTermCarePlugin {
    rate_tables: Arc<dyn RateTableSource>,
}

impl LongTermCarePlugin {
    pub fn new(rate_tables: Arc<dyn RateTableSource>) -> Self {
        Self { rate_tables }
    }
}

impl ProductPlugin for LongTermCarePlugin {
    fn name(&self) -> &'static str { "long_term_care" }

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
        let mut sheet = PremiumWorksheet::new(&table);

        let terms = input.long_term_care_terms();

        let age = match input.age {
            Some(age) if (MIN_ISSUE_AGE..=MAX_ISSUE_AGE).contains(&age) => age,
            Some(age) => {
                return Ok(sheet.ineligible(format!(
                    "Issue age {age} is outside the {MIN_ISSUE_AGE}-{MAX_ISSUE_AGE} range"
                )))
            }
            None => return Ok(sheet.ineligible("Applicant age is required")),
        };
        let daily_benefit = match terms.daily_benefit {
            Some(b) if b > 0.0 => b,
            _ => return Ok(sheet.ineligible("A positive daily benefit is required")),
        };
        if terms
            .uw_class
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("decline"))
        {
            return Ok(sheet.ineligible("Applicant was declined in underwriting"));
        }

        let years = terms.benefit_period_years.unwrap_or(DEFAULT_BENEFIT_YEARS);
        sheet.base_rate(
            format!("age:{}|bp:{years}y", age_band(age)),
            daily_benefit / BENEFIT_UNIT,
        )?;

        let mut derived = BTreeMap::new();
        if let Some(class) = &terms.uw_class {
            derived.insert("uw_class".to_string(), class.clone());
        }
        if let Some(inflation) = &terms.inflation_protection {
            derived.insert("inflation_protection".to_string(), inflation.clone());
        }
        if let Some(days) = terms.elimination_period_days {
            derived.insert("elimination_period".to_string(), days.to_string());
        }
        sheet.apply_factors(&input.factor_selections, &derived)?;
        sheet.apply_riders(&input.rider_selections);
        sheet.apply_fees();
        sheet.modalize(input.payment_mode)?;

        Ok(sheet.finish())
    }
}
