//! RateInput: the normalized request every product plugin rates.
//!
//! A RateInput is built once per rating attempt from a Scenario plus
//! caller overrides and is handed to the plugin by shared reference.
//! Shared demographics live on the struct itself; product-family fields
//! live in the `CoverageTerms` variant, which only plugins inspect.

use crate::{
    clock::RatingClock,
    error::{RatingError, RatingResult},
    scenario::{Coverage, InsuredObject, RiskFactor, Scenario},
    types::{PaymentMode, ScenarioId, Sex},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Caller-supplied field overrides, merged last.
pub type Overrides = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateInput {
    pub product_type:       String,
    pub scenario_id:        ScenarioId,
    pub payment_mode:       PaymentMode,
    pub rate_table_version: Option<String>,

    // ── Shared demographics ─────────────────────────
    pub age:              Option<u32>,
    pub sex:              Option<Sex>,
    pub state:            Option<String>,
    pub tobacco:          bool,
    pub occupation_class: Option<String>,
    pub annual_income:    Option<f64>,
    pub height_inches:    Option<f64>,
    pub weight_pounds:    Option<f64>,

    // ── Product-family extension ────────────────────
    pub coverage: CoverageTerms,

    // ── Selections (opaque to the engine) ───────────
    pub factor_selections: BTreeMap<String, String>,
    pub rider_selections:  BTreeMap<String, bool>,

    // ── Raw scenario sub-aggregates ─────────────────
    pub risk_factors:    Vec<RiskFactor>,
    pub insured_objects: Vec<InsuredObject>,
    pub coverages:       Vec<Coverage>,
    pub metadata:        Map<String, Value>,
}

impl RateInput {
    /// An input with nothing but its identity set.
    pub fn empty(product_type: impl Into<String>, scenario_id: impl Into<ScenarioId>) -> Self {
        Self {
            product_type:       product_type.into(),
            scenario_id:        scenario_id.into(),
            payment_mode:       PaymentMode::default(),
            rate_table_version: None,
            age:                None,
            sex:                None,
            state:              None,
            tobacco:            false,
            occupation_class:   None,
            annual_income:      None,
            height_inches:      None,
            weight_pounds:      None,
            coverage:           CoverageTerms::Unspecified,
            factor_selections:  BTreeMap::new(),
            rider_selections:   BTreeMap::new(),
            risk_factors:       Vec::new(),
            insured_objects:    Vec::new(),
            coverages:          Vec::new(),
            metadata:           Map::new(),
        }
    }

    /// Build from a scenario. Demographics come from the primary insured
    /// person; each field the person lacks falls back to the metadata bag.
    pub fn from_scenario(scenario: &Scenario, clock: &RatingClock) -> RatingResult<Self> {
        let meta = &scenario.metadata_json;
        let person = scenario.primary_insured();
        let mut input = Self::empty(scenario.product_type.clone(), scenario.scenario_id.clone());

        input.payment_mode = match scenario.payment_mode {
            Some(mode) => mode,
            None => meta
                .get("payment_mode")
                .and_then(loose::text)
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        };
        input.rate_table_version = meta.get("rate_table_version").and_then(loose::text);

        let person_age = person
            .and_then(|p| p.date_of_birth)
            .and_then(|dob| clock.age_on_today(dob));
        input.age = person_age.or_else(|| metadata_age(meta, clock));

        input.sex = person
            .and_then(|p| p.sex)
            .or_else(|| meta.get("sex").and_then(loose::text).and_then(|s| s.parse().ok()));
        input.state = person
            .and_then(|p| p.state.clone())
            .or_else(|| meta.get("state").and_then(loose::text))
            .map(|s| normalize_state(&s));
        input.tobacco = person
            .and_then(|p| p.tobacco)
            .or_else(|| meta.get("tobacco").and_then(loose::flag))
            .unwrap_or(false);
        input.occupation_class = person
            .and_then(|p| p.occupation_class.clone())
            .or_else(|| meta.get("occupation_class").and_then(loose::text));
        input.annual_income = person
            .and_then(|p| p.annual_income)
            .or_else(|| meta.get("annual_income").and_then(loose::number));
        input.height_inches = person
            .and_then(|p| p.height_inches)
            .or_else(|| meta.get("height_inches").and_then(loose::number));
        input.weight_pounds = person
            .and_then(|p| p.weight_pounds)
            .or_else(|| meta.get("weight_pounds").and_then(loose::number));

        if let Some(terms) = scenario.coverage_terms() {
            input.coverage = terms.clone();
        }

        input.risk_factors = scenario.risk_factors.clone();
        input.insured_objects = scenario.insured_objects.clone();
        input.coverages = scenario.coverages.clone();
        input.metadata = meta.clone();

        Ok(input)
    }

    /// Merge overrides in key order. Known field names land on the field,
    /// anything else lands in `metadata`.
    pub fn apply_overrides(&mut self, overrides: &Overrides) -> RatingResult<()> {
        for (key, value) in overrides {
            self.apply_override(key, value)?;
        }
        Ok(())
    }

    pub fn apply_override(&mut self, key: &str, value: &Value) -> RatingResult<()> {
        match key {
            "payment_mode" => {
                let raw = loose::require(key, value, loose::text)?;
                self.payment_mode = raw.parse().map_err(|e: String| RatingError::invalid(key, e))?;
            }
            "rate_table_version" => self.rate_table_version = loose::optional(key, value, loose::text)?,
            "age"                => self.age = loose::optional(key, value, loose::whole)?,
            "sex" => {
                self.sex = match loose::optional(key, value, loose::text)? {
                    Some(s) => Some(s.parse().map_err(|e: String| RatingError::invalid(key, e))?),
                    None => None,
                };
            }
            "state" => {
                self.state = loose::optional(key, value, loose::text)?.map(|s| normalize_state(&s));
            }
            "tobacco"          => self.tobacco = loose::require(key, value, loose::flag)?,
            "occupation_class" => self.occupation_class = loose::optional(key, value, loose::text)?,
            "annual_income"    => self.annual_income = loose::optional(key, value, loose::number)?,
            "height_inches"    => self.height_inches = loose::optional(key, value, loose::number)?,
            "weight_pounds"    => self.weight_pounds = loose::optional(key, value, loose::number)?,
            "factor_selections" => {
                for (code, option) in loose::object(key, value)? {
                    let option = loose::require(code, option, loose::text)?;
                    self.factor_selections.insert(code.clone(), option);
                }
            }
            "rider_selections" => {
                for (code, flag) in loose::object(key, value)? {
                    let flag = loose::require(code, flag, loose::flag)?;
                    self.rider_selections.insert(code.clone(), flag);
                }
            }
            _ => {
                if !self.coverage.apply_override(key, value)? {
                    self.metadata.insert(key.to_string(), value.clone());
                }
            }
        }
        Ok(())
    }

    /// The benefit amount the applicant asked for, in whatever unit the
    /// product family uses. Resolved through the same terms lookups the
    /// plugins price from, so a metadata-only benefit is still found.
    pub fn requested_benefit(&self) -> Option<f64> {
        self.coverage
            .requested_benefit()
            .or_else(|| self.disability_terms().monthly_benefit_requested)
            .or_else(|| self.long_term_care_terms().daily_benefit)
            .or_else(|| self.metadata.get("requested_benefit").and_then(loose::number))
    }

    /// DI terms from the coverage variant, else from metadata.
    pub fn disability_terms(&self) -> DisabilityTerms {
        match &self.coverage {
            CoverageTerms::DisabilityIncome(terms) => terms.clone(),
            _ => DisabilityTerms::from_metadata(&self.metadata),
        }
    }

    /// LTC terms from the coverage variant, else from metadata.
    pub fn long_term_care_terms(&self) -> LongTermCareTerms {
        match &self.coverage {
            CoverageTerms::LongTermCare(terms) => terms.clone(),
            _ => LongTermCareTerms::from_metadata(&self.metadata),
        }
    }
}

fn metadata_age(meta: &Map<String, Value>, clock: &RatingClock) -> Option<u32> {
    if let Some(age) = meta.get("age").and_then(loose::whole) {
        return Some(age);
    }
    meta.get("date_of_birth")
        .and_then(loose::text)
        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
        .and_then(|dob| clock.age_on_today(dob))
}

fn normalize_state(state: &str) -> String {
    state.trim().to_ascii_uppercase()
}

// ── Product-family extension ────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum CoverageTerms {
    #[default]
    Unspecified,
    DisabilityIncome(DisabilityTerms),
    LongTermCare(LongTermCareTerms),
}

impl CoverageTerms {
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Self::Unspecified)
    }

    pub fn requested_benefit(&self) -> Option<f64> {
        match self {
            Self::Unspecified         => None,
            Self::DisabilityIncome(t) => t.monthly_benefit_requested,
            Self::LongTermCare(t)     => t.daily_benefit,
        }
    }

    /// Returns true when the key named a field of the active variant.
    pub fn apply_override(&mut self, key: &str, value: &Value) -> RatingResult<bool> {
        match self {
            Self::Unspecified         => Ok(false),
            Self::DisabilityIncome(t) => t.apply_override(key, value),
            Self::LongTermCare(t)     => t.apply_override(key, value),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DisabilityTerms {
    #[serde(default)]
    pub monthly_benefit_requested: Option<f64>,
    #[serde(default)]
    pub elimination_period_days: Option<u32>,
    #[serde(default)]
    pub benefit_period: Option<String>,
    #[serde(default)]
    pub uw_class: Option<String>,
}

impl DisabilityTerms {
    /// Read the same field names out of a loose metadata bag.
    pub fn from_metadata(meta: &Map<String, Value>) -> Self {
        Self {
            monthly_benefit_requested: meta.get("monthly_benefit_requested").and_then(loose::number),
            elimination_period_days:   meta.get("elimination_period_days").and_then(loose::whole),
            benefit_period:            meta.get("benefit_period").and_then(loose::text),
            uw_class:                  meta.get("uw_class").and_then(loose::text),
        }
    }

    fn apply_override(&mut self, key: &str, value: &Value) -> RatingResult<bool> {
        match key {
            "monthly_benefit_requested" => self.monthly_benefit_requested = loose::optional(key, value, loose::number)?,
            "elimination_period_days"   => self.elimination_period_days = loose::optional(key, value, loose::whole)?,
            "benefit_period"            => self.benefit_period = loose::optional(key, value, loose::text)?,
            "uw_class"                  => self.uw_class = loose::optional(key, value, loose::text)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LongTermCareTerms {
    #[serde(default)]
    pub daily_benefit: Option<f64>,
    #[serde(default)]
    pub benefit_period_years: Option<u32>,
    #[serde(default)]
    pub elimination_period_days: Option<u32>,
    #[serde(default)]
    pub inflation_protection: Option<String>,
    #[serde(default)]
    pub uw_class: Option<String>,
}

impl LongTermCareTerms {
    pub fn from_metadata(meta: &Map<String, Value>) -> Self {
        Self {
            daily_benefit:           meta.get("daily_benefit").and_then(loose::number),
            benefit_period_years:    meta.get("benefit_period_years").and_then(loose::whole),
            elimination_period_days: meta.get("elimination_period_days").and_then(loose::whole),
            inflation_protection:    meta.get("inflation_protection").and_then(loose::text),
            uw_class:                meta.get("uw_class").and_then(loose::text),
        }
    }

    fn apply_override(&mut self, key: &str, value: &Value) -> RatingResult<bool> {
        match key {
            "daily_benefit"           => self.daily_benefit = loose::optional(key, value, loose::number)?,
            "benefit_period_years"    => self.benefit_period_years = loose::optional(key, value, loose::whole)?,
            "elimination_period_days" => self.elimination_period_days = loose::optional(key, value, loose::whole)?,
            "inflation_protection"    => self.inflation_protection = loose::optional(key, value, loose::text)?,
            "uw_class"                => self.uw_class = loose::optional(key, value, loose::text)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Lenient JSON value coercion. Scenario metadata arrives from forms and
/// imports, so "35", 35 and 35.0 all mean the same age.
pub(crate) mod loose {
    use crate::error::{RatingError, RatingResult};
    use serde_json::{Map, Value};

    pub fn number(v: &Value) -> Option<f64> {
        match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn whole(v: &Value) -> Option<u32> {
        let n = number(v)?;
        if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
            return None;
        }
        Some(n as u32)
    }

    pub fn flag(v: &Value) -> Option<bool> {
        match v {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" | "true" | "1"  => Some(true),
                "n" | "no" | "false" | "0"  => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn text(v: &Value) -> Option<String> {
        match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Null clears the field; anything else must coerce.
    pub fn optional<T>(
        field: &str,
        v: &Value,
        coerce: fn(&Value) -> Option<T>,
    ) -> RatingResult<Option<T>> {
        if v.is_null() {
            return Ok(None);
        }
        require(field, v, coerce).map(Some)
    }

    pub fn require<T>(field: &str, v: &Value, coerce: fn(&Value) -> Option<T>) -> RatingResult<T> {
        coerce(v).ok_or_else(|| RatingError::invalid(field, format!("cannot interpret {v}")))
    }

    pub fn object<'a>(field: &str, v: &'a Value) -> RatingResult<&'a Map<String, Value>> {
        v.as_object()
            .ok_or_else(|| RatingError::invalid(field, "expected an object"))
    }
}
