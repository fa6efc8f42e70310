//! Scenario aggregate: the external quote request the engine reads.
//!
//! The engine only reads a Scenario. The two summary fields it may change
//! are written through `RatingStore::apply_rating_result`, never by
//! mutating this struct.

use crate::{
    input::CoverageTerms,
    types::{PaymentMode, ScenarioId, Sex},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub scenario_id:  ScenarioId,
    pub product_type: String,
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
    #[serde(default)]
    pub insured_objects: Vec<InsuredObject>,
    #[serde(default)]
    pub coverages: Vec<Coverage>,
    #[serde(default)]
    pub risk_factors: Vec<RiskFactor>,
    #[serde(default)]
    pub metadata_json: Map<String, Value>,
    #[serde(default)]
    pub best_quoted_premium: Option<f64>,
    #[serde(default)]
    pub total_quotes_received: u32,
}

impl Scenario {
    pub fn new(scenario_id: impl Into<ScenarioId>, product_type: impl Into<String>) -> Self {
        Self {
            scenario_id:           scenario_id.into(),
            product_type:          product_type.into(),
            payment_mode:          None,
            insured_objects:       Vec::new(),
            coverages:             Vec::new(),
            risk_factors:          Vec::new(),
            metadata_json:         Map::new(),
            best_quoted_premium:   None,
            total_quotes_received: 0,
        }
    }

    /// The insured person demographics are read from: the object flagged
    /// primary, else the first person object.
    pub fn primary_insured(&self) -> Option<&InsuredObject> {
        self.insured_objects
            .iter()
            .find(|o| o.is_person() && o.is_primary)
            .or_else(|| self.insured_objects.iter().find(|o| o.is_person()))
    }

    /// Coverage terms of the first coverage that carries any.
    pub fn coverage_terms(&self) -> Option<&CoverageTerms> {
        self.coverages
            .iter()
            .map(|c| &c.terms)
            .find(|t| !t.is_unspecified())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsuredObject {
    /// "person", "property", "business", ...
    pub object_type: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub tobacco: Option<bool>,
    #[serde(default)]
    pub occupation_class: Option<String>,
    #[serde(default)]
    pub annual_income: Option<f64>,
    #[serde(default)]
    pub height_inches: Option<f64>,
    #[serde(default)]
    pub weight_pounds: Option<f64>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl InsuredObject {
    pub fn person() -> Self {
        Self {
            object_type:      "person".into(),
            is_primary:       true,
            date_of_birth:    None,
            sex:              None,
            state:            None,
            tobacco:          None,
            occupation_class: None,
            annual_income:    None,
            height_inches:    None,
            weight_pounds:    None,
            attributes:       Map::new(),
        }
    }

    pub fn is_person(&self) -> bool {
        self.object_type.eq_ignore_ascii_case("person")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coverage {
    pub coverage_code: String,
    #[serde(default)]
    pub limit_amount: Option<f64>,
    #[serde(default)]
    pub deductible: Option<f64>,
    #[serde(default)]
    pub terms: CoverageTerms,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Coverage {
    pub fn with_terms(coverage_code: impl Into<String>, terms: CoverageTerms) -> Self {
        Self {
            coverage_code: coverage_code.into(),
            limit_amount:  None,
            deductible:    None,
            terms,
            attributes:    Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactor {
    pub code:  String,
    pub value: Value,
}

/// The two scenario fields owned by rating results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioSummary {
    pub scenario_id:           ScenarioId,
    pub best_quoted_premium:   Option<f64>,
    pub total_quotes_received: u32,
}
