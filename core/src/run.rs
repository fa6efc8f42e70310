//! RatingRun: the append-only audit record of one rating attempt.
//!
//! Exactly one RatingRun is written per `rate_scenario()` call, however
//! the attempt ends. Rows are never updated or deleted.

use crate::{
    output::RateOutput,
    types::{RunId, ScenarioId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Ineligible,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed  => "completed",
            Self::Ineligible => "ineligible",
            Self::Error      => "error",
        }
    }

    /// Status of a run whose plugin returned normally.
    pub fn for_output(output: &RateOutput) -> Self {
        if output.eligible {
            Self::Completed
        } else {
            Self::Ineligible
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed"  => Ok(Self::Completed),
            "ineligible" => Ok(Self::Ineligible),
            "error"      => Ok(Self::Error),
            other => Err(format!("unknown run status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingRun {
    /// Database row id; None until appended.
    pub id:                    Option<i64>,
    pub run_id:                RunId,
    pub scenario_id:           ScenarioId,
    pub user_id:               Option<UserId>,
    pub product_type:          String,
    pub rate_table_version:    Option<String>,
    pub engine_version:        String,
    pub input_hash:            Option<String>,
    /// Serialized RateInput. None only when building the input failed.
    pub input_snapshot:        Option<String>,
    /// Serialized (rounded) RateOutput.
    pub output_snapshot:       String,
    pub final_premium_annual:  Option<f64>,
    pub final_premium_monthly: Option<f64>,
    pub status:                RunStatus,
    pub error_message:         Option<String>,
    pub duration_ms:           u64,
    pub created_at:            DateTime<Utc>,
}

impl RatingRun {
    /// Monthly-equivalent premium when this run produced a usable quote.
    pub fn quoted_monthly(&self) -> Option<f64> {
        match self.status {
            RunStatus::Completed => self.final_premium_monthly.filter(|p| *p > 0.0),
            _ => None,
        }
    }
}
