//! Shared primitive types used across the rating engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of the scenario aggregate being rated.
pub type ScenarioId = String;

/// Identifier of the user who triggered a rating. None for system runs.
pub type UserId = String;

/// Unique identifier of one RatingRun ledger row.
pub type RunId = String;

/// Billing frequency the premium is quoted in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    #[default]
    Annual,
    Semiannual,
    Quarterly,
    Monthly,
}

impl PaymentMode {
    pub const ALL: [PaymentMode; 4] = [
        PaymentMode::Annual,
        PaymentMode::Semiannual,
        PaymentMode::Quarterly,
        PaymentMode::Monthly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Annual     => "annual",
            Self::Semiannual => "semiannual",
            Self::Quarterly  => "quarterly",
            Self::Monthly    => "monthly",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annual" | "annually" | "yearly"       => Ok(Self::Annual),
            "semiannual" | "semi_annual" | "semi-annual" => Ok(Self::Semiannual),
            "quarterly"                            => Ok(Self::Quarterly),
            "monthly"                              => Ok(Self::Monthly),
            other => Err(format!("unknown payment mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male   => "male",
            Self::Female => "female",
        }
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "male"   => Ok(Self::Male),
            "f" | "female" => Ok(Self::Female),
            other => Err(format!("unknown sex '{other}'")),
        }
    }
}
