//! Rating clock: the single source of "now" for the engine.
//!
//! Ages are computed from dates of birth as of `today()`, and every
//! RatingRun is stamped with `now()`. Tests pin the date so that
//! age-dependent rate keys never drift.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatingClock {
    #[default]
    System,
    Fixed(NaiveDate),
}

impl RatingClock {
    pub fn fixed(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::Fixed)
    }

    pub fn today(&self) -> NaiveDate {
        match self {
            Self::System      => Utc::now().date_naive(),
            Self::Fixed(date) => *date,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System => Utc::now(),
            Self::Fixed(date) => date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc())
                .unwrap_or_else(Utc::now),
        }
    }

    /// Whole years between `date_of_birth` and today.
    /// Returns None for a birth date in the future.
    pub fn age_on_today(&self, date_of_birth: NaiveDate) -> Option<u32> {
        let today = self.today();
        if date_of_birth > today {
            return None;
        }
        let mut years = today.year() - date_of_birth.year();
        if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}
