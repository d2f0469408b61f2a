//! Evaluation periods
//!
//! Values are computed per day. Timeless attributes (birth date, school
//! operator) are declared with `PeriodUnit::Eternity` and share one value
//! across every requested day.

use crate::error::{EngineError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key used for timeless values in situation files
pub const ETERNITY_KEY: &str = "ETERNITY";

/// When a value is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    Day(NaiveDate),
    Eternity,
}

/// Granularity a variable is defined over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PeriodUnit {
    #[default]
    Day,
    Eternity,
}

impl Period {
    pub fn day(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Period::Day)
            .ok_or_else(|| EngineError::InvalidPeriod(format!("{year}-{month}-{day}")))
    }

    /// First instant of the period, `None` for eternity
    pub fn start(&self) -> Option<NaiveDate> {
        match self {
            Period::Day(date) => Some(*date),
            Period::Eternity => None,
        }
    }

    /// Map a requested period onto a variable's definition unit
    pub fn normalize(self, unit: PeriodUnit) -> Self {
        match unit {
            PeriodUnit::Day => self,
            PeriodUnit::Eternity => Period::Eternity,
        }
    }

    /// Shift a day period, used by formulas that look at earlier dates
    pub fn offset_days(self, days: i64) -> Result<Self> {
        match self {
            Period::Day(date) => chrono::Duration::try_days(days)
                .and_then(|delta| date.checked_add_signed(delta))
                .map(Period::Day)
                .ok_or_else(|| EngineError::InvalidPeriod(format!("{date} shifted by {days} days"))),
            Period::Eternity => Ok(Period::Eternity),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Period::Eternity => write!(f, "{ETERNITY_KEY}"),
        }
    }
}

impl FromStr for Period {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(ETERNITY_KEY) {
            return Ok(Period::Eternity);
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Period::Day)
            .map_err(|_| EngineError::InvalidPeriod(s.to_string()))
    }
}
