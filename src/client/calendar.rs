//! Week grid arithmetic.
//!
//! A year has exactly 52 slots. The week of a date is the number of whole
//! weeks since January 1st, capped at 51, so the last days of December share
//! slot 51 instead of spilling into a 53rd week. This is not ISO-8601 week
//! numbering and existing week keys depend on it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use super::error::ClientError;

pub const WEEKS_PER_YEAR: u32 = 52;

pub fn week_of_year(date: Date) -> u32 {
    let days_since_jan1 = u32::from(date.ordinal()) - 1;
    (days_since_jan1 / 7).min(WEEKS_PER_YEAR - 1)
}

/// Position of `today` in a grid that starts at week 0 of `birth_year`.
pub fn current_week_index(birth_year: i32, today: Date) -> i64 {
    i64::from(today.year() - birth_year) * i64::from(WEEKS_PER_YEAR)
        + i64::from(week_of_year(today))
}

pub fn week_key_from_index(birth_year: i32, index: i64) -> WeekKey {
    let per_year = i64::from(WEEKS_PER_YEAR);
    WeekKey {
        year: birth_year + index.div_euclid(per_year) as i32,
        week: index.rem_euclid(per_year) as u32,
    }
}

/// Journal slot identifier, printed as `"<year>-<week>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn new(year: i32, week: u32) -> Result<Self, ClientError> {
        if week >= WEEKS_PER_YEAR {
            return Err(ClientError::Validation(format!(
                "week {week} outside 0..{WEEKS_PER_YEAR}"
            )));
        }
        Ok(Self { year, week })
    }

    pub fn for_date(date: Date) -> Self {
        Self {
            year: date.year(),
            week: week_of_year(date),
        }
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClientError::Validation(format!("invalid week key {s:?}"));
        let (year, week) = s.rsplit_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let week = week.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, week)
    }
}

impl TryFrom<String> for WeekKey {
    type Error = ClientError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<WeekKey> for String {
    fn from(key: WeekKey) -> Self {
        key.to_string()
    }
}
