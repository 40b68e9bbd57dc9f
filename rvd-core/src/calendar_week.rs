//! ISO 8601 calendar weeks ("Kalenderwochen").
//!
//! Both directions of the week arithmetic live here: a week label resolves to
//! the Monday of that ISO week, and any date maps back to the ISO week that
//! contains it. Week 1 is the week containing January 4th (equivalently the
//! year's first Thursday); weeks run Monday to Sunday.

use crate::error::RvdError;
use chrono::{Datelike, NaiveDate, TimeDelta};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::LazyLock};

/// `19. KW 2023`, whitespace around `KW` optional.
static KW_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2})\.\s*KW\s*(\d{4})\s*$").expect("static week label pattern")
});

/// `KW08/2025`, as used by the sentinel datasets.
static SENTINEL_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*KW(\d{1,2})/(\d{4})\s*$").expect("static sentinel label pattern")
});

/// A validated ISO week: `week` is within `1..=weeks_in_year(year)`.
///
/// Ordering is chronological. Serialized as its display label (`"19. KW 2023"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CalendarWeek {
    year: i32,
    week: u32,
    monday: NaiveDate,
}

/// Number of ISO weeks (52 or 53) in `year`.
///
/// December 28th always falls into the last ISO week of its year.
pub fn weeks_in_year(year: i32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, 12, 28).map(|d| d.iso_week().week())
}

/// Monday of ISO week 1: January 4th minus its weekday offset
/// (1 = Monday .. 7 = Sunday).
fn week_one_monday(year: i32) -> Option<NaiveDate> {
    let jan4 = NaiveDate::from_ymd_opt(year, 1, 4)?;
    let weekday = jan4.weekday().number_from_monday();
    jan4.checked_sub_signed(TimeDelta::days(i64::from(weekday - 1)))
}

impl CalendarWeek {
    /// Build a week, rejecting week numbers the ISO year does not have.
    pub fn new(week: u32, year: i32) -> Option<Self> {
        if week == 0 || week > weeks_in_year(year)? {
            return None;
        }
        let monday =
            week_one_monday(year)?.checked_add_signed(TimeDelta::weeks(i64::from(week - 1)))?;
        Some(Self { year, week, monday })
    }

    /// The ISO week containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        let offset = i64::from(date.weekday().num_days_from_monday());
        Self {
            year: iso.year(),
            week: iso.week(),
            monday: date - TimeDelta::days(offset),
        }
    }

    /// Parse a `19. KW 2023` label.
    pub fn parse_kw(label: &str) -> Option<Self> {
        Self::parse_with(&KW_LABEL, label)
    }

    /// Parse a sentinel `KW08/2025` label.
    pub fn parse_sentinel_label(label: &str) -> Option<Self> {
        Self::parse_with(&SENTINEL_LABEL, label)
    }

    fn parse_with(pattern: &Regex, label: &str) -> Option<Self> {
        let caps = pattern.captures(label)?;
        let week = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let year = caps.get(2)?.as_str().parse::<i32>().ok()?;
        Self::new(week, year)
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    /// ISO week-numbering year, which differs from the calendar year of
    /// `monday()` for some weeks around New Year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Monday of this week.
    pub fn monday(&self) -> NaiveDate {
        self.monday
    }

    /// Sunday of this week.
    pub fn sunday(&self) -> NaiveDate {
        self.monday + TimeDelta::days(6)
    }

    pub fn next(&self) -> Self {
        self.offset(1)
    }

    /// The week `weeks` weeks later (earlier when negative).
    pub fn offset(&self, weeks: i64) -> Self {
        Self::from_date(self.monday + TimeDelta::weeks(weeks))
    }

    /// Label in the sentinel style, `KW08/2025`.
    pub fn sentinel_label(&self) -> String {
        format!("KW{:02}/{}", self.week, self.year)
    }
}

impl fmt::Display for CalendarWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. KW {}", self.week, self.year)
    }
}

impl FromStr for CalendarWeek {
    type Err = RvdError;

    /// Accepts either label style.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_kw(s)
            .or_else(|| Self::parse_sentinel_label(s))
            .ok_or_else(|| RvdError::InvalidWeekLabel(s.to_string()))
    }
}

impl TryFrom<String> for CalendarWeek {
    type Error = RvdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CalendarWeek> for String {
    fn from(value: CalendarWeek) -> Self {
        value.to_string()
    }
}

impl From<NaiveDate> for CalendarWeek {
    fn from(value: NaiveDate) -> Self {
        CalendarWeek::from_date(value)
    }
}
