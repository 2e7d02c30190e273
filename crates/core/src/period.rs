use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("billing cutoff day must be between 1 and 31, got {0}")]
    InvalidCutoffDay(u32),
    #[error("not a \"<Month> <Year>\" label: {0}")]
    BadMonthLabel(String),
}

/// A calendar month, e.g. "January 2024".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Month {
    year: i32,
    month: u32,
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Month { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn pred(self) -> Month {
        if self.month == 1 {
            Month { year: self.year - 1, month: 12 }
        } else {
            Month { year: self.year, month: self.month - 1 }
        }
    }

    fn succ(self) -> Month {
        if self.month == 12 {
            Month { year: self.year + 1, month: 1 }
        } else {
            Month { year: self.year, month: self.month + 1 }
        }
    }

    pub fn minus_months(self, n: u32) -> Month {
        let total = self.year as i64 * 12 + (self.month as i64 - 1) - n as i64;
        Month {
            year: total.div_euclid(12) as i32,
            month: (total.rem_euclid(12) + 1) as u32,
        }
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap()
    }

    pub fn last_day(self) -> NaiveDate {
        self.succ().first_day() - Duration::days(1)
    }

    pub fn day_count(self) -> u32 {
        self.last_day().day()
    }

    /// The given day of this month, clamped to the month's length
    /// (day 31 in February becomes the 28th or 29th).
    pub fn clamp_day(self, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, day.min(self.day_count())).unwrap()
    }

    /// "January 2024" style label, as used in monthly export filenames.
    pub fn label(self) -> String {
        self.first_day().format("%B %Y").to_string()
    }

    pub fn parse_label(s: &str) -> Result<Month, PeriodError> {
        NaiveDate::parse_from_str(&format!("1 {}", s.trim()), "%d %B %Y")
            .map(Month::containing)
            .map_err(|_| PeriodError::BadMonthLabel(s.to_string()))
    }

    pub fn range(self) -> DateRange {
        DateRange::new(self.first_day(), self.last_day())
    }
}

/// The n months preceding the reference date's month, most recent first.
/// The reference month itself is not included.
pub fn months_before(reference: NaiveDate, n: usize) -> Vec<Month> {
    let mut month = Month::containing(reference);
    (0..n)
        .map(|_| {
            month = month.pred();
            month
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn day_count(self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// A billing schedule cutting over on a fixed day of the month.
///
/// The cycle ending in month M runs from the day after the (clamped) cutoff
/// of M-1 through the (clamped) cutoff of M, inclusive on both ends, so
/// consecutive cycles tile the calendar with no gap or overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSchedule {
    cutoff_day: u32,
}

impl CycleSchedule {
    pub fn new(cutoff_day: u32) -> Result<Self, PeriodError> {
        if (1..=31).contains(&cutoff_day) {
            Ok(CycleSchedule { cutoff_day })
        } else {
            Err(PeriodError::InvalidCutoffDay(cutoff_day))
        }
    }

    pub fn cutoff_day(self) -> u32 {
        self.cutoff_day
    }

    pub fn cycle_ending_in(self, month: Month) -> DateRange {
        let end = month.clamp_day(self.cutoff_day);
        let start = month.pred().clamp_day(self.cutoff_day) + Duration::days(1);
        DateRange::new(start, end)
    }

    /// The n cycles ending in the reference date's month and the months
    /// before it, most recent first.
    pub fn last_cycles(self, n: usize, reference: NaiveDate) -> Vec<DateRange> {
        let anchor = Month::containing(reference);
        (0..n)
            .map(|i| self.cycle_ending_in(anchor.minus_months(i as u32)))
            .collect()
    }

    /// The overall [earliest start, latest end] window spanning the last n
    /// cycles. None when n is zero.
    pub fn window(self, n: usize, reference: NaiveDate) -> Option<DateRange> {
        let cycles = self.last_cycles(n, reference);
        let start = cycles.iter().map(|c| c.start).min()?;
        let end = cycles.iter().map(|c| c.end).max()?;
        Some(DateRange::new(start, end))
    }
}
