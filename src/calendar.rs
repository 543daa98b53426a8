//! Date windows and Ramadan day numbering.
//!
//! The Ramadan window is configured, never computed: there is no lunar
//! calendar arithmetic here.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{AppError, AppResult};

pub const MONTH_NAMES: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Closed interval of calendar dates, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(AppError::validation(format!(
                "range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// First through last day of `month` (1-12) in `year`.
    pub fn month(year: i32, month: u32) -> AppResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::validation(format!("invalid month {month}/{year}")))?;
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| AppError::validation(format!("invalid month {month}/{year}")))?;
        Ok(Self { start, end })
    }

    pub fn year(year: i32) -> AppResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1);
        let end = NaiveDate::from_ymd_opt(year, 12, 31);
        match (start, end) {
            (Some(start), Some(end)) => Ok(Self { start, end }),
            _ => Err(AppError::validation(format!("invalid year {year}"))),
        }
    }
}

pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

/// Day number of `date` counted from `ramadan_start` (day 1).
///
/// Only the lower bound is checked; dates after the end of Ramadan keep
/// counting up. Use [`RamadanWindow::day_of`] for the bounded variant.
pub fn ramadan_day_of(date: NaiveDate, ramadan_start: NaiveDate) -> Option<u32> {
    if date < ramadan_start {
        return None;
    }
    let days = (date - ramadan_start).num_days();
    u32::try_from(days + 1).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RamadanWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub hijri_year: u32,
}

impl RamadanWindow {
    pub fn new(start: NaiveDate, end: NaiveDate, hijri_year: u32) -> AppResult<Self> {
        DateRange::new(start, end)?;
        Ok(Self {
            start,
            end,
            hijri_year,
        })
    }

    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.range().contains(date)
    }

    /// Bounded day number: `None` outside `[start, end]`.
    pub fn day_of(&self, date: NaiveDate) -> Option<u32> {
        if date > self.end {
            return None;
        }
        ramadan_day_of(date, self.start)
    }

    /// Unbounded day number, see [`ramadan_day_of`].
    pub fn day_since_start(&self, date: NaiveDate) -> Option<u32> {
        ramadan_day_of(date, self.start)
    }

    /// Number of days in the window, both ends included.
    pub fn days(&self) -> u32 {
        (self.end - self.start).num_days() as u32 + 1
    }

    pub fn label(&self) -> String {
        format!(
            "{} {} - {} {} {}",
            self.start.day(),
            month_name(self.start.month()).unwrap_or_default(),
            self.end.day(),
            month_name(self.end.month()).unwrap_or_default(),
            self.end.year()
        )
    }
}

impl Default for RamadanWindow {
    /// Ramadan 1447 H.
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2026, 2, 19).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap_or_default(),
            hijri_year: 1447,
        }
    }
}
