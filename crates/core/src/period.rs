use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::category::LedgerError;

/// A calendar month, the unit history is browsed and totalled by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Month { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current() -> Self {
        Month::containing(Local::now().date_naive())
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("validated in Month::new")
    }

    /// Last calendar day of the month (inclusive end, like `DateRange`).
    pub fn last_day(self) -> NaiveDate {
        // Day 28 exists in every month chrono can represent.
        [31, 30, 29, 28]
            .into_iter()
            .find_map(|d| NaiveDate::from_ymd_opt(self.year, self.month, d))
            .expect("every month has a 28th")
    }

    pub fn range(self) -> DateRange {
        DateRange::new(self.first_day(), self.last_day())
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        self.range().contains(date)
    }

    /// `None` past the earliest representable month.
    pub fn previous(self) -> Option<Self> {
        if self.month == 1 {
            Month::new(self.year.checked_sub(1)?, 12)
        } else {
            Month::new(self.year, self.month - 1)
        }
    }

    /// `None` past the latest representable month.
    pub fn next(self) -> Option<Self> {
        if self.month == 12 {
            Month::new(self.year.checked_add(1)?, 1)
        } else {
            Month::new(self.year, self.month + 1)
        }
    }

    /// `10月1日〜10月31日`
    pub fn span_label(self) -> String {
        let last = self.last_day();
        format!("{}月1日〜{}月{}日", self.month, last.month(), last.day())
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}年{}月", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = LedgerError;

    /// Accepts `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidMonth(s.to_string());
        let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        Month::new(year, month).ok_or_else(invalid)
    }
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_rejects_invalid_month() {
        assert!(Month::new(2024, 0).is_none());
        assert!(Month::new(2024, 13).is_none());
        assert!(Month::new(2024, 12).is_some());
    }

    #[test]
    fn last_day_handles_leap_years_and_december() {
        assert_eq!(Month::new(2024, 2).unwrap().last_day(), date(2024, 2, 29));
        assert_eq!(Month::new(2023, 2).unwrap().last_day(), date(2023, 2, 28));
        assert_eq!(Month::new(2024, 12).unwrap().last_day(), date(2024, 12, 31));
    }

    #[test]
    fn contains_is_inclusive_of_both_ends() {
        let m = Month::new(2024, 3).unwrap();
        assert!(m.contains(date(2024, 3, 1)));
        assert!(m.contains(date(2024, 3, 31)));
        assert!(!m.contains(date(2024, 2, 29)));
        assert!(!m.contains(date(2024, 4, 1)));
    }

    #[test]
    fn previous_and_next_wrap_years() {
        let jan = Month::new(2025, 1).unwrap();
        assert_eq!(jan.previous(), Month::new(2024, 12));
        assert_eq!(jan.previous().and_then(Month::next), Some(jan));
    }

    #[test]
    fn latest_representable_month() {
        let m: Month = "262142-12".parse().unwrap();
        assert_eq!(m.last_day(), date(262142, 12, 31));
        assert!(m.contains(date(262142, 12, 31)));
        assert_eq!(m.span_label(), "12月1日〜12月31日");
        assert_eq!(m.next(), None);
        assert!("262143-01".parse::<Month>().is_err());
    }

    #[test]
    fn parse_and_display() {
        let m: Month = "2024-07".parse().unwrap();
        assert_eq!(m, Month::new(2024, 7).unwrap());
        assert_eq!(m.to_string(), "2024年7月");
        assert_eq!(m.span_label(), "7月1日〜7月31日");
        assert!("2024/07".parse::<Month>().is_err());
        assert!("2024-13".parse::<Month>().is_err());
    }

    #[test]
    fn date_range_display() {
        let range = Month::new(2024, 1).unwrap().range();
        assert_eq!(range.to_string(), "2024-01-01 to 2024-01-31");
    }
}
