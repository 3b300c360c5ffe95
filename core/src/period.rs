//! File period resolution: which month/year a row is accounted to.
//!
//! Archives are published one file per month, so the default resolver reads
//! the date from the first row of a file and applies it to every row after.
//! The per-row resolver trades that single parse for one parse per row.

use crate::types::Period;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Archive date format, e.g. `8/1/2023`.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

pub fn parse_period(field: &str) -> Option<Period> {
    let date = NaiveDate::parse_from_str(field.trim(), DATE_FORMAT).ok()?;
    Some(Period::new(date.month(), date.year()))
}

/// Decides the period of each row of one file. A fresh resolver is built for
/// every file.
pub trait PeriodResolver {
    /// Called for every row that passed the shape check, in file order.
    fn resolve(&mut self, date_field: &str) -> Option<Period>;
}

/// Captures the period once, from the first row offered, and never re-reads it.
/// If that single capture fails the whole file resolves to `None`.
#[derive(Debug, Default)]
pub struct FirstRowPeriod {
    captured: Option<Option<Period>>,
}

impl PeriodResolver for FirstRowPeriod {
    fn resolve(&mut self, date_field: &str) -> Option<Period> {
        *self.captured.get_or_insert_with(|| parse_period(date_field))
    }
}

/// Parses every row's own date.
#[derive(Debug, Default)]
pub struct PerRowPeriod;

impl PeriodResolver for PerRowPeriod {
    fn resolve(&mut self, date_field: &str) -> Option<Period> {
        parse_period(date_field)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodMode {
    #[default]
    FirstRow,
    PerRow,
}

impl PeriodMode {
    pub fn resolver(self) -> Box<dyn PeriodResolver> {
        match self {
            PeriodMode::FirstRow => Box::new(FirstRowPeriod::default()),
            PeriodMode::PerRow => Box::new(PerRowPeriod),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unpadded_month_and_day() {
        assert_eq!(parse_period("8/1/2023"), Some(Period::new(8, 2023)));
        assert_eq!(parse_period("12/31/2019"), Some(Period::new(12, 2019)));
        assert_eq!(parse_period("ignored"), None);
        assert_eq!(parse_period("13/1/2020"), None);
    }

    #[test]
    fn first_row_period_sticks_for_the_whole_file() {
        let mut resolver = FirstRowPeriod::default();
        assert_eq!(resolver.resolve("8/1/2023"), Some(Period::new(8, 2023)));
        assert_eq!(resolver.resolve("ignored"), Some(Period::new(8, 2023)));
        assert_eq!(resolver.resolve("1/1/2024"), Some(Period::new(8, 2023)));
    }

    #[test]
    fn failed_first_capture_is_never_retried() {
        let mut resolver = FirstRowPeriod::default();
        assert_eq!(resolver.resolve("garbage"), None);
        assert_eq!(resolver.resolve("8/1/2023"), None);
    }

    #[test]
    fn per_row_period_follows_each_row() {
        let mut resolver = PeriodMode::PerRow.resolver();
        assert_eq!(resolver.resolve("8/1/2023"), Some(Period::new(8, 2023)));
        assert_eq!(resolver.resolve("9/1/2023"), Some(Period::new(9, 2023)));
        assert_eq!(resolver.resolve("bad"), None);
    }
}
