//! Calendar-month selection over dated records

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::str::FromStr;
use thiserror::Error;

use crate::records::{Dated, Expense, Sale};

/// Sentinel selecting every record
pub const ALL_TIME: &str = "all";

/// A `YYYY-MM` month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid month '{0}' (expected YYYY-MM)")]
pub struct ParseMonthError(pub String);

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        ((0..=9999).contains(&year) && (1..=12).contains(&month)).then_some(Self { year, month })
    }

    /// Month a date falls in
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMonthError(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(err)?;
        if year.len() != 4
            || month.len() != 2
            || !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Self::new(year, month).ok_or_else(err)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which records a report covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MonthSelector {
    #[default]
    All,
    Month(MonthKey),
    /// Anything that is neither `all` nor `YYYY-MM`; matches nothing
    Unmatched(String),
}

impl MonthSelector {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case(ALL_TIME) {
            return MonthSelector::All;
        }
        match s.parse::<MonthKey>() {
            Ok(key) => MonthSelector::Month(key),
            Err(_) => MonthSelector::Unmatched(s.to_string()),
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            MonthSelector::All => true,
            MonthSelector::Month(key) => key.contains(date),
            MonthSelector::Unmatched(_) => false,
        }
    }
}

impl FromStr for MonthSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl std::fmt::Display for MonthSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonthSelector::All => write!(f, "{}", ALL_TIME),
            MonthSelector::Month(key) => write!(f, "{}", key),
            MonthSelector::Unmatched(raw) => write!(f, "{}", raw),
        }
    }
}

/// Records in the selected month, in their original order
pub fn filter_by_month<'a, T: Dated>(records: &'a [T], selector: &MonthSelector) -> Vec<&'a T> {
    records.iter().filter(|r| selector.matches(r.date())).collect()
}

/// Every month that has at least one sale or expense, ascending
pub fn months_present(sales: &[Sale], expenses: &[Expense]) -> Vec<MonthKey> {
    let months: BTreeSet<MonthKey> = sales
        .iter()
        .map(|s| MonthKey::of(s.date))
        .chain(expenses.iter().map(|e| MonthKey::of(e.date)))
        .collect();
    months.into_iter().collect()
}
