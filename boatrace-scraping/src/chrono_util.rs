use std::{fmt, str::FromStr};

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};

pub fn jst_now() -> NaiveDateTime {
    Utc::now()
        .with_timezone(&FixedOffset::east_opt(9 * 60 * 60).unwrap())
        .naive_local()
}

/// One civil day in JST, rendered as `YYYYMMDD` — the `hd` parameter of
/// boatrace.jp URLs and the date key of the snapshot document.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn today_jst() -> Self {
        Self(jst_now().date())
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

impl FromStr for DateKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y%m%d").map(Self)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
