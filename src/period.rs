//! Period tokens and the date windows they resolve to.
//!
//! A period token (`7d`, `30d`, `90d`, `1y`) selects a window that starts a
//! fixed number of days before today. Unknown or missing tokens resolve to
//! `30d` without an error.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

/// Token used when a request carries no period at all.
pub const DEFAULT_PERIOD: &str = "30d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
    Quarter,
    Year,
}

impl Period {
    /// Parse a token, falling back to `30d` for anything unrecognised.
    pub fn from_token(token: &str) -> Self {
        match token {
            "7d" => Period::Week,
            "30d" => Period::Month,
            "90d" => Period::Quarter,
            "1y" => Period::Year,
            _ => Period::Month,
        }
    }

    /// Canonical token for this period. Always one of the four known tokens.
    pub fn token(self) -> &'static str {
        match self {
            Period::Week => "7d",
            Period::Month => "30d",
            Period::Quarter => "90d",
            Period::Year => "1y",
        }
    }

    pub fn days(self) -> i64 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Quarter => 90,
            Period::Year => 365,
        }
    }
}

/// A `[start, end]` window of calendar days (UTC). `end` is always today.
///
/// Store queries only apply the lower bound (`created_at >= start`), so data
/// written after `end` but before the query runs is still counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Midnight UTC of the first day in the window.
    pub fn start_at(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }
}

/// Resolve a period token against the current UTC date.
pub fn resolve(token: &str) -> DateRange {
    resolve_on(token, Utc::now().date_naive())
}

/// Resolve a period token against an explicit `today`.
pub fn resolve_on(token: &str, today: NaiveDate) -> DateRange {
    let period = Period::from_token(token);
    DateRange {
        start: today - Duration::days(period.days()),
        end: today,
    }
}
