//! Calendar periods and date windows (UTC).

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use glowdesk_core::ValueObject;

/// Aggregation period for targets (commission tiers, dashboards).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
        }
    }

    /// The calendar window of this period that contains `at`.
    ///
    /// Weeks start on Monday. Summing sales over this window gives the
    /// period-to-date total, since sales are never recorded in the future.
    pub fn window_containing(&self, at: DateTime<Utc>) -> DateWindow {
        let day = at.date_naive();
        let (start, end) = match self {
            Period::Daily => (day, add_days(day, 1)),
            Period::Weekly => {
                let back = Days::new(u64::from(day.weekday().num_days_from_monday()));
                let start = day.checked_sub_days(back).unwrap_or(NaiveDate::MIN);
                (start, add_days(start, 7))
            }
            Period::Monthly => {
                let start = day.with_day(1).unwrap_or(day);
                (start, add_months(start, 1))
            }
            Period::Yearly => {
                let start = day.with_ordinal(1).unwrap_or(day);
                (start, add_months(start, 12))
            }
        };

        DateWindow {
            start: midnight(start),
            end: midnight(end),
        }
    }
}

impl core::str::FromStr for Period {
    type Err = glowdesk_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "yearly" => Ok(Period::Yearly),
            other => Err(glowdesk_core::DomainError::validation(format!(
                "unknown period '{other}' (expected daily, weekly, monthly or yearly)"
            ))),
        }
    }
}

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ValueObject for DateWindow {}

impl DateWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window covering whole calendar days, both dates inclusive.
    pub fn for_dates(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: midnight(first),
            end: last.succ_opt().map(midnight).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

pub(crate) fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::default()).and_utc()
}

fn add_days(day: NaiveDate, days: u64) -> NaiveDate {
    day.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

fn add_months(day: NaiveDate, months: u32) -> NaiveDate {
    day.checked_add_months(Months::new(months)).unwrap_or(NaiveDate::MAX)
}
