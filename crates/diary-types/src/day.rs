//! Calendar-day boundaries.
//!
//! Capsules are keyed by the user's calendar day, not the UTC day. A
//! `DayWindow` converts a local date into the half-open UTC range used to
//! query that day's listening records.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::DiaryError;

/// Half-open UTC interval `[start, end)` covering one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    /// The local calendar date
    pub date: NaiveDate,
    /// Start of `date` in local time, in UTC
    pub start: DateTime<Utc>,
    /// Start of the following day in local time, in UTC
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Build the window for `date` in timezone `tz`.
    pub fn for_date(date: NaiveDate, tz: Tz) -> Result<Self, DiaryError> {
        let next = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| DiaryError::InvalidInput(format!("date out of range: {}", date)))?;

        Ok(Self {
            date,
            start: local_midnight(date, tz)?,
            end: local_midnight(next, tz)?,
        })
    }

    /// True if `ts` falls inside the window.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// Longest stretch of skipped local time searched for the start of a day.
const MAX_GAP_MINUTES: i64 = 48 * 60;

/// First instant of `date` in `tz`.
///
/// Usually local midnight. When a clock change skips midnight the day
/// starts at the first local minute after the gap.
fn local_midnight(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>, DiaryError> {
    let midnight = date.and_time(NaiveTime::MIN);

    (0..=MAX_GAP_MINUTES)
        .find_map(|minute| {
            tz.from_local_datetime(&(midnight + Duration::minutes(minute)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            DiaryError::InvalidInput(format!("no local start for {} in {}", date, tz.name()))
        })
}
