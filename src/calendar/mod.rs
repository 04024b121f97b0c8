//! One-shot fetch of the day's meetings.

pub mod graph;

pub use graph::GraphCalendarClient;

use crate::meeting::RawMeeting;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("calendar request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("calendar returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("could not decode calendar response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("cannot compute the day window: {0}")]
    Window(String),
}

/// Local midnight today to local midnight tomorrow, in the reference zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub zone: Tz,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl DayWindow {
    pub fn containing(now: DateTime<Utc>, zone: Tz) -> Result<Self, FetchError> {
        let today = now.with_timezone(&zone).date_naive();
        let tomorrow = today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| FetchError::Window(format!("no day after {today}")))?;
        Ok(Self {
            zone,
            start: local_midnight(today, zone)?,
            end: local_midnight(tomorrow, zone)?,
        })
    }
}

fn local_midnight(day: NaiveDate, zone: Tz) -> Result<DateTime<Tz>, FetchError> {
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| FetchError::Window(format!("no midnight on {day}")))?;
    zone.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            // zones that skip midnight on a transition day start an hour later
            zone.from_local_datetime(&(midnight + chrono::Duration::hours(1)))
                .earliest()
        })
        .ok_or_else(|| {
            FetchError::Window(format!(
                "midnight of {day} does not exist in {}",
                zone.name()
            ))
        })
}

/// Supplies the snapshot of meetings the poll loop works from.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn fetch_day(&self, window: &DayWindow, token: &str) -> Result<Vec<RawMeeting>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_day_window_uses_local_date() {
        // 03:00 UTC on May 2nd is still May 1st in Los Angeles
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 3, 0, 0).unwrap();
        let window = DayWindow::containing(now, chrono_tz::America::Los_Angeles).unwrap();

        assert_eq!(window.start.to_rfc3339(), "2024-05-01T00:00:00-07:00");
        assert_eq!(window.end.to_rfc3339(), "2024-05-02T00:00:00-07:00");
    }

    #[test]
    fn test_day_window_across_dst_change() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap();
        let window = DayWindow::containing(now, chrono_tz::America::Los_Angeles).unwrap();

        assert_eq!(window.start.hour(), 0);
        assert_eq!((window.end - window.start).num_hours(), 23);
    }
}
