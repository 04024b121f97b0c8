use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::normalizer::MeetingError;

/// Timestamp exactly as the calendar provider sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTimestamp {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "timeZone", default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RawTimestamp {
    pub fn new(date_time: impl Into<String>, time_zone: Option<&str>) -> Self {
        Self {
            date_time: date_time.into(),
            time_zone: time_zone.map(str::to_string),
        }
    }
}

/// A meeting record before any parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMeeting {
    #[serde(default)]
    pub subject: Option<String>,
    pub start: RawTimestamp,
    pub end: RawTimestamp,
}

impl RawMeeting {
    pub fn subject_or_placeholder(&self) -> String {
        self.subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("(no subject)")
            .to_string()
    }
}

/// A parsed meeting. `start < end` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingInterval {
    subject: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    source_zone: Option<Tz>,
}

impl MeetingInterval {
    pub fn new(
        subject: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source_zone: Option<Tz>,
    ) -> Result<Self, MeetingError> {
        if end <= start {
            return Err(MeetingError::InvalidInterval { start, end });
        }
        Ok(Self {
            subject: subject.into(),
            start,
            end,
            source_zone,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn source_zone(&self) -> Option<Tz> {
        self.source_zone
    }
}

/// A meeting expressed in the reference zone used for every comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMeeting {
    interval: MeetingInterval,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
}

impl NormalizedMeeting {
    pub(crate) fn from_interval(interval: MeetingInterval, reference: Tz) -> Self {
        let start = interval.start.with_timezone(&reference);
        let end = interval.end.with_timezone(&reference);
        Self {
            interval,
            start,
            end,
        }
    }

    pub fn subject(&self) -> &str {
        self.interval.subject()
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn interval(&self) -> &MeetingInterval {
        &self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_interval_rejects_end_before_start() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 16, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap();
        let err = MeetingInterval::new("Backwards", start, end, None).unwrap_err();
        assert!(matches!(err, MeetingError::InvalidInterval { .. }));
    }

    #[test]
    fn test_interval_rejects_zero_length() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 16, 0, 0).unwrap();
        assert!(MeetingInterval::new("Empty", at, at, None).is_err());
    }

    #[test]
    fn test_raw_meeting_deserializes_graph_shape() {
        let json = r#"{
            "subject": "Standup",
            "start": {"dateTime": "2024-05-01T09:00:00.0000000", "timeZone": "America/Los_Angeles"},
            "end": {"dateTime": "2024-05-01T09:15:00.0000000", "timeZone": "America/Los_Angeles"}
        }"#;
        let raw: RawMeeting = serde_json::from_str(json).unwrap();
        assert_eq!(raw.subject.as_deref(), Some("Standup"));
        assert_eq!(raw.start.time_zone.as_deref(), Some("America/Los_Angeles"));
        assert_eq!(raw.end.date_time, "2024-05-01T09:15:00.0000000");
    }

    #[test]
    fn test_subject_placeholder() {
        let raw = RawMeeting {
            subject: Some("   ".to_string()),
            start: RawTimestamp::new("2024-05-01T09:00:00Z", None),
            end: RawTimestamp::new("2024-05-01T10:00:00Z", None),
        };
        assert_eq!(raw.subject_or_placeholder(), "(no subject)");
    }
}
