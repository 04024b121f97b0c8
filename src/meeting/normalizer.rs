use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, warn};

use super::record::{MeetingInterval, NormalizedMeeting, RawMeeting, RawTimestamp};

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Zone names the calendar provider uses for UTC that are not IANA names.
const UTC_ALIASES: &[&str] = &["utc", "etc/utc", "z", "tzone://microsoft/utc"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeetingError {
    #[error("malformed timestamp {value:?}: {reason}")]
    MalformedTimestamp { value: String, reason: String },
    #[error("unknown time zone {0:?}")]
    UnknownZone(String),
    #[error("meeting ends at {end} which is not after its start {start}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

pub fn parse_zone(name: &str) -> Result<Tz, MeetingError> {
    let trimmed = name.trim();
    if UTC_ALIASES
        .iter()
        .any(|alias| trimmed.eq_ignore_ascii_case(alias))
    {
        return Ok(Tz::UTC);
    }
    trimmed
        .parse::<Tz>()
        .map_err(|_| MeetingError::UnknownZone(trimmed.to_string()))
}

/// Parse one provider timestamp into an instant.
///
/// Values carrying an explicit offset are taken as-is. Naive values are read
/// in the timestamp's own zone, or UTC when it has none.
fn parse_timestamp(raw: &RawTimestamp) -> Result<(DateTime<Utc>, Option<Tz>), MeetingError> {
    let zone = raw.time_zone.as_deref().map(parse_zone).transpose()?;
    let value = raw.date_time.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Ok((with_offset.with_timezone(&Utc), zone));
    }

    let naive = NaiveDateTime::parse_from_str(value, NAIVE_FORMAT).map_err(|e| {
        MeetingError::MalformedTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        }
    })?;

    let local_zone = zone.unwrap_or(Tz::UTC);
    let local = local_zone
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| MeetingError::MalformedTimestamp {
            value: value.to_string(),
            reason: format!("time does not exist in {}", local_zone.name()),
        })?;

    Ok((local.with_timezone(&Utc), zone))
}

impl MeetingInterval {
    pub fn from_raw(raw: &RawMeeting) -> Result<Self, MeetingError> {
        let (start, start_zone) = parse_timestamp(&raw.start)?;
        let (end, end_zone) = parse_timestamp(&raw.end)?;
        MeetingInterval::new(
            raw.subject_or_placeholder(),
            start,
            end,
            start_zone.or(end_zone),
        )
    }

    pub fn normalize(self, reference: Tz) -> NormalizedMeeting {
        NormalizedMeeting::from_interval(self, reference)
    }
}

/// Parse a raw meeting and express it in `reference`.
pub fn normalize(raw: &RawMeeting, reference: Tz) -> Result<NormalizedMeeting, MeetingError> {
    Ok(MeetingInterval::from_raw(raw)?.normalize(reference))
}

/// Normalize a whole batch, skipping records that cannot be used.
pub fn normalize_all(raws: &[RawMeeting], reference: Tz) -> Vec<NormalizedMeeting> {
    raws.iter()
        .filter_map(|raw| match normalize(raw, reference) {
            Ok(meeting) => {
                debug!(
                    "Normalized meeting {:?}: {} - {}",
                    meeting.subject(),
                    meeting.start(),
                    meeting.end()
                );
                Some(meeting)
            }
            Err(e) => {
                warn!(
                    "Skipping meeting {:?}: {}",
                    raw.subject_or_placeholder(),
                    e
                );
                None
            }
        })
        .collect()
}
