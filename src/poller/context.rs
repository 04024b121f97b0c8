use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::ScheduleConfig;
use crate::meeting::{normalize_all, NormalizedMeeting, RawMeeting};
use crate::window::{aggregate, classify, AggregateState, SignalSet, Thresholds};

/// Everything a tick needs, fixed for the whole run.
#[derive(Debug, Clone)]
pub struct PollContext {
    meetings: Vec<NormalizedMeeting>,
    reference_zone: Tz,
    thresholds: Thresholds,
    poll_interval: std::time::Duration,
    max_runtime: Option<std::time::Duration>,
}

/// One meeting as seen at a particular instant.
#[derive(Debug, Clone)]
pub struct MeetingStatus<'a> {
    pub meeting: &'a NormalizedMeeting,
    pub until_start: Duration,
    pub signals: SignalSet,
}

impl PollContext {
    pub fn new(
        meetings: Vec<NormalizedMeeting>,
        reference_zone: Tz,
        thresholds: Thresholds,
        poll_interval: std::time::Duration,
        max_runtime: Option<std::time::Duration>,
    ) -> Self {
        Self {
            meetings,
            reference_zone,
            thresholds,
            poll_interval,
            max_runtime,
        }
    }

    /// Normalize the fetched records and take the remaining settings from
    /// the schedule configuration. Unusable records are skipped.
    pub fn from_raw(raws: &[RawMeeting], schedule: &ScheduleConfig) -> Result<Self> {
        let reference_zone = schedule.reference_zone()?;
        Ok(Self::new(
            normalize_all(raws, reference_zone),
            reference_zone,
            schedule.thresholds()?,
            schedule.poll_interval()?,
            schedule.max_runtime()?,
        ))
    }

    pub fn meetings(&self) -> &[NormalizedMeeting] {
        &self.meetings
    }

    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty()
    }

    pub fn reference_zone(&self) -> Tz {
        self.reference_zone
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        self.poll_interval
    }

    pub fn max_runtime(&self) -> Option<std::time::Duration> {
        self.max_runtime
    }

    /// Per-meeting view at `now`, in meeting order.
    pub fn statuses<Z: TimeZone>(&self, now: &DateTime<Z>) -> Vec<MeetingStatus<'_>> {
        let now_utc = now.with_timezone(&Utc);
        self.meetings
            .iter()
            .map(|meeting| MeetingStatus {
                meeting,
                until_start: meeting.interval().start() - now_utc,
                signals: classify(meeting, now, &self.thresholds),
            })
            .collect()
    }

    /// The lights for `now`.
    pub fn evaluate<Z: TimeZone>(&self, now: &DateTime<Z>) -> AggregateState {
        aggregate(
            self.meetings
                .iter()
                .map(|meeting| classify(meeting, now, &self.thresholds)),
        )
    }
}
