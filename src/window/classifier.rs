use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fmt;

use crate::meeting::NormalizedMeeting;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    PreAlert,
    NearAlert,
    Active,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::PreAlert, Signal::NearAlert, Signal::Active];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::PreAlert => "pre-alert",
            Signal::NearAlert => "near-alert",
            Signal::Active => "active",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Signal::PreAlert => 0b001,
            Signal::NearAlert => 0b010,
            Signal::Active => 0b100,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signals one meeting contributes for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalSet(u8);

impl SignalSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, signal: Signal) {
        self.0 |= signal.bit();
    }

    pub fn contains(&self, signal: Signal) -> bool {
        self.0 & signal.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        Signal::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl FromIterator<Signal> for SignalSet {
    fn from_iter<I: IntoIterator<Item = Signal>>(iter: I) -> Self {
        let mut set = SignalSet::empty();
        for signal in iter {
            set.insert(signal);
        }
        set
    }
}

impl fmt::Display for SignalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(|s| s.as_str()).collect();
        f.write_str(&names.join("+"))
    }
}

/// How long before a meeting each alert window opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pre: Duration,
    near: Duration,
}

impl Thresholds {
    pub fn new(pre: Duration, near: Duration) -> Result<Self> {
        if near <= Duration::zero() {
            bail!("near-alert threshold must be positive, got {}", near);
        }
        if pre <= near {
            bail!(
                "pre-alert threshold ({}) must be longer than the near-alert threshold ({})",
                pre,
                near
            );
        }
        Ok(Self { pre, near })
    }

    pub fn from_minutes(pre: i64, near: i64) -> Result<Self> {
        let minutes = |value: i64| {
            Duration::try_minutes(value)
                .with_context(|| format!("{value} minutes is out of range"))
        };
        Self::new(minutes(pre)?, minutes(near)?)
    }

    pub fn pre(&self) -> Duration {
        self.pre
    }

    pub fn near(&self) -> Duration {
        self.near
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            pre: Duration::minutes(15),
            near: Duration::minutes(5),
        }
    }
}

/// Which signals `meeting` contributes at `now`.
///
/// Alert windows have exclusive lower bounds, so at the meeting's first
/// instant only `Active` holds.
pub fn classify<Z: TimeZone>(
    meeting: &NormalizedMeeting,
    now: &DateTime<Z>,
    thresholds: &Thresholds,
) -> SignalSet {
    let now = now.with_timezone(&Utc);
    let start = meeting.interval().start();
    let end = meeting.interval().end();
    let delta = start - now;

    let mut signals = SignalSet::empty();
    if delta > thresholds.near && delta <= thresholds.pre {
        signals.insert(Signal::PreAlert);
    }
    if delta > Duration::zero() && delta <= thresholds.near {
        signals.insert(Signal::NearAlert);
    }
    if start <= now && now <= end {
        signals.insert(Signal::Active);
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meeting::MeetingInterval;
    use chrono_tz::Tz;

    fn meeting_at(hour: u32, minute: u32, minutes_long: i64) -> NormalizedMeeting {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap();
        MeetingInterval::new("Review", start, start + Duration::minutes(minutes_long), None)
            .unwrap()
            .normalize(Tz::UTC)
    }

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, second).unwrap()
    }

    #[test]
    fn test_far_before_start_is_silent() {
        let meeting = meeting_at(9, 0, 30);
        let thresholds = Thresholds::default();
        for now in [at(8, 0, 0), at(8, 44, 59), at(6, 30, 0)] {
            assert!(classify(&meeting, &now, &thresholds).is_empty());
        }
    }

    #[test]
    fn test_pre_alert_window_bounds() {
        let meeting = meeting_at(9, 0, 30);
        let thresholds = Thresholds::default();

        // exactly 15 minutes out is inside
        let set = classify(&meeting, &at(8, 45, 0), &thresholds);
        assert_eq!(set, [Signal::PreAlert].into_iter().collect());

        // exactly 5 minutes out belongs to the near window
        let set = classify(&meeting, &at(8, 55, 0), &thresholds);
        assert!(!set.contains(Signal::PreAlert));
        assert!(set.contains(Signal::NearAlert));

        let set = classify(&meeting, &at(8, 54, 59), &thresholds);
        assert!(set.contains(Signal::PreAlert));
        assert!(!set.contains(Signal::NearAlert));
    }

    #[test]
    fn test_near_alert_window_bounds() {
        let meeting = meeting_at(9, 0, 30);
        let thresholds = Thresholds::default();

        let set = classify(&meeting, &at(8, 59, 59), &thresholds);
        assert_eq!(set, [Signal::NearAlert].into_iter().collect());
    }

    #[test]
    fn test_start_instant_is_active_only() {
        let meeting = meeting_at(9, 0, 30);
        let set = classify(&meeting, &at(9, 0, 0), &Thresholds::default());
        assert_eq!(set, [Signal::Active].into_iter().collect());
    }

    #[test]
    fn test_active_bounds_inclusive() {
        let meeting = meeting_at(9, 0, 30);
        let thresholds = Thresholds::default();
        assert!(classify(&meeting, &at(9, 30, 0), &thresholds).contains(Signal::Active));
        assert!(classify(&meeting, &at(9, 30, 1), &thresholds).is_empty());
    }

    #[test]
    fn test_custom_thresholds() {
        let meeting = meeting_at(9, 0, 30);
        let thresholds = Thresholds::from_minutes(30, 10).unwrap();
        let set = classify(&meeting, &at(8, 35, 0), &thresholds);
        assert!(set.contains(Signal::PreAlert));
        let set = classify(&meeting, &at(8, 52, 0), &thresholds);
        assert!(set.contains(Signal::NearAlert));
    }

    #[test]
    fn test_thresholds_validation() {
        assert!(Thresholds::from_minutes(5, 5).is_err());
        assert!(Thresholds::from_minutes(5, 15).is_err());
        assert!(Thresholds::from_minutes(15, 0).is_err());
        assert!(Thresholds::from_minutes(15, 5).is_ok());
        assert!(Thresholds::from_minutes(i64::MAX, 5).is_err());
    }

    #[test]
    fn test_signal_set_display() {
        let set: SignalSet = [Signal::Active, Signal::PreAlert].into_iter().collect();
        assert_eq!(set.to_string(), "pre-alert+active");
        assert_eq!(SignalSet::empty().to_string(), "none");
    }
}
