use serde::{Deserialize, Serialize};
use std::fmt;

use super::classifier::{Signal, SignalSet};

/// Desired value of each light for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateState {
    pub pre_alert: bool,
    pub near_alert: bool,
    pub active: bool,
}

impl AggregateState {
    pub fn all_off() -> Self {
        Self::default()
    }

    pub fn get(&self, signal: Signal) -> bool {
        match signal {
            Signal::PreAlert => self.pre_alert,
            Signal::NearAlert => self.near_alert,
            Signal::Active => self.active,
        }
    }

    fn merge(self, set: SignalSet) -> Self {
        Self {
            pre_alert: self.pre_alert || set.contains(Signal::PreAlert),
            near_alert: self.near_alert || set.contains(Signal::NearAlert),
            active: self.active || set.contains(Signal::Active),
        }
    }
}

impl fmt::Display for AggregateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |on: bool| if on { "on" } else { "off" };
        write!(
            f,
            "pre-alert={} near-alert={} active={}",
            flag(self.pre_alert),
            flag(self.near_alert),
            flag(self.active)
        )
    }
}

/// Logical OR of every set, per channel.
pub fn aggregate<I>(sets: I) -> AggregateState
where
    I: IntoIterator<Item = SignalSet>,
{
    sets.into_iter()
        .fold(AggregateState::all_off(), AggregateState::merge)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(signals: &[Signal]) -> SignalSet {
        signals.iter().copied().collect()
    }

    #[test]
    fn test_empty_input_is_all_off() {
        assert_eq!(aggregate(Vec::new()), AggregateState::all_off());
    }

    #[test]
    fn test_or_per_channel() {
        let state = aggregate(vec![
            set(&[Signal::NearAlert]),
            set(&[]),
            set(&[Signal::Active]),
        ]);
        assert_eq!(
            state,
            AggregateState {
                pre_alert: false,
                near_alert: true,
                active: true,
            }
        );
    }

    #[test]
    fn test_order_independent() {
        let sets = vec![
            set(&[Signal::PreAlert]),
            set(&[Signal::Active]),
            set(&[]),
            set(&[Signal::NearAlert, Signal::Active]),
        ];
        let forward = aggregate(sets.clone());
        let mut reversed = sets.clone();
        reversed.reverse();
        assert_eq!(forward, aggregate(reversed));

        let mut rotated = sets;
        rotated.rotate_left(2);
        assert_eq!(forward, aggregate(rotated));
    }

    #[test]
    fn test_display() {
        let state = AggregateState {
            pre_alert: true,
            near_alert: false,
            active: false,
        };
        assert_eq!(state.to_string(), "pre-alert=on near-alert=off active=off");
    }
}
