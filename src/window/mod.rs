//! Alert-window classification and aggregation.
//!
//! Both halves are pure: the lights for a tick depend only on the meetings,
//! the thresholds and the instant being evaluated.

pub mod aggregator;
pub mod classifier;

pub use aggregator::{aggregate, AggregateState};
pub use classifier::{classify, Signal, SignalSet, Thresholds};
