//! The evaluate-apply loop.
//!
//! A [`PollContext`] is built once from the fetched meetings and the
//! schedule settings. The [`PollLoop`] re-derives the lights from it on every
//! tick until it is cancelled or its runtime bound runs out.

pub mod clock;
pub mod context;
pub mod poll_loop;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{MeetingStatus, PollContext};
pub use poll_loop::{PollLoop, PollPhase, StopReason};
