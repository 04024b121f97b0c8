//! Meeting records and their normalization into the reference zone.
//!
//! Raw records arrive from the calendar provider with loosely formatted
//! timestamps. They are parsed and converted once, when the poll context is
//! built, and never mutated afterwards.

pub mod normalizer;
pub mod record;

pub use normalizer::{normalize, normalize_all, parse_zone, MeetingError};
pub use record::{MeetingInterval, NormalizedMeeting, RawMeeting, RawTimestamp};
