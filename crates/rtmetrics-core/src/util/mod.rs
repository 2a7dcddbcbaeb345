//! Utility modules for rtmetrics.

mod duration;

pub use duration::{DurationParseError, format_duration, parse_duration};
