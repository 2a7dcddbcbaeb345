//! Running accumulator for a class of timed operations.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::time::is_zero_u64;
use crate::merge::Merge;

/// Count, accumulated time and bytes for one kind of operation.
///
/// Merge is field-wise addition, so `TimedAction` is a commutative monoid
/// with the default value as identity.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct TimedAction {
    pub count: u64,
    /// Accumulated time in nanoseconds.
    #[serde(rename = "acc_time_ns")]
    pub acc_time: u64,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub bytes: u64,
}

impl TimedAction {
    /// Average time per operation, zero when nothing was counted.
    pub fn avg(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.acc_time / self.count)
    }

    /// Average bytes per operation, zero when nothing was counted.
    pub fn avg_bytes(&self) -> u64 {
        if self.count == 0 {
            return 0;
        }
        self.bytes / self.count
    }
}

impl Merge for TimedAction {
    fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.acc_time += other.acc_time;
        self.bytes += other.bytes;
    }
}
