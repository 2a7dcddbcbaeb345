//! Drive-level metrics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::time::{Timestamp, is_zero_u64, null_as_default};
use super::timed::TimedAction;
use crate::merge::{Merge, merge_by_key, sum_by_key};

/// Block device I/O counters, as reported by the kernel for the drive.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DiskIoStats {
    pub read_ios: u64,
    pub read_merges: u64,
    pub read_sectors: u64,
    pub read_ticks: u64,
    pub write_ios: u64,
    pub write_merges: u64,
    pub write_sectors: u64,
    pub write_ticks: u64,
    pub current_ios: u64,
    pub total_ticks: u64,
    pub req_ticks: u64,
    pub discard_ios: u64,
    pub discard_merges: u64,
    pub discard_sectors: u64,
    pub discard_ticks: u64,
    pub flush_ios: u64,
    pub flush_ticks: u64,
}

impl Merge for DiskIoStats {
    fn merge(&mut self, other: &Self) {
        self.read_ios += other.read_ios;
        self.read_merges += other.read_merges;
        self.read_sectors += other.read_sectors;
        self.read_ticks += other.read_ticks;
        self.write_ios += other.write_ios;
        self.write_merges += other.write_merges;
        self.write_sectors += other.write_sectors;
        self.write_ticks += other.write_ticks;
        self.current_ios += other.current_ios;
        self.total_ticks += other.total_ticks;
        self.req_ticks += other.req_ticks;
        self.discard_ios += other.discard_ios;
        self.discard_merges += other.discard_merges;
        self.discard_sectors += other.discard_sectors;
        self.discard_ticks += other.discard_ticks;
        self.flush_ios += other.flush_ios;
        self.flush_ticks += other.flush_ticks;
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DiskLastMinute {
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub operations: BTreeMap<String, TimedAction>,
}

/// Metrics for one drive, or for a set of drives once merged.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DiskMetric {
    #[serde(rename = "collected")]
    pub collected_at: Timestamp,

    /// Number of drives covered by this metric.
    pub n_disks: u64,

    /// Drives currently offline.
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub offline: u64,

    /// Drives currently healing.
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub healing: u64,

    /// Life time operation counts, keyed by storage API name.
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub life_time_ops: BTreeMap<String, u64>,

    pub last_minute: DiskLastMinute,

    #[serde(rename = "iostats")]
    pub io_stats: DiskIoStats,
}

impl Merge for DiskMetric {
    fn merge(&mut self, other: &Self) {
        self.collected_at.keep_latest(other.collected_at);
        self.n_disks += other.n_disks;
        self.offline += other.offline;
        self.healing += other.healing;
        sum_by_key(&mut self.life_time_ops, &other.life_time_ops);
        merge_by_key(
            &mut self.last_minute.operations,
            &other.last_minute.operations,
        );
        self.io_stats.merge(&other.io_stats);
    }
}
