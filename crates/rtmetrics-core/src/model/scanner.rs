//! Background scanner activity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::time::{Timestamp, null_as_default};
use super::timed::TimedAction;
use crate::merge::{Merge, merge_by_key, sum_by_key};

/// Scan progress of one bucket on one erasure set.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct BucketScanInfo {
    pub pool: i32,
    pub set: i32,
    pub cycle: u64,
    pub ongoing: bool,
    pub last_update: Timestamp,
    pub last_started: Timestamp,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_error: String,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub completed: Vec<Timestamp>,
}

/// Scanner operations observed during the last minute.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ScannerLastMinute {
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub actions: BTreeMap<String, TimedAction>,
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub ilm: BTreeMap<String, TimedAction>,
}

/// Scanner metrics of one node, or of the cluster once merged.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ScannerMetrics {
    #[serde(rename = "collected")]
    pub collected_at: Timestamp,

    /// Current scanner cycle number.
    pub current_cycle: u64,

    /// Start time of the current cycle.
    pub current_started: Timestamp,

    /// Completion times of the most recent cycles.
    #[serde(rename = "cycle_complete_times", deserialize_with = "null_as_default")]
    pub cycles_completed_at: Vec<Timestamp>,

    /// Number of buckets currently being scanned.
    pub ongoing_buckets: u64,

    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub per_bucket_stats: BTreeMap<String, Vec<BucketScanInfo>>,

    /// Life time operation counts, keyed by operation name.
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub life_time_ops: BTreeMap<String, u64>,

    /// Life time ILM action counts, keyed by action name.
    #[serde(
        rename = "ilm_ops",
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub life_time_ilm: BTreeMap<String, u64>,

    pub last_minute: ScannerLastMinute,

    /// Paths currently being scanned.
    #[serde(
        rename = "active",
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub active_paths: Vec<String>,
}

impl Merge for ScannerMetrics {
    fn merge(&mut self, other: &Self) {
        self.collected_at.keep_latest(other.collected_at);
        self.ongoing_buckets = self.ongoing_buckets.max(other.ongoing_buckets);

        if self.current_cycle < other.current_cycle {
            self.current_cycle = other.current_cycle;
            self.current_started = other.current_started;
            self.cycles_completed_at = other.cycles_completed_at.clone();
        }
        if other.cycles_completed_at.len() > self.cycles_completed_at.len() {
            self.cycles_completed_at = other.cycles_completed_at.clone();
        }

        // Bucket stats are reported by the node owning the bucket; keep the first list seen.
        for (bucket, stats) in &other.per_bucket_stats {
            self.per_bucket_stats
                .entry(bucket.clone())
                .or_insert_with(|| stats.clone());
        }

        sum_by_key(&mut self.life_time_ops, &other.life_time_ops);
        sum_by_key(&mut self.life_time_ilm, &other.life_time_ilm);
        merge_by_key(&mut self.last_minute.actions, &other.last_minute.actions);
        merge_by_key(&mut self.last_minute.ilm, &other.last_minute.ilm);

        if !other.active_paths.is_empty() {
            self.active_paths.extend(other.active_paths.iter().cloned());
            self.active_paths.sort();
        }
    }
}
