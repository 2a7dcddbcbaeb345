//! Cross-site resync progress.

use serde::{Deserialize, Serialize};

use super::time::{Timestamp, null_as_default};
use crate::merge::Merge;

/// Latest status of a single site resync operation.
///
/// Unlike the counter categories this record is not additive across nodes:
/// it describes one logical operation, so a newer report replaces it.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SiteResyncMetrics {
    #[serde(rename = "collected")]
    pub collected_at: Timestamp,

    #[serde(rename = "resyncStatus", skip_serializing_if = "String::is_empty")]
    pub resync_status: String,

    #[serde(rename = "startTime")]
    pub start_time: Timestamp,

    #[serde(rename = "lastUpdate")]
    pub last_update: Timestamp,

    #[serde(rename = "numBuckets")]
    pub num_buckets: i64,

    #[serde(rename = "resyncID")]
    pub resync_id: String,

    #[serde(rename = "deplID")]
    pub depl_id: String,

    #[serde(rename = "completeReplicationSize")]
    pub replicated_size: i64,

    #[serde(rename = "replicationCount")]
    pub replicated_count: i64,

    #[serde(rename = "failedReplicationSize")]
    pub failed_size: i64,

    #[serde(rename = "failedReplicationCount")]
    pub failed_count: i64,

    #[serde(rename = "failedBuckets", deserialize_with = "null_as_default")]
    pub failed_buckets: Vec<String>,

    /// Bucket being resynced right now.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bucket: String,

    /// Object being resynced right now.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub object: String,
}

impl SiteResyncMetrics {
    pub fn is_complete(&self) -> bool {
        self.resync_status.eq_ignore_ascii_case("completed")
    }
}

impl Merge for SiteResyncMetrics {
    fn merge(&mut self, other: &Self) {
        if self.collected_at.is_zero() || self.collected_at < other.collected_at {
            *self = other.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(collected: i64, status: &str, count: i64) -> SiteResyncMetrics {
        SiteResyncMetrics {
            collected_at: Timestamp::from_unix(collected),
            resync_status: status.into(),
            resync_id: "r-1".into(),
            replicated_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn newer_report_replaces_wholesale() {
        let mut a = status(100, "Ongoing", 10);
        a.merge(&status(200, "Completed", 40));
        assert_eq!(a, status(200, "Completed", 40));
        assert!(a.is_complete());
    }

    #[test]
    fn older_or_equal_report_is_ignored() {
        let mut a = status(200, "Ongoing", 10);
        a.merge(&status(100, "Completed", 99));
        a.merge(&status(200, "Failed", 1));
        assert_eq!(a, status(200, "Ongoing", 10));
    }

    #[test]
    fn unpopulated_receiver_takes_other() {
        let mut a = SiteResyncMetrics::default();
        let other = SiteResyncMetrics {
            resync_status: "Ongoing".into(),
            ..Default::default()
        };
        a.merge(&other);
        assert_eq!(a, other);
    }
}
