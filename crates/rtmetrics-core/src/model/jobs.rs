//! Batch job progress.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::time::{Timestamp, null_as_default};
use crate::merge::{Merge, overwrite_by_key};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplicateInfo {
    pub last_bucket: String,
    pub last_object: String,
    pub objects: i64,
    pub objects_failed: i64,
    pub bytes_transferred: i64,
    pub bytes_failed: i64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyRotationInfo {
    pub last_bucket: String,
    pub last_object: String,
    pub objects: i64,
    pub objects_failed: i64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpirationInfo {
    pub last_bucket: String,
    pub last_object: String,
    pub objects: i64,
    pub objects_failed: i64,
}

/// Status of one batch job as seen by the node running it.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct JobMetric {
    #[serde(rename = "jobID")]
    pub job_id: String,
    pub job_type: String,
    pub start_time: Timestamp,
    pub last_update: Timestamp,
    pub retry_attempts: i32,
    pub complete: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicate: Option<ReplicateInfo>,
    #[serde(rename = "rotation", skip_serializing_if = "Option::is_none")]
    pub key_rotate: Option<KeyRotationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<ExpirationInfo>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct BatchJobMetrics {
    #[serde(rename = "collected")]
    pub collected_at: Timestamp,

    /// Jobs keyed by job id.
    #[serde(deserialize_with = "null_as_default")]
    pub jobs: BTreeMap<String, JobMetric>,
}

impl Merge for BatchJobMetrics {
    fn merge(&mut self, other: &Self) {
        if other.jobs.is_empty() {
            return;
        }
        self.collected_at.keep_latest(other.collected_at);
        // A job is driven by exactly one node at a time, so the last report wins.
        overwrite_by_key(&mut self.jobs, &other.jobs);
    }
}
