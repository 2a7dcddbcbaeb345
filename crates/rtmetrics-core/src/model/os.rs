//! OS-level operation counters (syscalls issued on behalf of the storage layer).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::time::{Timestamp, null_as_default};
use super::timed::TimedAction;
use crate::merge::{Merge, merge_by_key, sum_by_key};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct OsLastMinute {
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub operations: BTreeMap<String, TimedAction>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct OsMetrics {
    #[serde(rename = "collected")]
    pub collected_at: Timestamp,

    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub life_time_ops: BTreeMap<String, u64>,

    pub last_minute: OsLastMinute,
}

impl Merge for OsMetrics {
    fn merge(&mut self, other: &Self) {
        self.collected_at.keep_latest(other.collected_at);
        sum_by_key(&mut self.life_time_ops, &other.life_time_ops);
        merge_by_key(
            &mut self.last_minute.operations,
            &other.last_minute.operations,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merging_default_is_a_no_op() {
        let mut a = OsMetrics {
            collected_at: Timestamp::from_unix(10),
            ..Default::default()
        };
        a.life_time_ops.insert("fsync".into(), 2);
        a.last_minute.operations.insert(
            "fsync".into(),
            TimedAction {
                count: 2,
                acc_time: 400,
                bytes: 0,
            },
        );
        let before = a.clone();
        a.merge(&OsMetrics::default());
        assert_eq!(a, before);
    }

    #[test]
    fn ops_sum_per_key() {
        let mut a = OsMetrics {
            collected_at: Timestamp::from_unix(10),
            ..Default::default()
        };
        a.life_time_ops.insert("fdatasync".into(), 3);

        let mut b = OsMetrics {
            collected_at: Timestamp::from_unix(20),
            ..Default::default()
        };
        b.life_time_ops.insert("fdatasync".into(), 4);
        b.life_time_ops.insert("rename".into(), 1);
        b.last_minute.operations.insert(
            "rename".into(),
            TimedAction {
                count: 1,
                acc_time: 900,
                bytes: 0,
            },
        );

        a.merge(&b);
        assert_eq!(a.collected_at, Timestamp::from_unix(20));
        assert_eq!(a.life_time_ops["fdatasync"], 7);
        assert_eq!(a.life_time_ops["rename"], 1);
        assert_eq!(a.last_minute.operations["rename"].acc_time, 900);
    }
}
