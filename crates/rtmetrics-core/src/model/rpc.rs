//! Inter-node RPC transport health.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::time::{Timestamp, null_as_default};
use crate::merge::{Merge, merge_by_key};

/// Connection and traffic counters of the internode grid.
///
/// `by_destination` and `by_caller` hold the same structure per remote peer.
/// Nesting is tree-shaped and shallow: a peer entry never contains itself.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RpcMetrics {
    pub collected_at: Timestamp,
    pub connected: i64,
    pub reconnect_count: i64,
    pub disconnected: i64,
    pub outgoing_streams: i64,
    pub incoming_streams: i64,
    pub outgoing_bytes: i64,
    pub incoming_bytes: i64,
    pub outgoing_messages: i64,
    pub incoming_messages: i64,
    pub out_queue: i64,
    pub last_pong_time: Timestamp,
    #[serde(rename = "lastPingMS")]
    pub last_ping_ms: f64,
    /// Maximum ping duration across all merged entries.
    #[serde(rename = "maxPingDurMS")]
    pub max_ping_dur_ms: f64,
    pub last_connect_time: Timestamp,
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub by_destination: BTreeMap<String, RpcMetrics>,
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub by_caller: BTreeMap<String, RpcMetrics>,
}

impl Merge for RpcMetrics {
    fn merge(&mut self, other: &Self) {
        self.collected_at.keep_latest(other.collected_at);
        self.last_connect_time.keep_latest(other.last_connect_time);

        self.connected += other.connected;
        self.disconnected += other.disconnected;
        self.reconnect_count += other.reconnect_count;
        self.outgoing_streams += other.outgoing_streams;
        self.incoming_streams += other.incoming_streams;
        self.outgoing_bytes += other.outgoing_bytes;
        self.incoming_bytes += other.incoming_bytes;
        self.outgoing_messages += other.outgoing_messages;
        self.incoming_messages += other.incoming_messages;
        self.out_queue += other.out_queue;

        // Ping latency belongs to the pong it was measured with.
        if self.last_pong_time < other.last_pong_time {
            self.last_pong_time = other.last_pong_time;
            self.last_ping_ms = other.last_ping_ms;
        }
        if self.max_ping_dur_ms < other.max_ping_dur_ms {
            self.max_ping_dur_ms = other.max_ping_dur_ms;
        }

        merge_by_key(&mut self.by_destination, &other.by_destination);
        merge_by_key(&mut self.by_caller, &other.by_caller);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(connected: i64, pong: i64, ping_ms: f64, max_ms: f64) -> RpcMetrics {
        RpcMetrics {
            collected_at: Timestamp::from_unix(pong),
            connected,
            outgoing_bytes: 100,
            incoming_messages: 3,
            last_pong_time: Timestamp::from_unix(pong),
            last_ping_ms: ping_ms,
            max_ping_dur_ms: max_ms,
            last_connect_time: Timestamp::from_unix(pong - 10),
            ..Default::default()
        }
    }

    #[test]
    fn counters_sum_and_ping_follows_newest_pong() {
        let mut a = peer(2, 100, 1.5, 9.0);
        a.merge(&peer(3, 200, 0.5, 4.0));

        assert_eq!(a.connected, 5);
        assert_eq!(a.outgoing_bytes, 200);
        assert_eq!(a.incoming_messages, 6);
        assert_eq!(a.last_pong_time, Timestamp::from_unix(200));
        assert_eq!(a.last_ping_ms, 0.5);
        assert_eq!(a.max_ping_dur_ms, 9.0);
        assert_eq!(a.last_connect_time, Timestamp::from_unix(190));
        assert_eq!(a.collected_at, Timestamp::from_unix(200));
    }

    #[test]
    fn older_pong_keeps_ping() {
        let mut a = peer(1, 300, 2.0, 2.0);
        a.merge(&peer(1, 100, 7.0, 1.0));
        assert_eq!(a.last_ping_ms, 2.0);
        assert_eq!(a.last_pong_time, Timestamp::from_unix(300));
    }

    #[test]
    fn per_peer_maps_merge_recursively() {
        let mut a = peer(1, 100, 1.0, 1.0);
        a.by_destination.insert("node2".into(), peer(1, 100, 1.0, 3.0));

        let mut b = peer(1, 150, 1.0, 1.0);
        b.by_destination.insert("node2".into(), peer(2, 150, 0.2, 5.0));
        b.by_destination.insert("node3".into(), peer(4, 150, 0.1, 0.1));
        let mut inner = peer(1, 150, 1.0, 1.0);
        inner.by_caller.insert("node1".into(), peer(7, 150, 1.0, 1.0));
        b.by_caller.insert("node4".into(), inner);

        a.merge(&b);
        let node2 = &a.by_destination["node2"];
        assert_eq!(node2.connected, 3);
        assert_eq!(node2.max_ping_dur_ms, 5.0);
        assert_eq!(node2.last_ping_ms, 0.2);
        assert_eq!(a.by_destination["node3"].connected, 4);
        assert_eq!(a.by_caller["node4"].by_caller["node1"].connected, 7);
    }

    #[test]
    fn default_other_is_noop() {
        let mut a = peer(2, 100, 1.0, 2.0);
        a.by_caller.insert("x".into(), peer(1, 50, 1.0, 1.0));
        let before = a.clone();
        a.merge(&RpcMetrics::default());
        assert_eq!(a, before);
    }

    #[test]
    fn wire_names() {
        let json = r#"{"collectedAt":"2024-01-01T00:00:00Z","connected":2,"reconnectCount":1,
            "outQueue":4,"lastPingMS":0.3,"maxPingDurMS":1.2,
            "byDestination":{"n2:9000":{"connected":1}},"byCaller":null}"#;
        let m: RpcMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(m.reconnect_count, 1);
        assert_eq!(m.out_queue, 4);
        assert_eq!(m.max_ping_dur_ms, 1.2);
        assert_eq!(m.by_destination["n2:9000"].connected, 1);
        assert!(m.by_caller.is_empty());
    }
}
