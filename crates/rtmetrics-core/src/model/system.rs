//! Host-level system metrics: network interfaces, memory and CPU.
//!
//! These are node snapshots read from the OS by each producer. Merged across
//! nodes they describe cluster-wide capacity and load, so every counter and
//! gauge is summed rather than averaged.

use serde::{Deserialize, Serialize};

use super::time::{Timestamp, is_zero_u64};
use crate::merge::{Merge, merge_slot};
use crate::node::{NodeCommon, NodeInfo};

/// Interface counters as exposed by `/proc/net/dev`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct NetDevLine {
    /// Interface name (eth0, lo, ...).
    pub name: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub rx_dropped: u64,
    pub rx_fifo: u64,
    pub rx_frame: u64,
    pub rx_compressed: u64,
    pub rx_multicast: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_dropped: u64,
    pub tx_fifo: u64,
    pub tx_collisions: u64,
    pub tx_carrier: u64,
    pub tx_compressed: u64,
}

impl Merge for NetDevLine {
    fn merge(&mut self, other: &Self) {
        if self.name.is_empty() {
            self.name.clone_from(&other.name);
        }
        self.rx_bytes += other.rx_bytes;
        self.rx_packets += other.rx_packets;
        self.rx_errors += other.rx_errors;
        self.rx_dropped += other.rx_dropped;
        self.rx_fifo += other.rx_fifo;
        self.rx_frame += other.rx_frame;
        self.rx_compressed += other.rx_compressed;
        self.rx_multicast += other.rx_multicast;
        self.tx_bytes += other.tx_bytes;
        self.tx_packets += other.tx_packets;
        self.tx_errors += other.tx_errors;
        self.tx_dropped += other.tx_dropped;
        self.tx_fifo += other.tx_fifo;
        self.tx_collisions += other.tx_collisions;
        self.tx_carrier += other.tx_carrier;
        self.tx_compressed += other.tx_compressed;
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct NetMetrics {
    #[serde(rename = "collected")]
    pub collected_at: Timestamp,

    #[serde(rename = "interfaceName")]
    pub interface_name: String,

    #[serde(rename = "netstats")]
    pub net_stats: NetDevLine,
}

impl Merge for NetMetrics {
    fn merge(&mut self, other: &Self) {
        self.collected_at.keep_latest(other.collected_at);
        if self.interface_name.is_empty() {
            self.interface_name.clone_from(&other.interface_name);
        }
        self.net_stats.merge(&other.net_stats);
    }
}

/// Memory figures in bytes.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MemInfo {
    #[serde(flatten)]
    pub node: NodeCommon,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub total: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub used: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub free: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub available: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub shared: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub cache: u64,
    #[serde(rename = "buffer", skip_serializing_if = "is_zero_u64")]
    pub buffers: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub swap_space_total: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub swap_space_free: u64,
    /// Cgroup memory limit, if any.
    #[serde(rename = "mem_limit", skip_serializing_if = "is_zero_u64")]
    pub limit: u64,
}

impl NodeInfo for MemInfo {
    fn node(&self) -> &NodeCommon {
        &self.node
    }

    fn node_mut(&mut self) -> &mut NodeCommon {
        &mut self.node
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MemMetrics {
    #[serde(rename = "collected")]
    pub collected_at: Timestamp,

    #[serde(rename = "memInfo")]
    pub info: MemInfo,
}

impl Merge for MemMetrics {
    fn merge(&mut self, other: &Self) {
        self.collected_at.keep_latest(other.collected_at);
        let (m, o) = (&mut self.info, &other.info);
        if m.node.addr.is_empty() {
            m.node.addr.clone_from(&o.node.addr);
        }
        if m.node.error.is_empty() {
            m.node.error.clone_from(&o.node.error);
        }
        m.total += o.total;
        m.used += o.used;
        m.free += o.free;
        m.available += o.available;
        m.shared += o.shared;
        m.cache += o.cache;
        m.buffers += o.buffers;
        m.swap_space_total += o.swap_space_total;
        m.swap_space_free += o.swap_space_free;
        m.limit += o.limit;
    }
}

/// Cumulative CPU time per state, in seconds.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct CpuTimes {
    pub cpu: String,
    pub user: f64,
    pub system: f64,
    pub idle: f64,
    pub nice: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
    pub guest: f64,
    #[serde(rename = "guestNice")]
    pub guest_nice: f64,
}

impl Merge for CpuTimes {
    fn merge(&mut self, other: &Self) {
        if self.cpu.is_empty() {
            self.cpu.clone_from(&other.cpu);
        }
        self.user += other.user;
        self.system += other.system;
        self.idle += other.idle;
        self.nice += other.nice;
        self.iowait += other.iowait;
        self.irq += other.irq;
        self.softirq += other.softirq;
        self.steal += other.steal;
        self.guest += other.guest;
        self.guest_nice += other.guest_nice;
    }
}

/// Load averages.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

impl Merge for LoadAvg {
    fn merge(&mut self, other: &Self) {
        self.load1 += other.load1;
        self.load5 += other.load5;
        self.load15 += other.load15;
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct CpuMetrics {
    #[serde(rename = "collected")]
    pub collected_at: Timestamp,

    #[serde(rename = "timesStat")]
    pub times_stat: Option<CpuTimes>,

    #[serde(rename = "loadStat")]
    pub load_stat: Option<LoadAvg>,

    #[serde(rename = "cpuCount")]
    pub cpu_count: i64,
}

impl Merge for CpuMetrics {
    fn merge(&mut self, other: &Self) {
        self.collected_at.keep_latest(other.collected_at);
        merge_slot(&mut self.times_stat, other.times_stat.as_ref());
        // Summed, not averaged: the merged view is the load of the whole cluster.
        merge_slot(&mut self.load_stat, other.load_stat.as_ref());
        self.cpu_count += other.cpu_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu(user: f64, system: f64, load1: f64) -> CpuMetrics {
        CpuMetrics {
            collected_at: Timestamp::from_unix(100),
            times_stat: Some(CpuTimes {
                user,
                system,
                ..Default::default()
            }),
            load_stat: Some(LoadAvg {
                load1,
                load5: load1 / 2.0,
                load15: load1 / 4.0,
            }),
            cpu_count: 8,
        }
    }

    #[test]
    fn cpu_times_and_load_sum_across_nodes() {
        let mut agg = cpu(100.0, 50.0, 1.0);
        agg.merge(&cpu(150.0, 75.0, 2.0));

        let times = agg.times_stat.as_ref().unwrap();
        assert_eq!(times.user, 250.0);
        assert_eq!(times.system, 125.0);
        let load = agg.load_stat.unwrap();
        assert_eq!(load.load1, 3.0);
        assert_eq!(load.load5, 1.5);
        assert_eq!(load.load15, 0.75);
        assert_eq!(agg.cpu_count, 16);
    }

    #[test]
    fn cpu_merge_with_missing_times_keeps_receiver() {
        let mut agg = cpu(10.0, 5.0, 0.5);
        agg.merge(&CpuMetrics::default());
        assert_eq!(agg, cpu(10.0, 5.0, 0.5));
    }

    #[test]
    fn net_counters_sum() {
        let line = NetDevLine {
            name: "eth0".into(),
            rx_bytes: 1000,
            tx_bytes: 500,
            rx_errors: 1,
            tx_carrier: 2,
            rx_multicast: 3,
            ..Default::default()
        };
        let mut agg = NetMetrics::default();
        let node = NetMetrics {
            collected_at: Timestamp::from_unix(5),
            interface_name: "eth0".into(),
            net_stats: line,
        };
        agg.merge(&node);
        agg.merge(&node);
        assert_eq!(agg.interface_name, "eth0");
        assert_eq!(agg.net_stats.rx_bytes, 2000);
        assert_eq!(agg.net_stats.tx_bytes, 1000);
        assert_eq!(agg.net_stats.rx_errors, 2);
        assert_eq!(agg.net_stats.tx_carrier, 4);
        assert_eq!(agg.net_stats.rx_multicast, 6);
    }

    #[test]
    fn mem_capacity_sums() {
        let node = MemMetrics {
            collected_at: Timestamp::from_unix(1),
            info: MemInfo {
                total: 64 << 30,
                available: 32 << 30,
                swap_space_total: 8 << 30,
                swap_space_free: 4 << 30,
                limit: 48 << 30,
                ..Default::default()
            },
        };
        let mut agg = MemMetrics::default();
        agg.merge(&node);
        agg.merge(&node);
        assert_eq!(agg.info.total, 128 << 30);
        assert_eq!(agg.info.available, 64 << 30);
        assert_eq!(agg.info.swap_space_total, 16 << 30);
        assert_eq!(agg.info.swap_space_free, 8 << 30);
        assert_eq!(agg.info.limit, 96 << 30);
    }

    #[test]
    fn mem_merge_into_default_reproduces_other() {
        let node = MemMetrics {
            collected_at: Timestamp::from_unix(7),
            info: MemInfo {
                node: NodeCommon {
                    addr: "node1:9000".into(),
                    error: "swap unavailable".into(),
                },
                total: 1024,
                used: 512,
                ..Default::default()
            },
        };
        let mut agg = MemMetrics::default();
        agg.merge(&node);
        assert_eq!(agg, node);

        // The first node to report keeps its address.
        let mut other = node.clone();
        other.info.node.addr = "node2:9000".into();
        agg.merge(&other);
        assert_eq!(agg.info.addr(), "node1:9000");
        assert_eq!(agg.info.total, 2048);
    }

    #[test]
    fn merging_default_is_a_no_op() {
        let mut net = NetMetrics {
            collected_at: Timestamp::from_unix(5),
            interface_name: "eth0".into(),
            net_stats: NetDevLine {
                name: "eth0".into(),
                rx_bytes: 10,
                tx_bytes: 20,
                ..Default::default()
            },
        };
        let before = net.clone();
        net.merge(&NetMetrics::default());
        assert_eq!(net, before);

        let mut mem = MemMetrics {
            collected_at: Timestamp::from_unix(5),
            info: MemInfo {
                total: 64,
                limit: 32,
                ..Default::default()
            },
        };
        let before = mem.clone();
        mem.merge(&MemMetrics::default());
        assert_eq!(mem, before);
    }

    #[test]
    fn mem_info_carries_node_fields() {
        let json = r#"{"collected":"2024-01-01T00:00:00Z","memInfo":{"addr":"node1:9000","total":1024,"buffer":8,"mem_limit":512}}"#;
        let m: MemMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(m.info.addr(), "node1:9000");
        assert!(m.info.error().is_none());
        assert_eq!(m.info.total, 1024);
        assert_eq!(m.info.buffers, 8);
        assert_eq!(m.info.limit, 512);
    }

    #[test]
    fn cpu_wire_names() {
        let json = r#"{"collected":"2024-01-01T00:00:00Z","timesStat":{"cpu":"cpu-total","user":1.5,"guestNice":0.25},"loadStat":{"load1":0.5,"load5":0.25,"load15":0.125},"cpuCount":4}"#;
        let c: CpuMetrics = serde_json::from_str(json).unwrap();
        let times = c.times_stat.unwrap();
        assert_eq!(times.cpu, "cpu-total");
        assert_eq!(times.guest_nice, 0.25);
        assert_eq!(c.load_stat.unwrap().load15, 0.125);
        assert_eq!(c.cpu_count, 4);
    }
}
