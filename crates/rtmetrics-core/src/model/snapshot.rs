//! Metric bundles and the streaming envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::time::null_as_default;
use super::{
    BatchJobMetrics, CpuMetrics, DiskMetric, MemMetrics, NetMetrics, OsMetrics, RpcMetrics,
    RuntimeMetrics, ScannerMetrics, SiteResyncMetrics,
};
use crate::merge::{Merge, merge_slot, overwrite_by_key};
use crate::metric_type::MetricType;
use crate::node::{NodeInfo, NodeMetrics, node_errors};
use crate::options::MetricsOptions;

/// One optional accumulator per category.
///
/// A `None` slot means the category was not requested or not collected; it is
/// never used to mean "zero". The same type holds a single node's snapshot and
/// a running cluster aggregate.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct Metrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner: Option<ScannerMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<OsMetrics>,
    #[serde(rename = "batchJobs", skip_serializing_if = "Option::is_none")]
    pub batch_jobs: Option<BatchJobMetrics>,
    #[serde(rename = "siteResync", skip_serializing_if = "Option::is_none")]
    pub site_resync: Option<SiteResyncMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net: Option<NetMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem: Option<MemMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc: Option<RpcMetrics>,
    #[serde(rename = "go", skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeMetrics>,
}

impl Merge for Metrics {
    fn merge(&mut self, other: &Self) {
        merge_slot(&mut self.scanner, other.scanner.as_ref());
        merge_slot(&mut self.disk, other.disk.as_ref());
        merge_slot(&mut self.os, other.os.as_ref());
        merge_slot(&mut self.batch_jobs, other.batch_jobs.as_ref());
        merge_slot(&mut self.site_resync, other.site_resync.as_ref());
        merge_slot(&mut self.net, other.net.as_ref());
        merge_slot(&mut self.mem, other.mem.as_ref());
        merge_slot(&mut self.cpu, other.cpu.as_ref());
        merge_slot(&mut self.rpc, other.rpc.as_ref());
        merge_slot(&mut self.runtime, other.runtime.as_ref());
    }
}

impl Metrics {
    /// Mask of the categories present.
    pub fn types(&self) -> MetricType {
        let present = [
            (self.scanner.is_some(), MetricType::SCANNER),
            (self.disk.is_some(), MetricType::DISK),
            (self.os.is_some(), MetricType::OS),
            (self.batch_jobs.is_some(), MetricType::BATCH_JOBS),
            (self.site_resync.is_some(), MetricType::SITE_RESYNC),
            (self.net.is_some(), MetricType::NET),
            (self.mem.is_some(), MetricType::MEM),
            (self.cpu.is_some(), MetricType::CPU),
            (self.rpc.is_some(), MetricType::RPC),
            (self.runtime.is_some(), MetricType::RUNTIME),
        ];
        present
            .into_iter()
            .filter(|(is_set, _)| *is_set)
            .fold(MetricType::NONE, |acc, (_, t)| acc | t)
    }

    pub fn is_empty(&self) -> bool {
        self.types().is_empty()
    }

    /// Clears every category not selected by `types`.
    pub fn filter(&mut self, types: MetricType) {
        if !types.contains(MetricType::SCANNER) {
            self.scanner = None;
        }
        if !types.contains(MetricType::DISK) {
            self.disk = None;
        }
        if !types.contains(MetricType::OS) {
            self.os = None;
        }
        if !types.contains(MetricType::BATCH_JOBS) {
            self.batch_jobs = None;
        }
        if !types.contains(MetricType::SITE_RESYNC) {
            self.site_resync = None;
        }
        if !types.contains(MetricType::NET) {
            self.net = None;
        }
        if !types.contains(MetricType::MEM) {
            self.mem = None;
        }
        if !types.contains(MetricType::CPU) {
            self.cpu = None;
        }
        if !types.contains(MetricType::RPC) {
            self.rpc = None;
        }
        if !types.contains(MetricType::RUNTIME) {
            self.runtime = None;
        }
    }
}

/// Envelope sent on the metrics stream.
///
/// Once an envelope with `is_final` set has been sent, the stream carries
/// nothing more.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct RealtimeMetrics {
    /// Failures reported by producers that could only collect part of their data.
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub errors: Vec<String>,

    /// Nodes that contributed to this envelope, sorted.
    #[serde(deserialize_with = "null_as_default")]
    pub hosts: Vec<String>,

    pub aggregated: Metrics,

    /// Per-node metrics, only when requested with `by_host`.
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub by_host: BTreeMap<String, Metrics>,

    /// Per-drive metrics, only when requested with `by_disk`.
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub by_disk: BTreeMap<String, DiskMetric>,

    #[serde(rename = "final")]
    pub is_final: bool,
}

impl RealtimeMetrics {
    /// Folds `other` into `self`; `None` is a no-op.
    ///
    /// Errors accumulate as a multiset. Per-host and per-disk entries are
    /// inserted with last-writer-wins, which is a disjoint union when every
    /// node reports only itself. The host list stays sorted.
    pub fn merge(&mut self, other: Option<&RealtimeMetrics>) {
        let Some(other) = other else {
            return;
        };
        self.errors.extend(other.errors.iter().cloned());
        overwrite_by_key(&mut self.by_host, &other.by_host);
        overwrite_by_key(&mut self.by_disk, &other.by_disk);
        self.hosts.extend(other.hosts.iter().cloned());
        self.hosts.sort();
        self.aggregated.merge(&other.aggregated);
    }

    /// Builds the envelope a server emits for one node's reply.
    pub fn from_node(node: &NodeMetrics, opts: &MetricsOptions) -> Self {
        let mut aggregated = node.metrics.clone();
        aggregated.filter(opts.types);

        let mut out = RealtimeMetrics {
            errors: node_errors([node]),
            hosts: vec![node.addr().to_string()],
            ..Default::default()
        };
        if opts.by_host {
            out.by_host
                .insert(node.addr().to_string(), aggregated.clone());
        }
        if opts.by_disk {
            out.by_disk = node
                .by_disk
                .iter()
                .filter(|(disk, _)| opts.wants_disk(disk))
                .map(|(disk, metric)| (disk.clone(), metric.clone()))
                .collect();
        }
        out.aggregated = aggregated;
        out
    }

    /// Whether `host` contributed to this envelope.
    pub fn has_host(&self, host: &str) -> bool {
        self.hosts
            .binary_search_by(|h| h.as_str().cmp(host))
            .is_ok()
    }
}
