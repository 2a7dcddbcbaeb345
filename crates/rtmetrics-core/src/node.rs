//! Per-node address and error capability.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{DiskMetric, Metrics};
use crate::timings::{TimeDurations, Timings};

/// Fields every per-node reply carries.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct NodeCommon {
    pub addr: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Anything that knows which node it came from and whether that node failed.
pub trait NodeInfo {
    fn node(&self) -> &NodeCommon;
    fn node_mut(&mut self) -> &mut NodeCommon;

    fn addr(&self) -> &str {
        &self.node().addr
    }

    /// The node's error, `None` when it reported none.
    fn error(&self) -> Option<&str> {
        let err = self.node().error.as_str();
        (!err.is_empty()).then_some(err)
    }

    fn set_addr(&mut self, addr: impl Into<String>)
    where
        Self: Sized,
    {
        self.node_mut().addr = addr.into();
    }

    fn set_error(&mut self, error: impl Into<String>)
    where
        Self: Sized,
    {
        self.node_mut().error = error.into();
    }
}

impl NodeInfo for NodeCommon {
    fn node(&self) -> &NodeCommon {
        self
    }

    fn node_mut(&mut self) -> &mut NodeCommon {
        self
    }
}

/// One node's reply to a metrics collection round.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct NodeMetrics {
    #[serde(flatten)]
    pub node: NodeCommon,
    pub metrics: Metrics,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub by_disk: BTreeMap<String, DiskMetric>,
}

impl NodeInfo for NodeMetrics {
    fn node(&self) -> &NodeCommon {
        &self.node
    }

    fn node_mut(&mut self) -> &mut NodeCommon {
        &mut self.node
    }
}

/// Latency summary measured against one node.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct NodeLatency {
    #[serde(flatten)]
    pub node: NodeCommon,
    pub timings: Timings,
}

impl NodeLatency {
    pub fn measure(addr: impl Into<String>, samples: impl IntoIterator<Item = Duration>) -> Self {
        let mut durations: TimeDurations = samples.into_iter().collect();
        NodeLatency {
            node: NodeCommon {
                addr: addr.into(),
                error: String::new(),
            },
            timings: durations.measure(),
        }
    }
}

impl NodeInfo for NodeLatency {
    fn node(&self) -> &NodeCommon {
        &self.node
    }

    fn node_mut(&mut self) -> &mut NodeCommon {
        &mut self.node
    }
}

/// `"addr: error"` for every node that reported an error, in input order.
pub fn node_errors<'a, T>(nodes: impl IntoIterator<Item = &'a T>) -> Vec<String>
where
    T: NodeInfo + 'a,
{
    nodes
        .into_iter()
        .filter_map(|n| n.error().map(|e| format!("{}: {}", n.addr(), e)))
        .collect()
}
