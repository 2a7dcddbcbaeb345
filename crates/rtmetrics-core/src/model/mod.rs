//! Snapshot data model.
//!
//! One module per metric category, each type owning its own merge rule,
//! plus the [`Metrics`] bundle and the [`RealtimeMetrics`] wire envelope.

mod disk;
mod jobs;
mod os;
mod resync;
mod rpc;
mod runtime;
mod scanner;
mod snapshot;
mod system;
mod time;
mod timed;

pub use disk::{DiskIoStats, DiskLastMinute, DiskMetric};
pub use jobs::{BatchJobMetrics, ExpirationInfo, JobMetric, KeyRotationInfo, ReplicateInfo};
pub use os::{OsLastMinute, OsMetrics};
pub use resync::SiteResyncMetrics;
pub use rpc::RpcMetrics;
pub use runtime::{Float64Histogram, RuntimeMetrics};
pub use scanner::{BucketScanInfo, ScannerLastMinute, ScannerMetrics};
pub use snapshot::{Metrics, RealtimeMetrics};
pub use system::{CpuMetrics, CpuTimes, LoadAvg, MemInfo, MemMetrics, NetDevLine, NetMetrics};
pub use time::Timestamp;
pub use timed::TimedAction;
