//! Realtime cluster metrics streaming and aggregation.
//!
//! Provides:
//! - `metric_type`: category bitmask used to select what gets collected
//! - `options`: request options and their query-string encoding
//! - `model`: per-category snapshot types and the `RealtimeMetrics` envelope
//! - `merge`: the reduction trait shared by every accumulator
//! - `timings`: latency summary (percentiles, stddev) over duration samples
//! - `node`: per-node address/error capability
//! - `stream`: framed decode loop over a live response body
//! - `transport`: seam between request options and the streaming body
//! - `aggregate`: single-consumer fan-in of several streams
//! - `cancel`: cooperative cancellation token
//! - `util`: duration text helpers

pub mod aggregate;
pub mod cancel;
pub mod error;
pub mod merge;
pub mod metric_type;
pub mod model;
pub mod node;
pub mod options;
pub mod stream;
pub mod timings;
pub mod transport;
pub mod util;

pub use aggregate::{ClusterAggregator, aggregate_streams};
pub use cancel::CancelToken;
pub use error::StreamError;
pub use merge::Merge;
pub use metric_type::MetricType;
pub use model::{Metrics, RealtimeMetrics, TimedAction, Timestamp};
pub use node::{NodeCommon, NodeInfo, NodeLatency, NodeMetrics};
pub use options::{METRICS_PATH, MetricsOptions, OptionsError};
pub use stream::{MetricsStream, StreamState, StreamSummary};
pub use timings::{TimeDurations, Timings};
pub use transport::{MetricsTransport, realtime_metrics};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
