//! Cluster-wide reduction of many metrics streams.
//!
//! Every decoder runs in its own task and forwards frames over a bounded
//! channel. A single consumer keeps the latest frame of each source and
//! performs all merges, so merges never run concurrently.

use std::collections::BTreeMap;
use std::fmt;

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::StreamError;
use crate::model::RealtimeMetrics;
use crate::node::{NodeInfo, NodeMetrics};
use crate::options::MetricsOptions;
use crate::stream::MetricsStream;

/// Frames buffered between decoders and the consumer.
const CHANNEL_DEPTH: usize = 64;

/// Running cluster view built from envelopes and node replies.
#[derive(Debug, Default)]
pub struct ClusterAggregator {
    view: RealtimeMetrics,
    frames: u64,
}

impl ClusterAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one envelope into the view. Its `final` flag is ignored.
    pub fn merge_envelope(&mut self, envelope: &RealtimeMetrics) {
        self.view.merge(Some(envelope));
        self.frames += 1;
    }

    /// Folds one node reply the way a server would emit it.
    ///
    /// Nodes excluded by `opts.hosts` are skipped.
    pub fn add_node(&mut self, node: &NodeMetrics, opts: &MetricsOptions) {
        if !opts.wants_host(node.addr()) {
            debug!(addr = node.addr(), "node not selected, skipping");
            return;
        }
        let envelope = RealtimeMetrics::from_node(node, opts);
        self.merge_envelope(&envelope);
    }

    /// Records a source that could not contribute.
    pub fn record_error(&mut self, source: &str, error: &dyn fmt::Display) {
        self.view.errors.push(format!("{}: {}", source, error));
    }

    /// Envelopes merged so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn snapshot(&self) -> &RealtimeMetrics {
        &self.view
    }

    pub fn into_inner(self) -> RealtimeMetrics {
        self.view
    }
}

enum Event {
    Frame { source: String, frame: RealtimeMetrics },
    Failed { source: String, error: StreamError },
}

/// Decodes every named source concurrently and merges them into one view.
///
/// Each frame a source sends replaces its previous one; the view is the
/// merge of the latest frame of every source, in source-name order. A
/// source that fails keeps its last good frame and is reported in
/// `errors` as `"<source>: <error>"`; the others keep going. Cancelling `cancel` stops every decoder and returns
/// [`StreamError::Cancelled`]. The returned view has `is_final` set.
pub async fn aggregate_streams<R>(
    sources: Vec<(String, R)>,
    cancel: &CancelToken,
) -> Result<RealtimeMetrics, StreamError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let source_count = sources.len();
    let (tx, mut rx) = mpsc::channel::<Event>(CHANNEL_DEPTH);
    let workers = CancelToken::new();

    let mut tasks = Vec::with_capacity(source_count);
    for (name, body) in sources {
        let tx = tx.clone();
        let token = workers.clone();
        tasks.push(tokio::spawn(async move {
            let mut stream = MetricsStream::new(body);
            loop {
                match stream.next(&token).await {
                    Ok(Some(frame)) => {
                        let event = Event::Frame {
                            source: name.clone(),
                            frame,
                        };
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => return,
                    Err(StreamError::Cancelled) => return,
                    Err(error) => {
                        let _ = tx.send(Event::Failed { source: name, error }).await;
                        return;
                    }
                }
            }
        }));
    }
    drop(tx);

    let mut latest: BTreeMap<String, RealtimeMetrics> = BTreeMap::new();
    let mut failures = Vec::new();
    let mut received = 0u64;
    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break Err(StreamError::Cancelled),
            event = rx.recv() => match event {
                Some(Event::Frame { source, frame }) => {
                    received += 1;
                    latest.insert(source, frame);
                }
                Some(Event::Failed { source, error }) => {
                    warn!(source = %source, error = %error, "metrics source failed");
                    failures.push((source, error));
                }
                None => break Ok(()),
            },
        }
    };

    // Unblock any sender before waiting on the workers.
    drop(rx);
    workers.cancel();
    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "metrics decoder task panicked");
        }
    }
    outcome?;

    let mut aggregator = ClusterAggregator::new();
    for frame in latest.values() {
        aggregator.merge_envelope(frame);
    }
    for (source, error) in &failures {
        aggregator.record_error(source, error);
    }
    let merged = aggregator.frames();
    let mut view = aggregator.into_inner();
    view.is_final = true;
    info!(
        sources = source_count,
        received,
        merged,
        errors = view.errors.len(),
        "cluster aggregation complete"
    );
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric_type::MetricType;
    use crate::model::{CpuMetrics, CpuTimes, Metrics};
    use crate::node::NodeCommon;
    use std::io::Cursor;
    use std::time::Duration;

    fn cpu_frame(host: &str, user: f64, is_final: bool) -> String {
        format!(
            r#"{{"hosts":["{}"],"aggregated":{{"cpu":{{"timesStat":{{"user":{}}},"cpuCount":4}}}},"final":{}}}"#,
            host, user, is_final
        )
    }

    fn source(name: &str, frames: &[String]) -> (String, Cursor<Vec<u8>>) {
        (name.to_string(), Cursor::new(frames.join("\n").into_bytes()))
    }

    fn user_time(view: &RealtimeMetrics) -> f64 {
        view.aggregated
            .cpu
            .as_ref()
            .and_then(|c| c.times_stat.as_ref())
            .map(|t| t.user)
            .unwrap_or_default()
    }

    // ============================================================
    // ClusterAggregator
    // ============================================================

    #[test]
    fn add_node_respects_host_filter() {
        let node = |addr: &str, user: f64| NodeMetrics {
            node: NodeCommon {
                addr: addr.into(),
                error: String::new(),
            },
            metrics: Metrics {
                cpu: Some(CpuMetrics {
                    times_stat: Some(CpuTimes {
                        user,
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        let opts = MetricsOptions {
            types: MetricType::CPU,
            hosts: vec!["node1".into(), "node2".into()],
            by_host: true,
            ..Default::default()
        };

        let mut agg = ClusterAggregator::new();
        agg.add_node(&node("node2", 150.0), &opts);
        agg.add_node(&node("node1", 100.0), &opts);
        agg.add_node(&node("node3", 999.0), &opts);

        assert_eq!(agg.frames(), 2);
        assert_eq!(agg.snapshot().hosts, vec!["node1", "node2"]);
        assert_eq!(user_time(agg.snapshot()), 250.0);
        assert_eq!(agg.snapshot().by_host.len(), 2);
    }

    #[test]
    fn record_error_formats_source() {
        let mut agg = ClusterAggregator::new();
        agg.record_error("node4", &StreamError::UnexpectedEof);
        let view = agg.into_inner();
        assert_eq!(view.errors, vec!["node4: stream ended before the final frame"]);
    }

    // ============================================================
    // aggregate_streams
    // ============================================================

    #[tokio::test]
    async fn merges_all_sources() {
        let sources = vec![
            source(
                "node1",
                &[r#"{"hosts":["node1"],"aggregated":{}}"#.to_string(), cpu_frame("node1", 100.0, true)],
            ),
            source("node2", &[cpu_frame("node2", 150.0, true)]),
        ];
        let cancel = CancelToken::new();
        let view = aggregate_streams(sources, &cancel).await.unwrap();

        assert!(view.is_final);
        assert!(view.errors.is_empty());
        assert_eq!(view.hosts, vec!["node1", "node2"]);
        assert_eq!(user_time(&view), 250.0);
        assert_eq!(view.aggregated.cpu.as_ref().unwrap().cpu_count, 8);
    }

    #[tokio::test]
    async fn repeated_samples_count_once_per_source() {
        let sample = |is_final: bool| {
            format!(
                r#"{{"hosts":["node1"],"aggregated":{{"disk":{{"n_disks":4}},"mem":{{"memInfo":{{"total":100}}}}}},"final":{}}}"#,
                is_final
            )
        };
        let sources = vec![source("node1", &[sample(false), sample(false), sample(true)])];
        let cancel = CancelToken::new();
        let view = aggregate_streams(sources, &cancel).await.unwrap();

        assert_eq!(view.hosts, vec!["node1"]);
        assert_eq!(view.aggregated.disk.as_ref().unwrap().n_disks, 4);
        assert_eq!(view.aggregated.mem.as_ref().unwrap().info.total, 100);
    }

    #[tokio::test]
    async fn failing_source_is_reported() {
        let mut truncated = cpu_frame("node2", 50.0, false);
        truncated.push_str(r#" {"hosts":["node2"],"aggre"#);
        let sources = vec![
            source("node1", &[cpu_frame("node1", 100.0, true)]),
            source("node2", &[truncated]),
        ];
        let cancel = CancelToken::new();
        let view = aggregate_streams(sources, &cancel).await.unwrap();

        assert_eq!(view.errors, vec!["node2: stream ended before the final frame"]);
        assert_eq!(user_time(&view), 150.0);
        assert!(view.is_final);
    }

    #[tokio::test]
    async fn no_sources_is_empty_final_view() {
        let cancel = CancelToken::new();
        let view = aggregate_streams(Vec::<(String, Cursor<Vec<u8>>)>::new(), &cancel)
            .await
            .unwrap();
        assert!(view.is_final);
        assert!(view.aggregated.is_empty());
    }

    #[tokio::test]
    async fn cancel_stops_all_decoders() {
        let (reader, writer) = tokio::io::duplex(64);
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = aggregate_streams(vec![("stalled".to_string(), reader)], &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        drop(writer);
    }
}
