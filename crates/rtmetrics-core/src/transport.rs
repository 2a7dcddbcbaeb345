//! Seam between request options and a streaming response body.

use std::future::Future;
use std::io;

use tokio::io::AsyncRead;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::StreamError;
use crate::model::RealtimeMetrics;
use crate::options::{METRICS_PATH, MetricsOptions};
use crate::stream::{MetricsStream, StreamSummary};

/// Opens the body of a metrics request.
///
/// Implementations own connection setup and request signing; the body they
/// return is read until the final frame.
pub trait MetricsTransport {
    type Body: AsyncRead + Unpin + Send;

    fn open(&self, path: &str, query: &str) -> impl Future<Output = io::Result<Self::Body>> + Send;
}

/// Requests a metrics stream and feeds every frame to `sink`.
pub async fn realtime_metrics<T, F>(
    transport: &T,
    opts: &MetricsOptions,
    cancel: &CancelToken,
    sink: F,
) -> Result<StreamSummary, StreamError>
where
    T: MetricsTransport,
    F: FnMut(RealtimeMetrics),
{
    let query = opts.query_string();
    debug!(path = METRICS_PATH, query = %query, "opening metrics stream");

    let body = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(StreamError::Cancelled),
        body = transport.open(METRICS_PATH, &query) => body?,
    };
    MetricsStream::new(body).run(cancel, sink).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric_type::MetricType;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Serves a fixed body and remembers what was asked for.
    struct Canned {
        body: &'static str,
        requests: Mutex<Vec<(String, String)>>,
    }

    impl Canned {
        fn new(body: &'static str) -> Self {
            Canned {
                body,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl MetricsTransport for Canned {
        type Body = Cursor<&'static [u8]>;

        fn open(&self, path: &str, query: &str) -> impl Future<Output = io::Result<Self::Body>> + Send {
            self.requests
                .lock()
                .unwrap()
                .push((path.to_string(), query.to_string()));
            let body = Cursor::new(self.body.as_bytes());
            async move { Ok(body) }
        }
    }

    struct Refused;

    impl MetricsTransport for Refused {
        type Body = Cursor<&'static [u8]>;

        fn open(&self, _: &str, _: &str) -> impl Future<Output = io::Result<Self::Body>> + Send {
            async { Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")) }
        }
    }

    #[tokio::test]
    async fn streams_frames_for_options() {
        let transport = Canned::new(
            r#"{"hosts":["n1"],"aggregated":{"cpu":{}}}
               {"hosts":["n1"],"aggregated":{"cpu":{}},"final":true}"#,
        );
        let opts = MetricsOptions {
            types: MetricType::CPU,
            n: 2,
            ..Default::default()
        };
        let cancel = CancelToken::new();
        let mut frames = Vec::new();
        let summary = realtime_metrics(&transport, &opts, &cancel, |f| frames.push(f))
            .await
            .unwrap();

        assert_eq!(summary.frames, 2);
        assert!(frames[1].is_final);
        let requests = transport.requests.lock().unwrap();
        assert_eq!(
            requests.as_slice(),
            &[(
                METRICS_PATH.to_string(),
                "types=128&n=2&interval=1s".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn open_failure_is_io_error() {
        let cancel = CancelToken::new();
        let err = realtime_metrics(&Refused, &MetricsOptions::default(), &cancel, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::Io(ref e) if e.kind() == io::ErrorKind::ConnectionRefused));
    }

    #[tokio::test]
    async fn cancelled_before_open() {
        let transport = Canned::new(r#"{"final":true}"#);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = realtime_metrics(&transport, &MetricsOptions::default(), &cancel, |_| {})
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
