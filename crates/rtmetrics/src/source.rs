//! Recorded or piped streams standing in for a live server.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::io::{AsyncRead, BufReader};
use tracing::debug;

use rtmetrics_core::MetricsTransport;

/// Boxed body shared by every input kind.
pub type Body = Pin<Box<dyn AsyncRead + Send>>;

/// `-` reads stdin; anything else is a file path.
pub fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

pub async fn open_input(path: &Path) -> io::Result<Body> {
    if is_stdin(path) {
        return Ok(Box::pin(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
    })?;
    Ok(Box::pin(BufReader::new(file)))
}

/// Label used for a source in logs and error lists.
pub fn source_name(path: &Path) -> String {
    if is_stdin(path) {
        return "stdin".to_string();
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Replays a recorded stream as if it were the server's response.
pub struct FileTransport {
    input: PathBuf,
}

impl FileTransport {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        FileTransport {
            input: input.into(),
        }
    }
}

impl MetricsTransport for FileTransport {
    type Body = Body;

    fn open(&self, path: &str, query: &str) -> impl Future<Output = io::Result<Body>> + Send {
        debug!(input = %self.input.display(), path, query, "replaying recorded stream");
        let input = self.input.clone();
        async move { open_input(&input).await }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtmetrics_core::{CancelToken, MetricsOptions, realtime_metrics};

    #[test]
    fn names_sources() {
        assert_eq!(source_name(Path::new("-")), "stdin");
        assert_eq!(source_name(Path::new("/var/log/node1.json")), "node1");
        assert_eq!(source_name(Path::new("node2")), "node2");
    }

    #[tokio::test]
    async fn missing_file_names_the_path() {
        let err = open_input(Path::new("/nonexistent/rtmetrics/node.json"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("/nonexistent/rtmetrics/node.json"));
    }

    #[tokio::test]
    async fn replays_recorded_file() {
        let path = std::env::temp_dir().join(format!("rtmetrics-replay-{}.json", std::process::id()));
        std::fs::write(
            &path,
            "{\"hosts\":[\"n1\"],\"aggregated\":{}}\n{\"hosts\":[\"n1\"],\"aggregated\":{},\"final\":true}\n",
        )
        .unwrap();

        let cancel = CancelToken::new();
        let summary = realtime_metrics(
            &FileTransport::new(&path),
            &MetricsOptions::default(),
            &cancel,
            |_| {},
        )
        .await
        .unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(summary.frames, 2);
    }
}
