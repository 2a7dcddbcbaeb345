//! Framed decode loop over a live metrics response body.
//!
//! The body is a sequence of whitespace-delimited JSON `RealtimeMetrics`
//! objects. Frames are handed out one at a time; the stream ends after the
//! first frame with `final` set. Ending anywhere else is an error.
//!
//! Bytes are scanned once as they arrive. A frame is only handed to
//! `serde_json` after its outermost object has closed.

use serde::de::Error as _;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::StreamError;
use crate::model::RealtimeMetrics;

/// Bytes requested from the body per read.
const READ_CHUNK: usize = 16 * 1024;

/// Default upper bound on the encoded size of one frame.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Lifecycle of a [`MetricsStream`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    Done,
    Failed,
    Cancelled,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StreamState::Done | StreamState::Failed | StreamState::Cancelled
        )
    }
}

/// Outcome of a completed [`MetricsStream::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct StreamSummary {
    /// Frames handed to the sink, the final one included.
    pub frames: u64,
}

/// Scan state over the buffered bytes of the frame being read.
#[derive(Debug, Default)]
struct FrameScan {
    /// Bytes of the buffer already scanned.
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl FrameScan {
    /// Scans bytes not seen yet and returns the end of the frame once its
    /// outermost object or array closes.
    fn advance(&mut self, buf: &[u8]) -> Option<usize> {
        let start = self.pos;
        for (i, &b) in buf[start..].iter().enumerate() {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                continue;
            }
            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        self.pos = start + i + 1;
                        return Some(self.pos);
                    }
                }
                _ => {}
            }
        }
        self.pos = buf.len();
        None
    }
}

/// Decoder that owns a streaming body.
pub struct MetricsStream<R> {
    body: Option<R>,
    buf: Vec<u8>,
    scan: FrameScan,
    max_frame: usize,
    state: StreamState,
    frames: u64,
}

impl<R: AsyncRead + Unpin> MetricsStream<R> {
    pub fn new(body: R) -> Self {
        MetricsStream {
            body: Some(body),
            buf: Vec::new(),
            scan: FrameScan::default(),
            max_frame: MAX_FRAME_BYTES,
            state: StreamState::Idle,
            frames: 0,
        }
    }

    /// Caps the encoded size of a single frame. Larger frames fail the
    /// stream with a decode error.
    pub fn with_max_frame(mut self, bytes: usize) -> Self {
        self.max_frame = bytes;
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Frames decoded so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Waits for the next frame.
    ///
    /// Returns `Ok(None)` once the stream has reached any terminal state.
    /// Cancellation wins over a frame that becomes ready at the same time.
    pub async fn next(
        &mut self,
        cancel: &CancelToken,
    ) -> Result<Option<RealtimeMetrics>, StreamError> {
        match self.state {
            StreamState::Done | StreamState::Failed | StreamState::Cancelled => return Ok(None),
            StreamState::Idle => {
                debug!("metrics stream started");
                self.state = StreamState::Streaming;
            }
            StreamState::Streaming => {}
        }

        let result = if cancel.is_cancelled() {
            Err(StreamError::Cancelled)
        } else {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(StreamError::Cancelled),
                frame = self.read_frame() => frame,
            }
        };

        match result {
            Ok(frame) => {
                self.frames += 1;
                if frame.is_final {
                    info!(frames = self.frames, "metrics stream complete");
                    self.finish(StreamState::Done);
                }
                Ok(Some(frame))
            }
            Err(StreamError::Cancelled) => {
                debug!(frames = self.frames, "metrics stream cancelled");
                self.finish(StreamState::Cancelled);
                Err(StreamError::Cancelled)
            }
            Err(e) => {
                warn!(frames = self.frames, error = %e, "metrics stream failed");
                self.finish(StreamState::Failed);
                Err(e)
            }
        }
    }

    /// Hands every frame to `sink` until the final one.
    ///
    /// `sink` runs synchronously between reads; cancelling from inside it
    /// stops the stream before the next frame is read.
    pub async fn run<F>(
        mut self,
        cancel: &CancelToken,
        mut sink: F,
    ) -> Result<StreamSummary, StreamError>
    where
        F: FnMut(RealtimeMetrics),
    {
        while let Some(frame) = self.next(cancel).await? {
            sink(frame);
        }
        Ok(StreamSummary {
            frames: self.frames,
        })
    }

    async fn read_frame(&mut self) -> Result<RealtimeMetrics, StreamError> {
        loop {
            if let Some(frame) = self.decode_buffered()? {
                return Ok(frame);
            }
            let Some(body) = self.body.as_mut() else {
                return Err(StreamError::UnexpectedEof);
            };
            self.buf.reserve(READ_CHUNK);
            if body.read_buf(&mut self.buf).await? == 0 {
                return Err(StreamError::UnexpectedEof);
            }
        }
    }

    /// Decodes one complete frame from the buffer, if there is one.
    fn decode_buffered(&mut self) -> Result<Option<RealtimeMetrics>, StreamError> {
        if self.scan.pos == 0 {
            let start = self
                .buf
                .iter()
                .position(|b| !b.is_ascii_whitespace())
                .unwrap_or(self.buf.len());
            self.buf.drain(..start);
            match self.buf.first() {
                None => return Ok(None),
                Some(b'{' | b'[') => {}
                Some(&b) => {
                    return Err(StreamError::Decode(serde_json::Error::custom(format!(
                        "expected a metrics object, found {:?}",
                        char::from(b)
                    ))));
                }
            }
        }

        let end = self.scan.advance(&self.buf);
        if self.scan.pos > self.max_frame {
            return Err(StreamError::Decode(serde_json::Error::custom(format!(
                "frame exceeds {} bytes",
                self.max_frame
            ))));
        }
        let Some(end) = end else {
            return Ok(None);
        };
        let frame = serde_json::from_slice(&self.buf[..end]);
        self.buf.drain(..end);
        self.scan = FrameScan::default();
        Ok(Some(frame?))
    }

    fn finish(&mut self, state: StreamState) {
        self.state = state;
        self.body = None;
        self.buf = Vec::new();
        self.scan = FrameScan::default();
    }
}
