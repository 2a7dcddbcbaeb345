//! Errors surfaced by the streaming decoder.

use std::io;

/// Why a metrics stream stopped before its final frame.
#[derive(Debug)]
pub enum StreamError {
    /// Reading the response body failed.
    Io(io::Error),
    /// A frame was not a valid envelope.
    Decode(serde_json::Error),
    /// The body ended before a frame marked final.
    UnexpectedEof,
    /// The caller cancelled the stream.
    Cancelled,
}

impl StreamError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StreamError::Cancelled)
    }

    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, StreamError::UnexpectedEof)
    }
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Io(e) => write!(f, "I/O error: {}", e),
            StreamError::Decode(e) => write!(f, "Decode error: {}", e),
            StreamError::UnexpectedEof => write!(f, "stream ended before the final frame"),
            StreamError::Cancelled => write!(f, "stream cancelled"),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::Io(e) => Some(e),
            StreamError::Decode(e) => Some(e),
            StreamError::UnexpectedEof | StreamError::Cancelled => None,
        }
    }
}

impl From<io::Error> for StreamError {
    fn from(e: io::Error) -> Self {
        StreamError::Io(e)
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(e: serde_json::Error) -> Self {
        StreamError::Decode(e)
    }
}
