//! Per-connection handler
//!
//! ```text
//! Open ──► Reading ──► Closed
//!             │  ▲
//!             └──┘ one line at a time
//! ```
//!
//! A handler reads newline-delimited lines until the peer closes the
//! connection or a read fails. Lines are classified strictly in arrival
//! order. A line longer than the configured maximum is a read error for this
//! connection only. Handlers are never restarted.

use crate::classifier::LineClassifier;
use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tracing::{debug, info, trace, warn};

/// Lifecycle state of a connection handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, not yet reading
    Open,
    /// Reading and classifying lines
    Reading,
    /// Terminal
    Closed,
}

/// Why a connection was closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the connection cleanly
    Eof,
    /// A line exceeded the maximum length
    LineTooLong {
        /// Configured limit in bytes
        limit: usize,
    },
    /// The socket returned an error
    ReadError(String),
}

/// What happened on a connection, reported when it closes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSummary {
    /// Remote address (if known)
    pub peer: Option<SocketAddr>,
    /// Number of lines classified
    pub lines: u64,
    /// Number of verdicts emitted
    pub verdicts: u64,
    /// Why the connection ended
    pub reason: CloseReason,
}

/// Reads and classifies the lines of one connection
pub struct ConnectionHandler {
    classifier: Arc<LineClassifier>,
    peer: Option<SocketAddr>,
    max_line_bytes: usize,
    state: ConnectionState,
}

impl ConnectionHandler {
    /// Create a handler for a freshly accepted connection
    pub fn new(
        classifier: Arc<LineClassifier>,
        peer: Option<SocketAddr>,
        max_line_bytes: usize,
    ) -> Self {
        Self {
            classifier,
            peer,
            max_line_bytes,
            state: ConnectionState::Open,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Run the handler to completion
    ///
    /// Consumes the handler; the returned summary describes the closed
    /// connection.
    pub async fn run<R: AsyncRead + Unpin>(mut self, reader: R) -> ConnectionSummary {
        let peer = peer_label(self.peer);
        info!(peer = %peer, "Connection opened");

        self.state = ConnectionState::Reading;

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut lines = 0u64;
        let mut verdicts = 0u64;

        let reason = loop {
            match read_line(&mut reader, &mut buf, self.max_line_bytes).await {
                Ok(false) => break CloseReason::Eof,
                Ok(true) => {
                    trace!(peer = %peer, line = %String::from_utf8_lossy(&buf), "Log line received");
                    let emitted = self.classifier.classify_from(self.peer, &buf).await;
                    lines += 1;
                    verdicts += emitted.len() as u64;
                }
                Err(Error::LineTooLong { limit }) => {
                    warn!(peer = %peer, limit, "Line exceeds maximum length, closing connection");
                    break CloseReason::LineTooLong { limit };
                }
                Err(e) => {
                    warn!(peer = %peer, "Error reading data: {}", e);
                    break CloseReason::ReadError(e.to_string());
                }
            }
        };

        self.state = ConnectionState::Closed;
        debug!(peer = %peer, state = ?self.state, "Handler finished");
        info!(peer = %peer, lines, verdicts, reason = ?reason, "Connection closed");

        ConnectionSummary {
            peer: self.peer,
            lines,
            verdicts,
            reason,
        }
    }
}

/// Read one line into `buf`, without its `\n` or `\r\n` terminator
///
/// Returns `Ok(false)` at EOF. A final unterminated line is returned as a
/// normal line.
async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_line_bytes: usize,
) -> Result<bool> {
    buf.clear();

    // Headroom for a `\r\n` terminator; the limit applies to the content
    let limit = max_line_bytes as u64 + 2;
    let read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(false);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }

    if buf.len() > max_line_bytes {
        return Err(Error::LineTooLong {
            limit: max_line_bytes,
        });
    }

    Ok(true)
}

fn peer_label(peer: Option<SocketAddr>) -> String {
    peer.map(|p| p.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn lines_of(input: &[u8], max: usize) -> (Vec<Vec<u8>>, Option<Error>) {
        let mut reader = BufReader::new(input);
        let mut buf = Vec::new();
        let mut out = Vec::new();
        loop {
            match read_line(&mut reader, &mut buf, max).await {
                Ok(true) => out.push(buf.clone()),
                Ok(false) => return (out, None),
                Err(e) => return (out, Some(e)),
            }
        }
    }

    #[tokio::test]
    async fn test_read_line_strips_terminators() {
        let (lines, err) = lines_of(b"one\ntwo\r\n\nthree", 64).await;
        assert!(err.is_none());
        assert_eq!(
            lines,
            vec![b"one".to_vec(), b"two".to_vec(), b"".to_vec(), b"three".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_read_line_exact_limit_accepted() {
        let (lines, err) = lines_of(b"abcd\nxy\n", 4).await;
        assert!(err.is_none());
        assert_eq!(lines, vec![b"abcd".to_vec(), b"xy".to_vec()]);
    }

    #[tokio::test]
    async fn test_read_line_exact_limit_with_crlf_accepted() {
        let (lines, err) = lines_of(b"abcd\r\nxy\n", 4).await;
        assert!(err.is_none());
        assert_eq!(lines, vec![b"abcd".to_vec(), b"xy".to_vec()]);
    }

    #[tokio::test]
    async fn test_read_line_one_over_limit_with_crlf_rejected() {
        let (lines, err) = lines_of(b"abcde\r\n", 4).await;
        assert!(lines.is_empty());
        assert!(matches!(err, Some(Error::LineTooLong { limit: 4 })));
    }

    #[tokio::test]
    async fn test_read_line_over_limit_rejected() {
        let (lines, err) = lines_of(b"ok\nabcde\nnever\n", 4).await;
        assert_eq!(lines, vec![b"ok".to_vec()]);
        assert!(matches!(err, Some(Error::LineTooLong { limit: 4 })));
    }

    #[tokio::test]
    async fn test_unterminated_over_limit_rejected() {
        let (_, err) = lines_of(b"abcdefgh", 4).await;
        assert!(matches!(err, Some(Error::LineTooLong { limit: 4 })));
    }
}
