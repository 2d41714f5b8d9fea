// # Verdict Sink Trait
//
// Defines where classification results go.
//
// The core records each verdict as soon as it is produced and keeps no copy.
// Formatting, shipping and alerting belong to the sink.

use chrono::{DateTime, Utc};
use std::net::{Ipv4Addr, SocketAddr};

/// The outcome of classifying one validated address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// The classified address
    pub address: Ipv4Addr,
    /// Whether the address is considered dangerous
    pub dangerous: bool,
    /// When the verdict was produced
    pub observed_at: DateTime<Utc>,
    /// True if `dangerous` came from the failure policy instead of the store
    pub fallback: bool,
    /// Remote end of the connection the line arrived on (if known)
    pub peer: Option<SocketAddr>,
}

impl Verdict {
    /// Create a verdict stamped with the current time
    pub fn new(address: Ipv4Addr, dangerous: bool, fallback: bool) -> Self {
        Self {
            address,
            dangerous,
            observed_at: Utc::now(),
            fallback,
            peer: None,
        }
    }

    /// Attach the originating peer address
    pub fn with_peer(mut self, peer: Option<SocketAddr>) -> Self {
        self.peer = peer;
        self
    }

    /// Timestamp rendered in RFC 1123 form (e.g. "Mon, 02 Jan 2006 15:04:05 UTC")
    pub fn timestamp_rfc1123(&self) -> String {
        self.observed_at
            .format("%a, %d %b %Y %H:%M:%S UTC")
            .to_string()
    }
}

/// Trait for verdict sink implementations
///
/// `record` is called once per verdict, in the order verdicts are produced
/// on a connection. It must not block; sinks that ship verdicts elsewhere
/// should hand them off (e.g. over a channel).
pub trait VerdictSink: Send + Sync {
    /// Record a single verdict
    fn record(&self, verdict: &Verdict);
}
