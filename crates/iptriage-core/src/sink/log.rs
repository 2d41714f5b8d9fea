// # Log Sink
//
// Writes one human-readable tracing event per verdict. Dangerous addresses
// are logged at WARN, everything else at INFO. Every event carries the
// address, the determination, the fallback flag and an RFC 1123 timestamp
// as structured fields.

use crate::traits::{Verdict, VerdictSink};
use tracing::{info, warn};

/// Verdict sink backed by `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LogSink {
    /// Create a new log sink
    pub fn new() -> Self {
        Self
    }
}

impl VerdictSink for LogSink {
    fn record(&self, verdict: &Verdict) {
        let observed_at = verdict.timestamp_rfc1123();
        let peer = verdict
            .peer
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());

        if verdict.dangerous {
            warn!(
                address = %verdict.address,
                dangerous = true,
                fallback = verdict.fallback,
                observed_at = %observed_at,
                peer = %peer,
                "Dangerous IP: {} - Date Time: {}",
                verdict.address,
                observed_at
            );
        } else {
            info!(
                address = %verdict.address,
                dangerous = false,
                fallback = verdict.fallback,
                observed_at = %observed_at,
                peer = %peer,
                "IP: {} (Not dangerous) - Date Time: {}",
                verdict.address,
                observed_at
            );
        }
    }
}
