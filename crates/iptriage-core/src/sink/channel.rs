// # Channel Sink
//
// Forwards verdicts to a bounded mpsc channel so an embedding application
// can consume them as events.
//
// `record` never blocks: when the channel is full the verdict is dropped
// with a warning.

use crate::traits::{Verdict, VerdictSink};
use tokio::sync::mpsc;
use tracing::warn;

/// Verdict sink that sends each verdict over a channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Verdict>,
}

impl ChannelSink {
    /// Create a sink and the receiver that yields its verdicts
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Verdict>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl VerdictSink for ChannelSink {
    fn record(&self, verdict: &Verdict) {
        match self.tx.try_send(verdict.clone()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(
                    address = %dropped.address,
                    "Verdict channel full, dropping verdict. Consider increasing its capacity."
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Receiver gone; nobody is listening
            }
        }
    }
}
