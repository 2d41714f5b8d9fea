//! Line classifier
//!
//! Orchestrates per-line processing:
//!
//! ```text
//! line ──► extract ──► validate ──► MembershipResolver ──► Verdict ──► VerdictSink
//! ```
//!
//! Candidates are processed in the order the extractor yields them, with no
//! reordering and no deduplication. Each verdict reaches the sink before the
//! next candidate is resolved.

use crate::extract::extract;
use crate::resolver::MembershipResolver;
use crate::traits::{Verdict, VerdictSink};
use crate::validate::validate;
use std::net::SocketAddr;
use std::sync::Arc;

/// Classifies every address found in a log line
pub struct LineClassifier {
    resolver: MembershipResolver,
    sink: Arc<dyn VerdictSink>,
}

impl LineClassifier {
    /// Create a classifier that reports to `sink`
    pub fn new(resolver: MembershipResolver, sink: Arc<dyn VerdictSink>) -> Self {
        Self { resolver, sink }
    }

    /// The resolver used for lookups
    pub fn resolver(&self) -> &MembershipResolver {
        &self.resolver
    }

    /// Classify one line
    ///
    /// Returns the verdicts in emission order. Lines without valid
    /// addresses produce no verdicts.
    pub async fn classify(&self, line: &[u8]) -> Vec<Verdict> {
        self.classify_from(None, line).await
    }

    /// Classify one line received from `peer`
    pub async fn classify_from(&self, peer: Option<SocketAddr>, line: &[u8]) -> Vec<Verdict> {
        // Collected up front so no regex search state is held across awaits
        let candidates: Vec<_> = extract(line).collect();
        let mut verdicts = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let Some(address) = validate(&candidate) else {
                continue;
            };

            let lookup = self.resolver.lookup(address).await;
            let verdict = Verdict::new(address.addr(), lookup.is_dangerous(), lookup.is_fallback())
                .with_peer(peer);

            self.sink.record(&verdict);
            verdicts.push(verdict);
        }

        verdicts
    }
}

impl std::fmt::Debug for LineClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineClassifier")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::sink::ChannelSink;
    use crate::store::MemoryMembershipStore;
    use std::net::Ipv4Addr;

    fn classifier(store: &MemoryMembershipStore) -> (LineClassifier, tokio::sync::mpsc::Receiver<Verdict>) {
        let resolver = MembershipResolver::new(
            Arc::new(store.clone()),
            "dangerous_ips",
            &ResolverConfig::default(),
        );
        let (sink, rx) = ChannelSink::new(64);
        (LineClassifier::new(resolver, Arc::new(sink)), rx)
    }

    #[tokio::test]
    async fn test_verdicts_follow_candidate_order() {
        let store = MemoryMembershipStore::new();
        store.insert("dangerous_ips", "192.0.2.2").await;
        let (classifier, mut rx) = classifier(&store);

        let verdicts = classifier
            .classify(b"a 192.0.2.1 b 192.0.2.2 c 192.0.2.1")
            .await;

        let summary: Vec<(Ipv4Addr, bool)> =
            verdicts.iter().map(|v| (v.address, v.dangerous)).collect();
        assert_eq!(
            summary,
            vec![
                (Ipv4Addr::new(192, 0, 2, 1), false),
                (Ipv4Addr::new(192, 0, 2, 2), true),
                (Ipv4Addr::new(192, 0, 2, 1), false),
            ]
        );

        for expected in &verdicts {
            assert_eq!(&rx.recv().await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_invalid_candidates_produce_nothing() {
        let store = MemoryMembershipStore::new();
        let (classifier, mut rx) = classifier(&store);

        assert!(classifier.classify(b"300.300.300.300").await.is_empty());
        assert!(classifier.classify(br#"{"ip":"not-an-ip"}"#).await.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_peer_is_attached() {
        let store = MemoryMembershipStore::new();
        let (classifier, _rx) = classifier(&store);
        let peer: SocketAddr = "127.0.0.1:9000".parse().unwrap();

        let verdicts = classifier.classify_from(Some(peer), b"from 10.9.8.7").await;
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].peer, Some(peer));
    }
}
