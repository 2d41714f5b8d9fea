//! Membership resolver
//!
//! Queries the shared store for each validated address and reduces every
//! store failure to the configured [`FailurePolicy`] verdict. Failures are
//! logged here and never reach the caller.

use crate::config::{FailurePolicy, ResolverConfig};
use crate::error::Error;
use crate::traits::MembershipStore;
use crate::validate::ValidatedAddress;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Result of one membership lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The store answered
    Store(bool),
    /// The store failed; the value comes from the failure policy
    Fallback(bool),
}

impl Lookup {
    /// The dangerous/not-dangerous determination
    pub fn is_dangerous(self) -> bool {
        match self {
            Lookup::Store(dangerous) | Lookup::Fallback(dangerous) => dangerous,
        }
    }

    /// Whether the determination came from the failure policy
    pub fn is_fallback(self) -> bool {
        matches!(self, Lookup::Fallback(_))
    }
}

/// Resolves validated addresses against the dangerous-address set
pub struct MembershipResolver {
    /// Shared store handle
    store: Arc<dyn MembershipStore>,

    /// Name of the dangerous-address set
    set_key: String,

    /// Verdict used when the store fails
    failure_policy: FailurePolicy,

    /// Optional per-query deadline
    query_timeout: Option<Duration>,
}

impl MembershipResolver {
    /// Create a resolver over `store`
    pub fn new(
        store: Arc<dyn MembershipStore>,
        set_key: impl Into<String>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            store,
            set_key: set_key.into(),
            failure_policy: config.failure_policy,
            query_timeout: config.query_timeout(),
        }
    }

    /// The configured failure policy
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Whether `address` is dangerous
    ///
    /// Never fails; store errors yield the failure policy's verdict.
    pub async fn resolve(&self, address: ValidatedAddress) -> bool {
        self.lookup(address).await.is_dangerous()
    }

    /// Look up `address`, reporting whether the answer is a fallback
    pub async fn lookup(&self, address: ValidatedAddress) -> Lookup {
        match self.query(address).await {
            Ok(dangerous) => {
                debug!(%address, dangerous, "Membership lookup succeeded");
                Lookup::Store(dangerous)
            }
            Err(e) => {
                let fallback = self.failure_policy.fallback_verdict();
                error!(
                    %address,
                    set_key = %self.set_key,
                    store = self.store.store_name(),
                    policy = %self.failure_policy,
                    fallback,
                    "Failed to check address in membership store: {}",
                    e
                );
                Lookup::Fallback(fallback)
            }
        }
    }

    async fn query(&self, address: ValidatedAddress) -> Result<bool, Error> {
        let value = address.to_string();
        let query = self.store.is_member(&self.set_key, &value);

        match self.query_timeout {
            Some(deadline) => tokio::time::timeout(deadline, query)
                .await
                .map_err(|_| Error::Timeout(deadline))?,
            None => query.await,
        }
    }
}

impl std::fmt::Debug for MembershipResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipResolver")
            .field("store", &self.store.store_name())
            .field("set_key", &self.set_key)
            .field("failure_policy", &self.failure_policy)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryMembershipStore;
    use crate::validate::validate;

    fn resolver(store: &MemoryMembershipStore, config: ResolverConfig) -> MembershipResolver {
        MembershipResolver::new(Arc::new(store.clone()), "dangerous_ips", &config)
    }

    #[tokio::test]
    async fn test_member_is_dangerous() {
        let store = MemoryMembershipStore::new();
        store.insert("dangerous_ips", "203.0.113.5").await;
        let resolver = resolver(&store, ResolverConfig::default());

        let addr = validate("203.0.113.5").unwrap();
        assert_eq!(resolver.lookup(addr).await, Lookup::Store(true));
        assert!(resolver.resolve(addr).await);
    }

    #[tokio::test]
    async fn test_other_set_is_ignored() {
        let store = MemoryMembershipStore::new();
        store.insert("allowlist", "203.0.113.5").await;
        let resolver = resolver(&store, ResolverConfig::default());

        assert!(!resolver.resolve(validate("203.0.113.5").unwrap()).await);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_open() {
        let store = MemoryMembershipStore::new();
        store.insert("dangerous_ips", "198.51.100.7").await;
        store.set_available(false);
        let resolver = resolver(&store, ResolverConfig::default());

        let addr = validate("198.51.100.7").unwrap();
        assert_eq!(resolver.lookup(addr).await, Lookup::Fallback(false));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_closed() {
        let store = MemoryMembershipStore::new();
        store.set_available(false);
        let config = ResolverConfig {
            failure_policy: FailurePolicy::Closed,
            query_timeout_ms: None,
        };
        let resolver = resolver(&store, config);

        let lookup = resolver.lookup(validate("10.0.0.1").unwrap()).await;
        assert!(lookup.is_dangerous());
        assert!(lookup.is_fallback());
    }

    #[tokio::test]
    async fn test_store_recovery_restores_answers() {
        let store = MemoryMembershipStore::new();
        store.insert("dangerous_ips", "198.51.100.7").await;
        let resolver = resolver(&store, ResolverConfig::default());
        let addr = validate("198.51.100.7").unwrap();

        store.set_available(false);
        assert_eq!(resolver.lookup(addr).await, Lookup::Fallback(false));

        store.set_available(true);
        assert_eq!(resolver.lookup(addr).await, Lookup::Store(true));
    }
}
