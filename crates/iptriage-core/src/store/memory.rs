// # Memory Membership Store
//
// In-memory implementation of MembershipStore.
//
// ## Purpose
//
// Provides a simple set store for embedding the triage pipeline without an
// external service, and for exercising failure handling in tests.
//
// ## Failure Simulation
//
// - `set_available(false)` makes every call fail with a store error
// - `set_latency(..)` delays every query, for deadline testing

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::traits::MembershipStore;
use crate::Error;

/// In-memory membership store implementation
///
/// Sets are kept in a HashMap protected by a RwLock. Clones share state.
///
/// # Example
///
/// ```rust,no_run
/// use iptriage_core::store::MemoryMembershipStore;
/// use iptriage_core::traits::MembershipStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryMembershipStore::new();
///     store.insert("dangerous_ips", "203.0.113.5").await;
///
///     assert!(store.is_member("dangerous_ips", "203.0.113.5").await?);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryMembershipStore {
    sets: Arc<RwLock<HashMap<String, HashSet<String>>>>,
    available: Arc<AtomicBool>,
    latency_ms: Arc<AtomicU64>,
}

impl MemoryMembershipStore {
    /// Create a new empty, available store
    pub fn new() -> Self {
        Self {
            sets: Arc::new(RwLock::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
            latency_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Add `value` to the set named `set_key`
    pub async fn insert(&self, set_key: &str, value: &str) {
        let mut guard = self.sets.write().await;
        guard
            .entry(set_key.to_string())
            .or_default()
            .insert(value.to_string());
    }

    /// Remove `value` from the set named `set_key`
    pub async fn remove(&self, set_key: &str, value: &str) {
        let mut guard = self.sets.write().await;
        if let Some(set) = guard.get_mut(set_key) {
            set.remove(value);
        }
    }

    /// Number of members in the set named `set_key`
    pub async fn len(&self, set_key: &str) -> usize {
        self.sets.read().await.get(set_key).map_or(0, HashSet::len)
    }

    /// Simulate the store going down or coming back
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every subsequent query by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), Error> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::store("memory store marked unavailable"))
        }
    }
}

impl Default for MemoryMembershipStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipStore for MemoryMembershipStore {
    async fn health_check(&self) -> Result<(), Error> {
        self.check_available()
    }

    async fn is_member(&self, set_key: &str, value: &str) -> Result<bool, Error> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        self.check_available()?;

        let guard = self.sets.read().await;
        Ok(guard.get(set_key).is_some_and(|set| set.contains(value)))
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
