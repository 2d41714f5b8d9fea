// # Membership Store Trait
//
// Defines the interface to the external set-membership store.
//
// ## Purpose
//
// The store holds the externally maintained collection of dangerous
// addresses. The core only ever reads from it: one health check at startup
// and one membership query per validated address.
//
// ## Implementations
//
// - Redis: `iptriage-store-redis` crate (`PING` / `SISMEMBER`)
// - In-memory: `MemoryMembershipStore` (embedding and tests)
//
// ## Usage
//
// ```rust,ignore
// use iptriage_core::MembershipStore;
//
// #[tokio::main]
// async fn main() -> iptriage_core::Result<()> {
//     let store = /* MembershipStore implementation */;
//
//     store.health_check().await?;
//     let dangerous = store.is_member("dangerous_ips", "203.0.113.5").await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for membership store implementations
///
/// A single instance is created at startup and shared by every connection
/// handler behind an `Arc`.
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks. Any
/// connection pooling or request serialization is the implementation's
/// responsibility.
///
/// ## Implementation Guidelines
///
/// - **Read-only**: the core never adds or removes members
/// - **No retries**: report failures; the resolver decides what they mean
/// - **No caching**: the set is maintained externally and may change at any time
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Check that the store is reachable
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The store answered
    /// - `Err(Error)`: Transport or protocol failure
    async fn health_check(&self) -> Result<(), crate::Error>;

    /// Check whether `value` is a member of the set named `set_key`
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: `value` is in the set
    /// - `Ok(false)`: `value` is not in the set (or the set does not exist)
    /// - `Err(Error)`: Transport or protocol failure
    async fn is_member(&self, set_key: &str, value: &str) -> Result<bool, crate::Error>;

    /// Human-readable store name for logging
    fn store_name(&self) -> &'static str;
}
