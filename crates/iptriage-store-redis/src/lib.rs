// # Redis Membership Store
//
// This crate provides a Redis-backed MembershipStore for the iptriage system.
//
// ## Commands Used
//
// - `PING`: startup health check
// - `SISMEMBER <set_key> <address>`: one call per validated address
//
// The core never writes to Redis. The dangerous-address set is maintained
// by an external process.
//
// ## Concurrency
//
// All handlers share one `ConnectionManager`. It multiplexes requests over a
// single connection and reconnects on its own after failures; callers clone
// the (cheap) handle per request.
//
// ## Failure Handling
//
// Every Redis error is reported as `Error::Store`. No retries happen here;
// the resolver turns failed queries into fallback verdicts.
//
// ## Security Requirements
//
// - The password NEVER appears in logs or Debug output

use async_trait::async_trait;
use iptriage_core::config::StoreConfig;
use iptriage_core::traits::MembershipStore;
use iptriage_core::{Error, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tracing::{debug, info};

/// Redis membership store
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the password.
#[derive(Clone)]
pub struct RedisMembershipStore {
    /// Shared, auto-reconnecting connection
    manager: ConnectionManager,

    /// "host:port" (for logging)
    addr: String,

    /// Logical database index
    db: i64,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for RedisMembershipStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisMembershipStore")
            .field("addr", &self.addr)
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

impl RedisMembershipStore {
    /// Connect to Redis
    ///
    /// # Returns
    ///
    /// - `Ok(RedisMembershipStore)`: Connected
    /// - `Err(Error::Config)`: The address is not `host:port`
    /// - `Err(Error::StoreUnavailable)`: Redis could not be reached
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let client = redis::Client::open(connection_info(config)?)
            .map_err(|e| Error::config(format!("Invalid Redis address '{}': {}", config.addr, e)))?;

        info!(addr = %config.addr, db = config.db, "Connecting to Redis");

        let manager = client.get_connection_manager().await.map_err(|e| {
            Error::store_unavailable(format!("Unable to connect to Redis at {}: {}", config.addr, e))
        })?;

        Ok(Self {
            manager,
            addr: config.addr.clone(),
            db: config.db,
        })
    }
}

#[async_trait]
impl MembershipStore for RedisMembershipStore {
    async fn health_check(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::store(format!("PING failed: {}", e)))?;

        debug!(addr = %self.addr, reply = %pong, "Redis health check succeeded");
        Ok(())
    }

    async fn is_member(&self, set_key: &str, value: &str) -> Result<bool> {
        let mut conn = self.manager.clone();
        let is_member: bool = conn
            .sismember(set_key, value)
            .await
            .map_err(|e| Error::store(format!("SISMEMBER {} failed: {}", set_key, e)))?;

        Ok(is_member)
    }

    fn store_name(&self) -> &'static str {
        "redis"
    }
}

/// Map the store configuration onto the client's connection parameters
fn connection_info(config: &StoreConfig) -> Result<ConnectionInfo> {
    let (host, port) = split_host_port(&config.addr)?;

    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host, port),
        redis: RedisConnectionInfo {
            db: config.db,
            password: config.password.clone().filter(|p| !p.is_empty()),
            ..Default::default()
        },
    })
}

/// Split `host:port` (or `[v6]:port`) into its parts
fn split_host_port(addr: &str) -> Result<(String, u16)> {
    let invalid = || Error::config(format!("Redis address must be host:port, got '{}'", addr));

    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return Err(invalid());
    }
    let port = port.parse::<u16>().map_err(|_| invalid())?;

    Ok((host.to_string(), port))
}
