//! Configuration types for the iptriage system
//!
//! This module defines all configuration structures used throughout the crate.
//! All values are static and provided at process start.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main iptriage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Ingestion server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Membership store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl TriageConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.server.validate()?;
        self.store.validate()?;
        self.resolver.validate()?;

        Ok(())
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Ingestion server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:5050")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Maximum accepted line length in bytes, excluding the newline
    ///
    /// A longer line ends the connection it arrived on.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl ServerConfig {
    /// Validate the server configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.listen_addr.is_empty() {
            return Err(crate::Error::config("Listen address cannot be empty"));
        }
        if self.max_line_bytes == 0 {
            return Err(crate::Error::config("Maximum line length must be > 0"));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

/// Membership store configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store address as "host:port"
    #[serde(default = "default_store_addr")]
    pub addr: String,

    /// Optional password
    #[serde(default)]
    pub password: Option<String>,

    /// Logical database index
    #[serde(default)]
    pub db: i64,

    /// Name of the set holding dangerous addresses
    #[serde(default = "default_set_key")]
    pub set_key: String,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.addr.is_empty() {
            return Err(crate::Error::config("Store address cannot be empty"));
        }
        if self.set_key.is_empty() {
            return Err(crate::Error::config("Store set key cannot be empty"));
        }
        if self.db < 0 {
            return Err(crate::Error::config(format!(
                "Store database index must be >= 0, got {}",
                self.db
            )));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            addr: default_store_addr(),
            password: None,
            db: 0,
            set_key: default_set_key(),
        }
    }
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("addr", &self.addr)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("db", &self.db)
            .field("set_key", &self.set_key)
            .finish()
    }
}

/// What the resolver answers when the store cannot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Treat the address as not dangerous
    #[default]
    Open,
    /// Treat the address as dangerous
    Closed,
}

impl FailurePolicy {
    /// The verdict substituted for a failed lookup
    pub fn fallback_verdict(self) -> bool {
        match self {
            FailurePolicy::Open => false,
            FailurePolicy::Closed => true,
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Open => write!(f, "fail-open"),
            FailurePolicy::Closed => write!(f, "fail-closed"),
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" | "fail-open" => Ok(FailurePolicy::Open),
            "closed" | "fail-closed" => Ok(FailurePolicy::Closed),
            other => Err(crate::Error::config(format!(
                "Unknown failure policy '{}'. Valid: open, closed",
                other
            ))),
        }
    }
}

/// Membership resolver configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Verdict policy when the store query fails
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Optional per-query deadline (in milliseconds)
    ///
    /// `None` leaves queries unbounded; the store client's own timeouts apply.
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.query_timeout_ms == Some(0) {
            return Err(crate::Error::config("Query timeout must be > 0 when set"));
        }
        Ok(())
    }

    /// The per-query deadline, if any
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:5050".to_string()
}

fn default_max_line_bytes() -> usize {
    64 * 1024
}

fn default_store_addr() -> String {
    "localhost:6379".to_string()
}

fn default_set_key() -> String {
    "dangerous_ips".to_string()
}
