//! Error types for the iptriage system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for iptriage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the iptriage system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Membership store query or transport errors
    #[error("Membership store error: {0}")]
    Store(String),

    /// The membership store could not be reached at startup
    #[error("Membership store unavailable: {0}")]
    StoreUnavailable(String),

    /// The ingestion socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: String,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// A received line exceeded the configured maximum length
    #[error("Line exceeds maximum length of {limit} bytes")]
    LineTooLong {
        /// Configured limit in bytes
        limit: usize,
    },

    /// A store query did not complete within its deadline
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a membership store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a "store unavailable" error
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a bind error
    pub fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }

    /// Whether this error is fatal at startup
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::Bind { .. } | Self::StoreUnavailable(_) | Self::Config(_)
        )
    }
}
