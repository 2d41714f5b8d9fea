//! Address validation
//!
//! Confirms a candidate is a well-formed IPv4 literal using the standard
//! library grammar: exactly four decimal octets in 0..=255, no leading
//! zeros, no surrounding whitespace. Rejection is silent.

use std::fmt;
use std::net::Ipv4Addr;
use tracing::trace;

/// A candidate confirmed to be a well-formed IPv4 address
///
/// Only [`validate`] constructs these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidatedAddress(Ipv4Addr);

impl ValidatedAddress {
    /// The underlying address
    pub fn addr(&self) -> Ipv4Addr {
        self.0
    }
}

impl fmt::Display for ValidatedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validate a candidate address
///
/// Returns `None` for anything that is not a dotted-quad IPv4 literal.
pub fn validate(candidate: &str) -> Option<ValidatedAddress> {
    match candidate.parse::<Ipv4Addr>() {
        Ok(addr) => Some(ValidatedAddress(addr)),
        Err(_) => {
            trace!(candidate, "Dropping malformed candidate");
            None
        }
    }
}
