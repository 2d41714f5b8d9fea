//! Core traits for the iptriage system
//!
//! This module defines the abstract interfaces at the edges of the core.
//!
//! - [`MembershipStore`]: Query the external set of dangerous addresses
//! - [`VerdictSink`]: Record classification results

pub mod membership_store;
pub mod verdict_sink;

pub use membership_store::MembershipStore;
pub use verdict_sink::{Verdict, VerdictSink};
