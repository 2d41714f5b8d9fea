// # iptriage-core
//
// Core library for the iptriage log-triage tap.
//
// ## Architecture Overview
//
// Log lines stream in over TCP; every IPv4 address found in them is checked
// against an externally maintained set of known-bad addresses and reported
// with a verdict:
//
// - **extract**: Structured-field or free-text candidate extraction
// - **validate**: IPv4 literal validation
// - **MembershipResolver**: Store lookup with a failure policy
// - **LineClassifier**: Per-line orchestration, emits verdicts to a sink
// - **ConnectionHandler**: Reads one connection line by line
// - **IngestionServer**: Accept loop, one task per connection
// - **MembershipStore** / **VerdictSink**: Traits at the edges
//
// ## Design Principles
//
// 1. **Library-First**: The daemon is a thin wrapper around this crate
// 2. **No shared mutable state**: Handlers share only read-only handles
// 3. **Absorb, don't propagate**: Per-line and per-query failures are logged
//    and never stop a connection or the server

pub mod traits;
pub mod extract;
pub mod validate;
pub mod resolver;
pub mod classifier;
pub mod server;
pub mod config;
pub mod error;
pub mod store;
pub mod sink;

// Re-export core types for convenience
pub use traits::{MembershipStore, Verdict, VerdictSink};
pub use extract::{extract, parse_line, LogRecord, ParsedLine};
pub use validate::{validate, ValidatedAddress};
pub use resolver::{Lookup, MembershipResolver};
pub use classifier::LineClassifier;
pub use server::{ConnectionHandler, ConnectionSummary, IngestionServer};
pub use config::{FailurePolicy, ResolverConfig, ServerConfig, StoreConfig, TriageConfig};
pub use error::{Error, Result};
pub use store::MemoryMembershipStore;
pub use sink::{ChannelSink, LogSink};
