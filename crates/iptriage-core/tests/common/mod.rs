//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles for the store and sink edges
//! of the pipeline, plus helpers for wiring them together.

#![allow(dead_code)]

use iptriage_core::error::{Error, Result};
use iptriage_core::traits::{MembershipStore, Verdict, VerdictSink};
use iptriage_core::{LineClassifier, MembershipResolver, ResolverConfig, TriageConfig};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const SET_KEY: &str = "dangerous_ips";

/// A store with a fixed member set that counts and records every query
///
/// Individual values can be scripted to fail, and the whole store can be
/// taken down.
pub struct ScriptedStore {
    members: HashSet<String>,
    failing_values: std::sync::Mutex<HashSet<String>>,
    healthy: AtomicBool,
    available: AtomicBool,
    query_count: AtomicUsize,
    queried: std::sync::Mutex<Vec<(String, String)>>,
}

impl ScriptedStore {
    pub fn new(members: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            members: members.iter().map(|m| m.to_string()).collect(),
            failing_values: std::sync::Mutex::new(HashSet::new()),
            healthy: AtomicBool::new(true),
            available: AtomicBool::new(true),
            query_count: AtomicUsize::new(0),
            queried: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// A store that fails its startup health check
    pub fn unreachable() -> Arc<Self> {
        let store = Self::new(&[]);
        store.healthy.store(false, Ordering::SeqCst);
        store.available.store(false, Ordering::SeqCst);
        store
    }

    /// Make queries for `value` fail with a transport error
    pub fn fail_on(&self, value: &str) {
        self.failing_values
            .lock()
            .unwrap()
            .insert(value.to_string());
    }

    /// Make every query fail (health check unaffected)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of is_member() calls
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    /// Values passed to is_member(), in call order
    pub fn queried_values(&self) -> Vec<String> {
        self.queried
            .lock()
            .unwrap()
            .iter()
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// Set keys passed to is_member(), in call order
    pub fn queried_keys(&self) -> Vec<String> {
        self.queried
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl MembershipStore for ScriptedStore {
    async fn health_check(&self) -> Result<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::store("connection refused"))
        }
    }

    async fn is_member(&self, set_key: &str, value: &str) -> Result<bool> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        self.queried
            .lock()
            .unwrap()
            .push((set_key.to_string(), value.to_string()));

        if !self.available.load(Ordering::SeqCst) {
            return Err(Error::store("connection reset by peer"));
        }
        if self.failing_values.lock().unwrap().contains(value) {
            return Err(Error::store("i/o timeout"));
        }

        Ok(set_key == SET_KEY && self.members.contains(value))
    }

    fn store_name(&self) -> &'static str {
        "scripted"
    }
}

/// A sink that keeps every verdict it sees
#[derive(Default)]
pub struct CollectingSink {
    verdicts: std::sync::Mutex<Vec<Verdict>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn verdicts(&self) -> Vec<Verdict> {
        self.verdicts.lock().unwrap().clone()
    }

    /// (address, dangerous) pairs, in emission order
    pub fn summary(&self) -> Vec<(Ipv4Addr, bool)> {
        self.verdicts()
            .iter()
            .map(|v| (v.address, v.dangerous))
            .collect()
    }
}

impl VerdictSink for CollectingSink {
    fn record(&self, verdict: &Verdict) {
        self.verdicts.lock().unwrap().push(verdict.clone());
    }
}

/// Build a classifier over `store` reporting to `sink`
pub fn classifier_with(
    store: Arc<ScriptedStore>,
    sink: Arc<CollectingSink>,
    config: &ResolverConfig,
) -> Arc<LineClassifier> {
    let resolver = MembershipResolver::new(store, SET_KEY, config);
    Arc::new(LineClassifier::new(resolver, sink))
}

/// Helper to create a minimal config listening on an ephemeral local port
pub fn local_config() -> TriageConfig {
    let mut config = TriageConfig::default();
    config.server.listen_addr = "127.0.0.1:0".to_string();
    config.store.set_key = SET_KEY.to_string();
    config
}

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().expect("test address parses")
}
