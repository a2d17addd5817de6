//! In-process credential store.
//!
//! Honours per-key TTLs lazily: expired keys are dropped when touched or
//! enumerated. Suitable for single-instance deployments and tests; records
//! are not shared between gateway instances.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;

use super::TokenStore;
use crate::OAuth2Result;
use crate::error::OAuth2Error;

struct StoredRecord {
    fields: HashMap<String, String>,
    expires_at: Option<Instant>,
}

impl StoredRecord {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// `TokenStore` backed by a concurrent map.
#[derive(Default)]
pub struct MemoryTokenStore {
    records: DashMap<String, StoredRecord>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.records.iter().filter(|r| !r.is_expired(now)).count()
    }

    /// Returns `true` if no live keys remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `key` exists and has not expired.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.records.get(key).is_some_and(|r| !r.is_expired(now))
    }

    /// Remaining time to live of `key`, `None` if absent or persistent.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.records
            .get(key)
            .and_then(|r| r.expires_at)
            .and_then(|at| at.checked_duration_since(now))
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn set_fields(
        &self,
        key: &str,
        fields: &[(&str, String)],
        ttl: Option<Duration>,
    ) -> OAuth2Result<()> {
        let now = Instant::now();
        let mut record = self
            .records
            .entry(key.to_string())
            .or_insert_with(|| StoredRecord {
                fields: HashMap::new(),
                expires_at: None,
            });

        if record.is_expired(now) {
            record.fields.clear();
            record.expires_at = None;
        }
        for (name, value) in fields {
            record.fields.insert((*name).to_string(), value.clone());
        }
        if let Some(ttl) = ttl {
            record.expires_at = Some(now + ttl);
        }
        Ok(())
    }

    async fn get_fields(&self, key: &str, names: &[&str]) -> OAuth2Result<Vec<String>> {
        let now = Instant::now();
        if let Some(record) = self.records.get(key) {
            if !record.is_expired(now) {
                return Ok(names
                    .iter()
                    .map(|name| record.fields.get(*name).cloned().unwrap_or_default())
                    .collect());
            }
            drop(record);
            self.records.remove(key);
        }
        Ok(vec![String::new(); names.len()])
    }

    async fn delete(&self, key: &str) -> OAuth2Result<()> {
        self.records.remove(key);
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> OAuth2Result<Vec<String>> {
        let matcher = glob_to_regex(pattern)?;
        let now = Instant::now();
        self.records.retain(|_, record| !record.is_expired(now));
        Ok(self
            .records
            .iter()
            .filter(|entry| matcher.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect())
    }
}

/// Translates a `*`/`?` glob into an anchored regex.
fn glob_to_regex(pattern: &str) -> OAuth2Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| OAuth2Error::storage(format!("invalid key pattern: {e}")))
}
