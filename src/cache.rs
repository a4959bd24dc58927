use crate::error::Result;
use crate::schema::{AnalysisConfig, RawRow};
use crate::Analysis;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

pub const DEFAULT_TTL_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
struct CacheEntry {
    analysis: Analysis,
    stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hits as a percentage of lookups.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64 * 100.0
    }
}

/// Memo of finished analyses keyed by a digest of the input rows and the
/// configuration. Entries expire after `ttl`.
///
/// The cache is owned by the caller and passed in explicitly, so separate
/// analyzers never share state behind each other's back.
#[derive(Debug, Clone)]
pub struct AnalysisCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_TTL_MINUTES))
    }
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// SHA-256 over the serialized rows and configuration.
    pub fn content_hash(rows: &[RawRow], config: &AnalysisConfig) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(rows)?);
        hasher.update(serde_json::to_vec(config)?);
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn get(&mut self, key: &str) -> Option<Analysis> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<Analysis> {
        let fresh = match self.entries.get(key) {
            Some(entry) => now - entry.stored_at < self.ttl,
            None => {
                self.misses += 1;
                return None;
            }
        };

        if !fresh {
            self.entries.remove(key);
            self.misses += 1;
            debug!("Cache entry {} expired", key);
            return None;
        }

        self.hits += 1;
        self.entries.get(key).map(|entry| entry.analysis.clone())
    }

    pub fn insert(&mut self, key: String, analysis: Analysis) {
        self.insert_at(key, analysis, Utc::now());
    }

    pub fn insert_at(&mut self, key: String, analysis: Analysis, now: DateTime<Utc>) {
        let evicted = self.evict_expired_at(now);
        if evicted > 0 {
            debug!("Evicted {} expired cache entries", evicted);
        }

        self.entries.insert(
            key,
            CacheEntry {
                analysis,
                stored_at: now,
            },
        );
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn evict_expired(&mut self) -> usize {
        self.evict_expired_at(Utc::now())
    }

    pub fn evict_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now - entry.stored_at < ttl);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}
