//! Parsed-AST Cache
//!
//! Keeps recently parsed compilation units so enrichment passes and repeated
//! builds do not re-read and re-parse the same files. Entries expire after a
//! TTL; when the map grows past capacity a sweep removes a batch of expired
//! entries. Thread-safe: parse workers share one cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::constants::cache::{
    AST_CACHE_EVICT_BATCH, AST_CACHE_MAX_ENTRIES, AST_CACHE_TTL_SECS,
};

use super::ParsedAst;

struct CacheEntry {
    ast: Arc<ParsedAst>,
    cached_at: Instant,
}

/// TTL + capacity bounded cache of parse trees keyed by file path
pub struct AstCache {
    entries: DashMap<PathBuf, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for AstCache {
    fn default() -> Self {
        Self::new(
            AST_CACHE_MAX_ENTRIES,
            Duration::from_secs(AST_CACHE_TTL_SECS),
        )
    }
}

impl AstCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Fresh cached tree for `path`, if any
    pub fn get(&self, path: &Path) -> Option<Arc<ParsedAst>> {
        let entry = self.entries.get(path)?;
        if entry.cached_at.elapsed() < self.ttl {
            Some(Arc::clone(&entry.ast))
        } else {
            None
        }
    }

    /// Insert a parse tree, sweeping expired entries on overflow
    pub fn insert(&self, path: PathBuf, ast: Arc<ParsedAst>) {
        self.entries.insert(
            path,
            CacheEntry {
                ast,
                cached_at: Instant::now(),
            },
        );

        if self.entries.len() > self.max_entries {
            self.evict_expired();
        }
    }

    /// Remove up to one batch of expired entries
    fn evict_expired(&self) {
        let expired: Vec<PathBuf> = self
            .entries
            .iter()
            .filter(|e| e.cached_at.elapsed() >= self.ttl)
            .map(|e| e.key().clone())
            .take(AST_CACHE_EVICT_BATCH)
            .collect();
        for key in expired {
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
