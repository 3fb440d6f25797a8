use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use marquee_security::SecurityLevel;

use crate::error::ContentKind;
use crate::SanitizationResult;

/// Results are only reused for the same content type, level and input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ContentKind,
    pub level: SecurityLevel,
    pub content: String,
}

impl CacheKey {
    pub fn new(kind: ContentKind, level: SecurityLevel, content: &str) -> Self {
        Self {
            kind,
            level,
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: SanitizationResult,
    /// Input plus output bytes
    size_bytes: usize,
    access_count: u64,
    /// Logical clock value of the last hit or insert
    last_accessed: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    current_size: usize,
    clock: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Bounded LRU cache of sanitization results
#[derive(Debug)]
pub struct SanitizeCache {
    state: Mutex<CacheState>,
    max_entries: usize,
    max_size_bytes: usize,
}

impl SanitizeCache {
    pub fn new(max_entries: usize, max_size_bytes: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_entries,
            max_size_bytes,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_entries > 0 && self.max_size_bytes > 0
    }

    pub fn get(&self, key: &CacheKey) -> Option<SanitizationResult> {
        if !self.is_enabled() {
            return None;
        }

        let mut state = self.state.lock();
        let now = state.tick();
        let hit = state.entries.get_mut(key).map(|entry| {
            entry.access_count += 1;
            entry.last_accessed = now;
            entry.result.clone()
        });

        match hit {
            Some(result) => {
                state.hits += 1;
                Some(result)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Store a result, evicting least recently used entries to make room.
    /// Entries larger than the whole byte budget are not cached.
    pub fn insert(&self, key: CacheKey, result: SanitizationResult) {
        if !self.is_enabled() {
            return;
        }

        let size_bytes = key.content.len() + result.sanitized_content.len();
        if size_bytes > self.max_size_bytes {
            tracing::debug!("Result too large to cache: {} bytes", size_bytes);
            return;
        }

        let mut state = self.state.lock();
        if let Some(old) = state.entries.remove(&key) {
            state.current_size = state.current_size.saturating_sub(old.size_bytes);
        }

        while !state.entries.is_empty()
            && (state.current_size + size_bytes > self.max_size_bytes
                || state.entries.len() >= self.max_entries)
        {
            let lru_key = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| (entry.last_accessed, entry.access_count))
                .map(|(key, _)| key.clone());

            match lru_key.and_then(|key| state.entries.remove(&key)) {
                Some(removed) => {
                    state.current_size = state.current_size.saturating_sub(removed.size_bytes);
                    state.evictions += 1;
                    tracing::trace!("Evicted cached result ({} bytes)", removed.size_bytes);
                }
                None => break,
            }
        }

        let now = state.tick();
        state.current_size += size_bytes;
        state.entries.insert(
            key,
            CacheEntry {
                result,
                size_bytes,
                access_count: 1,
                last_accessed: now,
            },
        );
    }

    /// Drop every entry and reset the hit and miss counters
    pub fn clear(&self) {
        let mut state = self.state.lock();
        *state = CacheState::default();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entry_count: state.entries.len(),
            total_size_bytes: state.current_size,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            max_entries: self.max_entries,
            max_size_bytes: self.max_size_bytes,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_size_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub max_entries: usize,
    pub max_size_bytes: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, as a percentage
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            (self.hits as f64 / lookups as f64) * 100.0
        }
    }
}
