use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters for one engine instance.
/// Uses atomic operations so a shared engine can be used from many threads.
#[derive(Debug, Default)]
pub struct SanitizerStats {
    html_sanitized: AtomicU64,
    css_sanitized: AtomicU64,
    urls_validated: AtomicU64,
    threats_blocked: AtomicU64,
    configs_validated: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub html_sanitized: u64,
    pub css_sanitized: u64,
    pub urls_validated: u64,
    pub threats_blocked: u64,
    pub configs_validated: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl SanitizerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_html(&self) {
        self.html_sanitized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_css(&self) {
        self.css_sanitized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_urls(&self) {
        self.urls_validated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_threats(&self, count: u64) {
        if count > 0 {
            self.threats_blocked.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn increment_configs(&self) {
        self.configs_validated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            html_sanitized: self.html_sanitized.load(Ordering::Relaxed),
            css_sanitized: self.css_sanitized.load(Ordering::Relaxed),
            urls_validated: self.urls_validated.load(Ordering::Relaxed),
            threats_blocked: self.threats_blocked.load(Ordering::Relaxed),
            configs_validated: self.configs_validated.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.html_sanitized.store(0, Ordering::Relaxed);
        self.css_sanitized.store(0, Ordering::Relaxed);
        self.urls_validated.store(0, Ordering::Relaxed);
        self.threats_blocked.store(0, Ordering::Relaxed);
        self.configs_validated.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
    }
}
