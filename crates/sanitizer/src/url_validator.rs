//! URL classification for relative, `data:` and absolute URLs.

use std::sync::Arc;

use lazy_static::lazy_static;
use marquee_security::Blocklist;
use regex::Regex;
use url::Url;

use crate::config::UrlPolicy;
use crate::error::{SanitizerError, SanitizerResult};
use crate::escape::compact_lowercase;
use crate::stats::SanitizerStats;

const ALLOWED_DATA_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "text/plain",
    "application/json",
];

const RELATIVE_PREFIXES: &[&str] = &["/", "./", "../"];

lazy_static! {
    static ref DATA_URL: Regex = Regex::new(r"(?is)^data:([a-z0-9.+-]+/[a-z0-9.+-]+)(;base64)?,(.*)$")
        .expect("data URL pattern is valid");
}

/// Validates URLs against a [`UrlPolicy`], counting every check.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    blocklist: Blocklist,
    stats: Arc<SanitizerStats>,
}

impl UrlValidator {
    pub fn new(stats: Arc<SanitizerStats>) -> Self {
        Self {
            blocklist: Blocklist::default(),
            stats,
        }
    }

    /// Returns the URL unchanged when allowed, or an empty string when blocked.
    pub fn sanitize(&self, url: &str, policy: &UrlPolicy) -> String {
        self.stats.increment_urls();
        match self.check(url, policy) {
            Ok(url) => url,
            Err(e) => {
                self.stats.add_threats(1);
                tracing::warn!("🚫 URL blocked: {}", e);
                String::new()
            }
        }
    }

    /// Classify a URL without touching the counters.
    pub fn check(&self, url: &str, policy: &UrlPolicy) -> SanitizerResult<String> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(blocked("empty URL"));
        }

        let compact = compact_lowercase(trimmed);
        if compact.starts_with("//") || compact.starts_with("/\\") || compact.starts_with('\\') {
            return Err(blocked("network-path reference is not same-origin"));
        }

        if RELATIVE_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix)) {
            return Ok(trimmed.to_string());
        }

        if compact.starts_with("data:") {
            return self.check_data_url(trimmed);
        }

        if let Some((scheme, _)) = compact.split_once(':') {
            if self.blocklist.is_blocked_scheme(scheme) {
                return Err(blocked(&format!("scheme {} is blocklisted", scheme)));
            }
        }

        let parsed = Url::parse(trimmed)?;
        let scheme = parsed.scheme();
        if self.blocklist.is_blocked_scheme(scheme) || !policy.allows_protocol(scheme) {
            return Err(blocked(&format!("scheme {} is not allowed", scheme)));
        }

        if !policy.allowed_domains.is_empty() {
            match parsed.host_str() {
                Some(host) if policy.allows_host(host) => {}
                Some(host) => return Err(blocked(&format!("host {} is not allowed", host))),
                None => return Err(blocked("URL has no host")),
            }
        }

        Ok(trimmed.to_string())
    }

    fn check_data_url(&self, url: &str) -> SanitizerResult<String> {
        let captures = DATA_URL
            .captures(url)
            .ok_or_else(|| blocked("malformed data URL"))?;
        let mime = captures
            .get(1)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();

        if mime.contains("html") {
            return Err(blocked(&format!("data URL with MIME type {}", mime)));
        }
        if !ALLOWED_DATA_MIME_TYPES.contains(&mime.as_str()) {
            return Err(blocked(&format!("data URL MIME type {} is not allowed", mime)));
        }
        Ok(url.to_string())
    }
}

fn blocked(reason: &str) -> SanitizerError {
    SanitizerError::BlockedUrl {
        reason: reason.to_string(),
    }
}
