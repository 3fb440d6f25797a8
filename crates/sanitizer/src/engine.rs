use std::sync::Arc;

use serde_json::{Map, Value};

use marquee_security::{PolicyStore, SecurityLevel};

use crate::cache::{CacheKey, CacheStats, SanitizeCache};
use crate::config::{SanitizerConfig, UrlPolicy};
use crate::css::CssSanitizer;
use crate::error::{ContentKind, SanitizerResult};
use crate::escape::escape_html;
use crate::html::HtmlSanitizer;
use crate::schema::{ConfigSchema, SanitizeMode};
use crate::stats::{SanitizerStats, StatsSnapshot};
use crate::url_validator::UrlValidator;
use crate::SanitizationResult;

/// Entry point for all sanitization.
///
/// Owns the policy store, URL validator, result cache and counters. The
/// engine is `Send + Sync`; wrap it in an `Arc` to share it across workers.
#[derive(Debug)]
pub struct SanitizerEngine {
    config: SanitizerConfig,
    policy: PolicyStore,
    urls: UrlValidator,
    cache: SanitizeCache,
    stats: Arc<SanitizerStats>,
}

impl Default for SanitizerEngine {
    fn default() -> Self {
        Self::with_config(SanitizerConfig::default())
    }
}

impl SanitizerEngine {
    /// Create an engine after validating the configuration
    pub fn new(config: SanitizerConfig) -> SanitizerResult<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: SanitizerConfig) -> Self {
        let stats = Arc::new(SanitizerStats::new());
        Self {
            policy: PolicyStore::new(),
            urls: UrlValidator::new(stats.clone()),
            cache: SanitizeCache::new(config.cache_max_entries, config.cache_max_bytes),
            stats,
            config,
        }
    }

    pub fn sanitize_html(&self, html: &str, level: SecurityLevel) -> String {
        self.sanitize_html_detailed(html, level).sanitized_content
    }

    /// Like [`sanitize_html`](Self::sanitize_html), also reporting how many
    /// constructs were removed.
    pub fn sanitize_html_detailed(&self, html: &str, level: SecurityLevel) -> SanitizationResult {
        self.stats.increment_html();
        self.run_cached(ContentKind::Html, html, level, |input| {
            HtmlSanitizer::new(&self.policy, &self.urls, &self.config).sanitize(input, level)
        })
    }

    pub fn sanitize_css(&self, css: &str, level: SecurityLevel) -> String {
        self.sanitize_css_detailed(css, level).sanitized_content
    }

    pub fn sanitize_css_detailed(&self, css: &str, level: SecurityLevel) -> SanitizationResult {
        self.stats.increment_css();
        self.run_cached(ContentKind::Css, css, level, |input| {
            CssSanitizer::new(&self.policy, &self.urls, &self.config).sanitize(input, level)
        })
    }

    /// Returns the URL when the policy allows it, or an empty string.
    /// URL checks bypass the cache since the policy varies per call.
    pub fn sanitize_url(&self, url: &str, policy: &UrlPolicy) -> String {
        self.urls.sanitize(url, policy)
    }

    /// Clean a configuration object field by field against `schema`.
    ///
    /// Declared fields of the wrong JSON type are dropped. Declared string
    /// fields go through the sanitizer named by their `sanitize` mode.
    /// Undeclared strings are entity-escaped and other undeclared values
    /// pass through. A non-object input yields an empty object.
    pub fn validate_config(&self, config: &Value, schema: &ConfigSchema) -> Value {
        self.stats.increment_configs();

        let fields = match config.as_object() {
            Some(fields) => fields,
            None => {
                tracing::warn!("⚠️ Configuration is not a JSON object, discarding it");
                return Value::Object(Map::new());
            }
        };

        let mut validated = Map::with_capacity(fields.len());
        for (name, value) in fields {
            let cleaned = match schema.get(name) {
                Some(spec) => {
                    if !spec.kind.matches(value) {
                        tracing::debug!("🚫 Dropping field {}: expected {:?}", name, spec.kind);
                        continue;
                    }
                    let level = spec.level.unwrap_or(self.config.default_level);
                    match value {
                        Value::String(s) => Value::String(self.sanitize_field(s, spec.mode(), level)),
                        other => other.clone(),
                    }
                }
                None => match value {
                    Value::String(s) => Value::String(escape_html(s)),
                    other => other.clone(),
                },
            };
            validated.insert(name.clone(), cleaned);
        }

        Value::Object(validated)
    }

    fn sanitize_field(&self, value: &str, mode: SanitizeMode, level: SecurityLevel) -> String {
        match mode {
            SanitizeMode::Html => self.sanitize_html(value, level),
            SanitizeMode::Css => self.sanitize_css(value, level),
            SanitizeMode::Url => self.sanitize_url(value, &self.config.url_policy),
            SanitizeMode::Escape => escape_html(value),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Zero every counter and empty the cache
    pub fn reset(&self) {
        self.stats.reset();
        self.cache.clear();
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    pub fn policy(&self) -> &PolicyStore {
        &self.policy
    }

    /// Look up `(kind, level, content)` in the cache, running `sanitize` on a
    /// miss. Errors become an empty result with one counted threat.
    fn run_cached<F>(
        &self,
        kind: ContentKind,
        content: &str,
        level: SecurityLevel,
        sanitize: F,
    ) -> SanitizationResult
    where
        F: FnOnce(&str) -> SanitizerResult<SanitizationResult>,
    {
        let key = if self.cache.is_enabled() {
            let key = CacheKey::new(kind, level, content);
            if let Some(hit) = self.cache.get(&key) {
                self.stats.increment_cache_hits();
                return hit;
            }
            self.stats.increment_cache_misses();
            Some(key)
        } else {
            None
        };

        let result = match sanitize(content) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("⚠️ {} sanitization failed: {}", kind, e);
                SanitizationResult {
                    sanitized_content: String::new(),
                    threats_blocked: 1,
                }
            }
        };
        self.stats.add_threats(result.threats_blocked as u64);

        if let Some(key) = key {
            self.cache.insert(key, result.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::schema::{FieldSpec, FieldType};

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SanitizerEngine>();
    }

    #[test]
    fn test_new_validates_config() {
        let mut config = SanitizerConfig::default();
        config.max_input_bytes = 0;
        assert!(SanitizerEngine::new(config).is_err());
        assert!(SanitizerEngine::new(SanitizerConfig::default()).is_ok());
    }

    #[test]
    fn test_accessors() {
        let config = SanitizerConfig::builder()
            .default_level(SecurityLevel::Strict)
            .build()
            .unwrap();
        let engine = SanitizerEngine::new(config).unwrap();
        assert_eq!(engine.config().default_level, SecurityLevel::Strict);
        assert!(engine.policy().allowlist(SecurityLevel::Moderate).allows_tag("a"));
    }

    #[test]
    fn test_cache_hit_skips_sanitizer() {
        let engine = SanitizerEngine::default();
        let first = engine.sanitize_css_detailed("a{color:expression(alert(1))}", SecurityLevel::Strict);
        let second = engine.sanitize_css_detailed("a{color:expression(alert(1))}", SecurityLevel::Strict);
        assert_eq!(first, second);

        let stats = engine.stats();
        assert_eq!(stats.css_sanitized, 2);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.threats_blocked, first.threats_blocked as u64);
    }

    #[test]
    fn test_disabled_cache_counts_nothing() {
        let config = SanitizerConfig::builder().cache_limits(0, 0).build().unwrap();
        let engine = SanitizerEngine::new(config).unwrap();
        engine.sanitize_html("<p>x</p>", SecurityLevel::Strict);
        engine.sanitize_html("<p>x</p>", SecurityLevel::Strict);
        let stats = engine.stats();
        assert_eq!(stats.html_sanitized, 2);
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 0);
    }

    #[test]
    fn test_oversized_input_fails_closed() {
        let config = SanitizerConfig::builder().max_input_bytes(16).build().unwrap();
        let engine = SanitizerEngine::new(config).unwrap();
        let result = engine.sanitize_css_detailed(".a { color: #000000 }", SecurityLevel::Strict);
        assert_eq!(result.sanitized_content, "");
        assert_eq!(result.threats_blocked, 1);
        assert_eq!(engine.stats().threats_blocked, 1);
    }

    #[test]
    fn test_tag_flood_fails_closed() {
        let engine = SanitizerEngine::default();
        let result = engine.sanitize_html_detailed(&"<div>".repeat(100_000), SecurityLevel::Strict);
        assert_eq!(result.sanitized_content, "");
        assert_eq!(result.threats_blocked, 1);
    }

    #[test]
    fn test_sanitize_url_counts() {
        let engine = SanitizerEngine::default();
        assert_eq!(engine.sanitize_url("javascript:alert(1)", &UrlPolicy::default()), "");
        assert_eq!(
            engine.sanitize_url("https://good.com/x", &UrlPolicy::new(["https"])),
            "https://good.com/x"
        );
        let stats = engine.stats();
        assert_eq!(stats.urls_validated, 2);
        assert_eq!(stats.threats_blocked, 1);
    }

    #[test]
    fn test_validate_config() {
        let engine = SanitizerEngine::default();
        let schema = ConfigSchema::new()
            .field("headline", FieldSpec::new(FieldType::String).sanitize(SanitizeMode::Html))
            .field(
                "theme",
                FieldSpec::new(FieldType::String)
                    .sanitize(SanitizeMode::Css)
                    .level(SecurityLevel::Strict),
            )
            .field("logo", FieldSpec::new(FieldType::String).sanitize(SanitizeMode::Url))
            .field("label", FieldSpec::new(FieldType::String))
            .field("refresh", FieldSpec::new(FieldType::Number));

        let input = json!({
            "headline": "<b>Sale</b><script>x()</script>",
            "theme": ".a { position: fixed; color: #fff }",
            "logo": "javascript:alert(1)",
            "label": "<i>",
            "refresh": "soon",
            "extra": "<b>",
            "enabled": true
        });

        let output = engine.validate_config(&input, &schema);
        assert_eq!(
            output,
            json!({
                "headline": "<b>Sale</b>x()",
                "theme": ".a {\n  color: #fff;\n}",
                "logo": "",
                "label": "&lt;i&gt;",
                "extra": "&lt;b&gt;",
                "enabled": true
            })
        );
        assert_eq!(engine.stats().configs_validated, 1);
    }

    #[test]
    fn test_validate_config_non_object() {
        let engine = SanitizerEngine::default();
        assert_eq!(engine.validate_config(&json!([1, 2]), &ConfigSchema::new()), json!({}));
        assert_eq!(engine.validate_config(&json!("x"), &ConfigSchema::new()), json!({}));
    }

    #[test]
    fn test_reset_clears_counters_and_cache() {
        let engine = SanitizerEngine::default();
        engine.sanitize_html("<p>x</p>", SecurityLevel::Strict);
        assert_eq!(engine.cache_stats().entry_count, 1);

        engine.reset();
        assert_eq!(engine.stats(), StatsSnapshot::default());
        assert_eq!(engine.cache_stats().entry_count, 0);

        engine.sanitize_html("<p>x</p>", SecurityLevel::Strict);
        assert_eq!(engine.stats().cache_misses, 1);
    }
}
