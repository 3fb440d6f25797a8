use serde::{Deserialize, Serialize};

use marquee_security::{Blocklist, SecurityLevel};

use crate::error::{SanitizerError, SanitizerResult};

/// Protocols and hosts an absolute URL must satisfy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlPolicy {
    /// Allowed schemes, with or without the trailing colon
    pub allowed_protocols: Vec<String>,
    /// When non-empty, hosts must equal or be a subdomain of one of these
    pub allowed_domains: Vec<String>,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self {
            allowed_protocols: vec!["http".to_string(), "https".to_string()],
            allowed_domains: Vec::new(),
        }
    }
}

impl UrlPolicy {
    pub fn new<I, S>(protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_protocols: protocols.into_iter().map(|s| s.as_ref().to_string()).collect(),
            allowed_domains: Vec::new(),
        }
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_domains = domains.into_iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    /// Scheme names normalised to lowercase without the colon.
    pub fn allows_protocol(&self, scheme: &str) -> bool {
        let scheme = scheme.trim_end_matches(':').to_lowercase();
        self.allowed_protocols
            .iter()
            .any(|p| p.trim().trim_end_matches(':').to_lowercase() == scheme)
    }

    pub fn allows_host(&self, host: &str) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        let host = host.trim_end_matches('.').to_lowercase();
        self.allowed_domains.iter().any(|domain| {
            let domain = domain.trim().trim_start_matches('.').to_lowercase();
            !domain.is_empty()
                && (host == domain || host.ends_with(&format!(".{}", domain)))
        })
    }
}

/// Configuration for the sanitization engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Level used by `validate_config` when a field does not name one
    pub default_level: SecurityLevel,
    /// Inputs above this size are rejected outright
    pub max_input_bytes: usize,
    /// Depth beyond which HTML subtrees are flattened to escaped text
    pub max_html_depth: usize,
    /// HTML with more start tags than this is rejected before parsing
    pub max_html_tags: usize,
    /// Maximum number of cached results
    pub cache_max_entries: usize,
    /// Maximum bytes of cached inputs and outputs
    pub cache_max_bytes: usize,
    /// Policy applied to `url()` tokens, `href` and `src`
    pub url_policy: UrlPolicy,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            default_level: SecurityLevel::default(),
            max_input_bytes: 512 * 1024, // 512KB
            max_html_depth: 100,
            max_html_tags: 10_000,
            cache_max_entries: 1000,
            cache_max_bytes: 16 * 1024 * 1024, // 16MB
            url_policy: UrlPolicy::default(),
        }
    }
}

impl SanitizerConfig {
    pub fn builder() -> SanitizerConfigBuilder {
        SanitizerConfigBuilder::new()
    }

    /// Load a configuration from JSON; omitted fields keep their defaults.
    pub fn from_json(json: &str) -> SanitizerResult<Self> {
        let config: SanitizerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SanitizerResult<()> {
        if self.max_input_bytes == 0 {
            return Err(SanitizerError::InvalidConfiguration(
                "max_input_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_html_depth == 0 {
            return Err(SanitizerError::InvalidConfiguration(
                "max_html_depth must be greater than zero".to_string(),
            ));
        }
        if self.max_html_tags == 0 {
            return Err(SanitizerError::InvalidConfiguration(
                "max_html_tags must be greater than zero".to_string(),
            ));
        }
        let blocklist = Blocklist::default();
        if let Some(scheme) = self
            .url_policy
            .allowed_protocols
            .iter()
            .find(|p| blocklist.is_blocked_scheme(p))
        {
            return Err(SanitizerError::InvalidConfiguration(format!(
                "scheme {} can never be allowed",
                scheme
            )));
        }
        Ok(())
    }
}

/// Builder for creating validated SanitizerConfig instances.
#[derive(Debug, Default)]
pub struct SanitizerConfigBuilder {
    config: SanitizerConfig,
}

impl SanitizerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_level(mut self, level: SecurityLevel) -> Self {
        self.config.default_level = level;
        self
    }

    pub fn max_input_bytes(mut self, limit: usize) -> Self {
        self.config.max_input_bytes = limit;
        self
    }

    pub fn max_html_depth(mut self, depth: usize) -> Self {
        self.config.max_html_depth = depth;
        self
    }

    pub fn max_html_tags(mut self, limit: usize) -> Self {
        self.config.max_html_tags = limit;
        self
    }

    /// Sets the cache bounds. A zero entry count disables caching.
    pub fn cache_limits(mut self, max_entries: usize, max_bytes: usize) -> Self {
        self.config.cache_max_entries = max_entries;
        self.config.cache_max_bytes = max_bytes;
        self
    }

    pub fn allow_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.url_policy.allowed_protocols =
            protocols.into_iter().map(|s| s.as_ref().to_lowercase()).collect();
        self
    }

    pub fn allow_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.url_policy.allowed_domains =
            domains.into_iter().map(|s| s.as_ref().to_lowercase()).collect();
        self
    }

    /// Constructs the final SanitizerConfig, rejecting unusable limits and
    /// blocklisted schemes.
    pub fn build(self) -> SanitizerResult<SanitizerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SanitizerConfig::default();
        assert_eq!(config.default_level, SecurityLevel::Moderate);
        assert_eq!(config.max_input_bytes, 512 * 1024);
        assert_eq!(config.max_html_depth, 100);
        assert_eq!(config.max_html_tags, 10_000);
        assert_eq!(config.cache_max_entries, 1000);
        assert!(config.url_policy.allows_protocol("https"));
        assert!(config.url_policy.allows_protocol("HTTP:"));
        assert!(!config.url_policy.allows_protocol("ftp"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_blocked_scheme() {
        let result = SanitizerConfig::builder()
            .allow_protocols(["https", "javascript:"])
            .build();
        assert!(matches!(result, Err(SanitizerError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_builder_rejects_zero_limits() {
        assert!(SanitizerConfig::builder().max_input_bytes(0).build().is_err());
        assert!(SanitizerConfig::builder().max_html_depth(0).build().is_err());
        assert!(SanitizerConfig::builder().max_html_tags(0).build().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = SanitizerConfig::from_json(
            r#"{"default_level": "strict", "url_policy": {"allowed_domains": ["cdn.example.com"]}}"#,
        )
        .unwrap();
        assert_eq!(config.default_level, SecurityLevel::Strict);
        assert_eq!(config.max_html_depth, 100);
        // allowed_protocols falls back to the UrlPolicy default
        assert!(config.url_policy.allows_protocol("https"));
        assert!(config.url_policy.allows_host("img.cdn.example.com"));
        assert!(!config.url_policy.allows_host("evil.com"));
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            SanitizerConfig::from_json("{not json"),
            Err(SanitizerError::Serialization(_))
        ));
        assert!(SanitizerConfig::from_json(r#"{"max_input_bytes": 0}"#).is_err());
    }

    #[test]
    fn test_domain_matching() {
        let policy = UrlPolicy::default().with_domains(["example.com"]);
        assert!(policy.allows_host("example.com"));
        assert!(policy.allows_host("a.b.example.com"));
        assert!(policy.allows_host("EXAMPLE.com."));
        assert!(!policy.allows_host("notexample.com"));
        assert!(!policy.allows_host("example.com.evil.net"));
    }
}
