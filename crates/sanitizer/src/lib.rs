//! Marquee's content sanitization engine
//!
//! Operator-supplied HTML widgets, custom CSS themes and media URLs are
//! rendered on unattended signage displays. Everything passes through a
//! [`SanitizerEngine`] first, which filters it against the allowlist of the
//! requested [`SecurityLevel`] and the level-independent blocklist.
//!
//! ```
//! use marquee_sanitizer::{SanitizerEngine, SecurityLevel};
//!
//! let engine = SanitizerEngine::default();
//! let html = engine.sanitize_html(r#"<p onclick="evil()">Hello</p>"#, SecurityLevel::Strict);
//! assert_eq!(html, "<p>Hello</p>");
//! ```

use serde::{Deserialize, Serialize};

pub mod cache;
pub mod config;
pub mod css;
pub mod engine;
pub mod error;
pub mod escape;
pub mod html;
pub mod schema;
pub mod stats;
pub mod url_validator;

pub use cache::{CacheKey, CacheStats, SanitizeCache};
pub use config::{SanitizerConfig, SanitizerConfigBuilder, UrlPolicy};
pub use css::CssSanitizer;
pub use engine::SanitizerEngine;
pub use error::{ContentKind, SanitizerError, SanitizerResult};
pub use html::HtmlSanitizer;
pub use schema::{ConfigSchema, FieldSpec, FieldType, SanitizeMode};
pub use stats::{SanitizerStats, StatsSnapshot};
pub use url_validator::UrlValidator;

pub use marquee_security::{PolicyStore, SecurityLevel};

/// Sanitized output together with the number of constructs removed or rewritten
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizationResult {
    pub sanitized_content: String,
    pub threats_blocked: usize,
}
