/// Which sanitizer an input was destined for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentKind {
    Html,
    Css,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Html => "html",
            ContentKind::Css => "css",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for the sanitization engine.
///
/// None of these cross the engine boundary: the engine logs them and returns
/// an empty result instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SanitizerError {
    #[error("{kind} input too large: {size} bytes (limit {limit})")]
    InputTooLarge {
        kind: ContentKind,
        size: usize,
        limit: usize,
    },

    #[error("Too many tags: {count} (limit {limit})")]
    TooManyTags { count: usize, limit: usize },

    #[error("Nesting too deep: {0}")]
    NestingTooDeep(usize),

    #[error("Blocked URL: {reason}")]
    BlockedUrl { reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid sanitizer configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<url::ParseError> for SanitizerError {
    fn from(e: url::ParseError) -> Self {
        SanitizerError::InvalidUrl(e.to_string())
    }
}

impl From<serde_json::Error> for SanitizerError {
    fn from(e: serde_json::Error) -> Self {
        SanitizerError::Serialization(e.to_string())
    }
}

/// Result type for sanitizer operations
pub type SanitizerResult<T> = Result<T, SanitizerError>;
