//! Policy specific errors for the Marquee sanitization engine.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Unknown security level: {0}")]
    UnknownLevel(String),
}

pub type PolicyResult<T> = Result<T, PolicyError>;
