//! Security levels controlling how large the allowlists are.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};

/// Security level requested by a caller.
///
/// Each level's allowlists are a proper subset of the next looser level's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Text formatting only
    Strict,
    /// Links, images, lists and tables
    Moderate,
    /// Media and sectioning elements, layout and motion properties
    Permissive,
}

impl Default for SecurityLevel {
    fn default() -> Self {
        SecurityLevel::Moderate
    }
}

impl SecurityLevel {
    /// All shipped levels, strictest first.
    pub const ALL: [SecurityLevel; 3] = [
        SecurityLevel::Strict,
        SecurityLevel::Moderate,
        SecurityLevel::Permissive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityLevel::Strict => "strict",
            SecurityLevel::Moderate => "moderate",
            SecurityLevel::Permissive => "permissive",
        }
    }

    /// Parse a level name, substituting `Strict` for anything unrecognised.
    ///
    /// Level names arrive from operator-editable configuration, so an unknown
    /// name must never widen what is allowed.
    pub fn parse_or_strict(name: &str) -> Self {
        match name.parse() {
            Ok(level) => level,
            Err(_) => {
                log::warn!("Unknown security level {:?}, falling back to strict", name);
                SecurityLevel::Strict
            }
        }
    }
}

impl FromStr for SecurityLevel {
    type Err = PolicyError;

    fn from_str(s: &str) -> PolicyResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(SecurityLevel::Strict),
            "moderate" => Ok(SecurityLevel::Moderate),
            "permissive" => Ok(SecurityLevel::Permissive),
            other => Err(PolicyError::UnknownLevel(other.to_string())),
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
