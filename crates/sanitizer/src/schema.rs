//! Field schemas for `SanitizerEngine::validate_config`.
//!
//! A schema is a JSON object mapping field names to `{ "type": ..., "sanitize": ..., "level": ... }`:
//!
//! ```json
//! {
//!   "title":     { "type": "string", "sanitize": "html" },
//!   "theme_css": { "type": "string", "sanitize": "css", "level": "strict" },
//!   "refresh":   { "type": "number" }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use marquee_security::SecurityLevel;

use crate::error::SanitizerResult;

/// JSON type a field must have to survive validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// Any JSON value, including null
    Any,
}

impl FieldType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Any => true,
        }
    }
}

/// How a string field is cleaned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizeMode {
    Html,
    Css,
    Url,
    /// Entity-escape the whole value
    Escape,
}

impl Default for SanitizeMode {
    fn default() -> Self {
        SanitizeMode::Escape
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitize: Option<SanitizeMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<SecurityLevel>,
}

impl FieldSpec {
    pub fn new(kind: FieldType) -> Self {
        Self {
            kind,
            sanitize: None,
            level: None,
        }
    }

    pub fn sanitize(mut self, mode: SanitizeMode) -> Self {
        self.sanitize = Some(mode);
        self
    }

    pub fn level(mut self, level: SecurityLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn mode(&self) -> SanitizeMode {
        self.sanitize.unwrap_or_default()
    }
}

/// Declared fields of a configuration object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSchema {
    fields: BTreeMap<String, FieldSpec>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> SanitizerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
