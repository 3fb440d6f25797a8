#![no_main]

use libfuzzer_sys::fuzz_target;
use marquee_sanitizer::{ConfigSchema, FieldSpec, FieldType, SanitizeMode, SanitizerEngine};

fuzz_target!(|data: &[u8]| {
    let value: serde_json::Value = match serde_json::from_slice(data) {
        Ok(value) => value,
        Err(_) => return,
    };

    let schema = ConfigSchema::new()
        .field("html", FieldSpec::new(FieldType::String).sanitize(SanitizeMode::Html))
        .field("css", FieldSpec::new(FieldType::String).sanitize(SanitizeMode::Css))
        .field("url", FieldSpec::new(FieldType::String).sanitize(SanitizeMode::Url))
        .field("count", FieldSpec::new(FieldType::Number));

    let engine = SanitizerEngine::default();
    let validated = engine.validate_config(&value, &schema);
    assert!(validated.is_object());
});
