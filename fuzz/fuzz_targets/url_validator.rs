#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use marquee_sanitizer::{SanitizerEngine, UrlPolicy};

#[derive(Debug, Arbitrary)]
struct UrlInput {
    url: String,
    protocols: Vec<String>,
    domains: Vec<String>,
}

fuzz_target!(|input: UrlInput| {
    if input.url.len() > 10_000 {
        return;
    }

    let engine = SanitizerEngine::default();
    let policy = UrlPolicy::new(&input.protocols).with_domains(&input.domains);
    let url = engine.sanitize_url(&input.url, &policy);

    // Accepted URLs come back trimmed and unchanged, and stay accepted
    if !url.is_empty() {
        assert_eq!(url, input.url.trim());
        assert_eq!(engine.sanitize_url(&url, &policy), url);
        assert!(!url.to_lowercase().starts_with("javascript:"));
    }
});
