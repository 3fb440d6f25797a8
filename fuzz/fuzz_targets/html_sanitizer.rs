#![no_main]

use libfuzzer_sys::fuzz_target;
use marquee_sanitizer::{SanitizerEngine, SecurityLevel};

fuzz_target!(|data: &[u8]| {
    if let Ok(html) = std::str::from_utf8(data) {
        // Limit input size to prevent excessive resource usage
        if html.len() > 10_000 {
            return;
        }

        let engine = SanitizerEngine::default();
        for level in SecurityLevel::ALL {
            let once = engine.sanitize_html(html, level);
            assert!(!once.to_lowercase().contains("<script"));
            assert_eq!(engine.sanitize_html(&once, level), once, "sanitize_html is not idempotent");
        }
    }
});
