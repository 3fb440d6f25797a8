#![no_main]

use libfuzzer_sys::fuzz_target;
use marquee_sanitizer::{SanitizerEngine, SecurityLevel};

fuzz_target!(|data: &[u8]| {
    if let Ok(css) = std::str::from_utf8(data) {
        if css.len() > 10_000 {
            return;
        }

        let engine = SanitizerEngine::default();
        for level in SecurityLevel::ALL {
            let once = engine.sanitize_css(css, level);
            let lower = once.to_lowercase();
            assert!(!lower.contains("expression("));
            assert!(!lower.contains("javascript:"));
            assert!(!lower.contains("@import"));
            assert!(!once.contains('<'));
            assert_eq!(engine.sanitize_css(&once, level), once, "sanitize_css is not idempotent");
        }
    }
});
