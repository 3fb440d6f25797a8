//! Attack-vector tests for the sanitization engine
//!
//! Each test feeds a known injection technique through the public engine
//! surface and checks that nothing executable reaches the display.

use lazy_static::lazy_static;
use regex::Regex;

use marquee_sanitizer::{SanitizerConfig, SanitizerEngine, SecurityLevel, UrlPolicy};

lazy_static! {
    // An event handler attribute inside a real tag; escaped text never matches
    static ref HANDLER_IN_TAG: Regex = Regex::new(r"(?i)<[^>]*\son[a-z]+\s*=").unwrap();
}

fn engine() -> SanitizerEngine {
    SanitizerEngine::default()
}

fn assert_no_script(output: &str) {
    let lower = output.to_lowercase();
    for needle in ["<script", "javascript:", "vbscript:"] {
        assert!(!lower.contains(needle), "{:?} found in {:?}", needle, output);
    }
    assert!(!HANDLER_IN_TAG.is_match(output), "event handler in {:?}", output);
}

#[test]
fn test_classic_xss_payloads() {
    let engine = engine();
    let payloads = [
        "<script>alert('xss')</script>",
        "<img src=x onerror=alert(1)>",
        "<svg onload=alert(1)>",
        "<body onload=alert(1)>",
        "<iframe src=\"javascript:alert(1)\"></iframe>",
        "<a href=\"javascript:alert(1)\">click</a>",
        "<a href=\"JaVaScRiPt:alert(1)\">click</a>",
        "<a href=\"java&#x0A;script:alert(1)\">click</a>",
        "<a href=\"&#106;avascript:alert(1)\">click</a>",
        "<div style=\"background:url(javascript:alert(1))\">x</div>",
        "<math><mtext><table><mglyph><style><img src=x onerror=alert(1)>",
        "<object data=\"data:text/html,<script>alert(1)</script>\"></object>",
        "<embed src=\"javascript:alert(1)\">",
        "<form action=\"javascript:alert(1)\"><button>go</button></form>",
        "<meta http-equiv=\"refresh\" content=\"0;url=javascript:alert(1)\">",
        "<base href=\"javascript:alert(1)//\">",
    ];

    for level in SecurityLevel::ALL {
        for payload in payloads {
            let output = engine.sanitize_html(payload, level);
            assert_no_script(&output);
            assert!(!output.contains("<iframe"));
            assert!(!output.contains("<object"));
            assert!(!output.contains("<embed"));
            assert!(!output.contains("<meta"));
            assert!(!output.contains("<base"));
        }
    }
}

#[test]
fn test_script_text_survives_only_as_text() {
    let engine = engine();
    let output = engine.sanitize_html("<p>before<script>document.cookie</script>after</p>", SecurityLevel::Permissive);
    assert_eq!(output, "<p>beforedocument.cookieafter</p>");
}

#[test]
fn test_mutation_style_markup() {
    let engine = engine();
    let payloads = [
        "<noscript><p title=\"</noscript><img src=x onerror=alert(1)>\">",
        "<p><svg><style><img src=x onerror=alert(1)></style></svg></p>",
        "<template><script>alert(1)</script></template>ok",
        "<!--<img src=x onerror=alert(1)>-->",
        "<![CDATA[<script>alert(1)</script>]]>",
    ];
    for level in SecurityLevel::ALL {
        for payload in payloads {
            let once = engine.sanitize_html(payload, level);
            assert_no_script(&once);
            let twice = engine.sanitize_html(&once, level);
            assert_eq!(once, twice);
        }
    }
}

#[test]
fn test_css_injection_vectors() {
    let engine = engine();
    let payloads = [
        "a { color: expression(alert(1)) }",
        "a { width: expression(alert(1)) }",
        "a { background: url(javascript:alert(1)) }",
        "a { background-image: url('javascript:alert(1)') }",
        "a { background-image: url(\"data:text/html,<script>alert(1)</script>\") }",
        "a { behavior: url(xss.htc) }",
        "a { -moz-binding: url(xss.xml#xss) }",
        "@import 'http://evil.com/x.css'; a { color: #000 }",
        "a { font-family: '</style><script>alert(1)</script>' }",
        "a { width: e\\78 pression(alert(1)) }",
        "a { width: expr/**/ession(alert(1)) }",
        "a { color: #000 } </style><script>alert(1)</script>",
    ];

    for level in SecurityLevel::ALL {
        for payload in payloads {
            let output = engine.sanitize_css(payload, level);
            let lower = output.to_lowercase();
            assert!(!lower.contains("expression"), "{:?} -> {:?}", payload, output);
            assert!(!lower.contains("javascript"));
            assert!(!lower.contains("behavior"));
            assert!(!lower.contains("binding"));
            assert!(!lower.contains("@import"));
            assert!(!lower.contains("</style"));
            assert!(!lower.contains("text/html"));
        }
    }
}

#[test]
fn test_css_selectors_cannot_reach_page_structure() {
    let engine = engine();
    for selector in ["body", "html", "head > title", "iframe", ":root", "div script", "*"] {
        let css = format!("{} {{ color: #000 }}", selector);
        assert_eq!(engine.sanitize_css(&css, SecurityLevel::Permissive), "", "{}", selector);
    }
}

#[test]
fn test_url_vectors() {
    let engine = engine();
    let policy = UrlPolicy::default();
    for url in [
        "javascript:alert(1)",
        " javascript:alert(1)",
        "JAVASCRIPT:alert(1)",
        "java\nscript:alert(1)",
        "vbscript:msgbox(1)",
        "data:text/html;base64,PHNjcmlwdD5hbGVydCgxKTwvc2NyaXB0Pg==",
        "//evil.com/payload",
        "file:///etc/passwd",
        "",
        "http://",
    ] {
        assert_eq!(engine.sanitize_url(url, &policy), "", "{:?} passed", url);
    }
}

#[test]
fn test_domain_allowlist_in_markup() {
    let config = SanitizerConfig::builder()
        .allow_protocols(["https"])
        .allow_domains(["cdn.example.com"])
        .build()
        .unwrap();
    let engine = SanitizerEngine::new(config).unwrap();

    let html = r#"<img alt="a" src="https://cdn.example.com/a.png"><img alt="b" src="https://tracker.evil.net/p.gif">"#;
    assert_eq!(
        engine.sanitize_html(html, SecurityLevel::Moderate),
        r#"<img alt="a" src="https://cdn.example.com/a.png"><img alt="b">"#
    );
}
