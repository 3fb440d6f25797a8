//! Entity escaping and the dangerous-construct strip shared by every sanitizer.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Applied in order; whole `url(...)` tokens go first so their payload
    /// is removed along with the scheme.
    static ref DANGEROUS_PATTERNS: Vec<Regex> = [
        concat!(
            r#"(?i)url\s*\(\s*(?:"#,
            r#""\s*(?:javascript\s*:|data\s*:\s*text/html)[^"]*"|"#,
            r#"'\s*(?:javascript\s*:|data\s*:\s*text/html)[^']*'|"#,
            r#"(?:javascript\s*:|data\s*:\s*text/html)[^()]*(?:\([^()]*\)[^()]*)*"#,
            r#")\s*\)"#,
        ),
        r"(?i)javascript\s*:",
        r"(?i)vbscript\s*:",
        r"(?i)data\s*:\s*text/html",
        r"(?i)expression\s*\(",
        r"(?i)@import",
        r"(?i)behavior\s*:",
        r"(?i)binding\s*:",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("dangerous construct pattern is valid"))
    .collect();
}

/// Entity-escape `< > & " '`.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Remove script-capable constructs wherever they occur, case-insensitively.
///
/// Runs to a fixpoint: `javajavascript:script:` must not collapse into a
/// live `javascript:` after a single pass.
pub fn strip_dangerous(input: &str) -> Cow<'_, str> {
    let mut current = Cow::Borrowed(input);
    loop {
        let mut changed = false;
        for pattern in DANGEROUS_PATTERNS.iter() {
            if pattern.is_match(&current) {
                let replaced = pattern.replace_all(&current, "").into_owned();
                current = Cow::Owned(replaced);
                changed = true;
            }
        }
        if !changed {
            return current;
        }
    }
}

/// Lowercased copy with ASCII whitespace and control characters removed, for
/// scheme checks that must not be fooled by `java\tscript:`.
pub fn compact_lowercase(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn test_strip_dangerous_constructs() {
        assert_eq!(strip_dangerous("color: expression(alert(1))"), "color: alert(1))");
        assert_eq!(strip_dangerous("JavaScript:alert(1)"), "alert(1)");
        assert_eq!(strip_dangerous("@import 'x.css';"), " 'x.css';");
        assert_eq!(strip_dangerous("background: url(javascript:void 0)"), "background: ");
        assert_eq!(strip_dangerous("url('data:text/html;base64,PHNjcmlwdD4=')"), "");
        assert_eq!(strip_dangerous("a: url(\"javascript:alert(1)\");b"), "a: ;b");
        assert_eq!(strip_dangerous("url(javascript:alert(1)) x"), " x");
        assert_eq!(strip_dangerous("-moz-binding: url(x.xml)"), "-moz- url(x.xml)");
    }

    #[test]
    fn test_strip_dangerous_reaches_fixpoint() {
        assert_eq!(strip_dangerous("javajavascript:script:alert(1)"), "alert(1)");
        assert_eq!(strip_dangerous("expexpression(ression(1)"), "1)");
        let once = strip_dangerous("vbvbscript:script:x").into_owned();
        assert_eq!(strip_dangerous(&once), once);
    }

    #[test]
    fn test_strip_dangerous_borrows_clean_input() {
        assert!(matches!(strip_dangerous("color: red"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_compact_lowercase() {
        assert_eq!(compact_lowercase(" Java\tScript :alert"), "javascript:alert");
    }
}
