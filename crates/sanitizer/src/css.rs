//! Stylesheet sanitization for operator-supplied custom CSS.
//!
//! Only flat `selector { property: value; }` rules survive. At-rules, nested
//! blocks and media queries are dropped as a whole, rules whose selector
//! targets a blocked element are dropped as a whole, and declarations are
//! filtered one by one against the level's property allowlist.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use marquee_security::{PolicyStore, SecurityLevel};

use crate::config::{SanitizerConfig, UrlPolicy};
use crate::error::{ContentKind, SanitizerError, SanitizerResult};
use crate::escape::strip_dangerous;
use crate::url_validator::UrlValidator;
use crate::SanitizationResult;

lazy_static! {
    static ref COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").expect("comment pattern is valid");
    static ref URL_FUNCTION: Regex =
        Regex::new(r#"(?i)url\(\s*("[^"]*"|'[^']*'|[^)"'\s]*)\s*\)"#).expect("url() pattern is valid");
    static ref URL_OPENING: Regex = Regex::new(r"(?i)url\(").expect("url( pattern is valid");
    static ref SAFE_COLOR: Regex = Regex::new(
        r"(?i)^(?:#[0-9a-f]{3}|#[0-9a-f]{6}|rgb\(\s*\d{1,3}\s*,\s*\d{1,3}\s*,\s*\d{1,3}\s*\)|rgba\(\s*\d{1,3}\s*,\s*\d{1,3}\s*,\s*\d{1,3}\s*,\s*(?:0|1|0?\.\d+|1\.0+)\s*\))$"
    )
    .expect("color pattern is valid");
}

const IMPORTANT: &str = "!important";
const COLOR_FALLBACK: &str = "inherit";
const NEUTRALISED_URL: &str = "url(\"\")";

/// A flat style rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selectors: String,
    pub declarations: Vec<Declaration>,
}

/// A single `property: value` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

/// Rule blocks found by the scanner before any validation
#[derive(Debug, Default)]
struct ScannedStylesheet {
    rules: Vec<(String, String)>,
    /// Nested, at-rule, selector-less or unterminated blocks
    dropped_blocks: usize,
}

/// Allowlist-driven CSS filter for one security level at a time
pub struct CssSanitizer<'a> {
    policy: &'a PolicyStore,
    urls: &'a UrlValidator,
    url_policy: &'a UrlPolicy,
    max_input_bytes: usize,
}

impl<'a> CssSanitizer<'a> {
    pub fn new(policy: &'a PolicyStore, urls: &'a UrlValidator, config: &'a SanitizerConfig) -> Self {
        Self {
            policy,
            urls,
            url_policy: &config.url_policy,
            max_input_bytes: config.max_input_bytes,
        }
    }

    /// Sanitize a stylesheet, counting every construct removed or rewritten.
    pub fn sanitize(&self, css: &str, level: SecurityLevel) -> SanitizerResult<SanitizationResult> {
        if css.len() > self.max_input_bytes {
            return Err(SanitizerError::InputTooLarge {
                kind: ContentKind::Css,
                size: css.len(),
                limit: self.max_input_bytes,
            });
        }

        let mut threats = 0;

        let (cleaned, stripped) = strip_comments_and_dangerous(css);
        if stripped {
            tracing::debug!("🚫 Stripped script-capable constructs from stylesheet");
            threats += 1;
        }

        let scanned = scan_rules(&cleaned);
        if scanned.dropped_blocks > 0 {
            tracing::debug!("🚫 Dropped {} nested or at-rule blocks", scanned.dropped_blocks);
            threats += scanned.dropped_blocks;
        }

        let mut sanitized_rules = Vec::new();
        for (selector, body) in &scanned.rules {
            if !self.is_selector_allowed(selector) {
                tracing::debug!("🚫 Dropping rule with blocked selector {:?}", selector);
                threats += 1;
                continue;
            }

            let mut declarations = Vec::new();
            for raw in split_declarations(body) {
                match self.sanitize_declaration(&raw, level, &mut threats) {
                    Some(declaration) => declarations.push(declaration),
                    None => continue,
                }
            }

            if declarations.is_empty() {
                continue;
            }
            sanitized_rules.push(StyleRule {
                selectors: selector.clone(),
                declarations,
            });
        }

        Ok(SanitizationResult {
            sanitized_content: reconstruct_css(&sanitized_rules),
            threats_blocked: threats,
        })
    }

    fn is_selector_allowed(&self, selector: &str) -> bool {
        !self.policy.blocklist().selector_is_blocked(selector) && !is_bare_universal(selector)
    }

    /// Validate one raw `property: value` pair. `None` drops the declaration.
    fn sanitize_declaration(
        &self,
        raw: &str,
        level: SecurityLevel,
        threats: &mut usize,
    ) -> Option<Declaration> {
        let (property, value) = raw.split_once(':')?;
        let property = property.trim().to_lowercase();
        if property.is_empty() {
            return None;
        }

        if self.policy.blocklist().is_blocked_property(&property) {
            tracing::debug!("🚫 Blocked CSS property: {}", property);
            *threats += 1;
            return None;
        }
        if !self.policy.allowlist(level).allows_css_property(&property) {
            tracing::debug!("🚫 CSS property {} not allowed at {} level", property, level);
            *threats += 1;
            return None;
        }

        let (value, important) = split_important(value.trim());

        let stripped = strip_dangerous(value);
        if stripped != value {
            *threats += 1;
        }
        let value = stripped.trim();
        if value.is_empty() {
            return None;
        }

        // Colors are rewritten rather than dropped so the layout keeps its shape
        if is_color_property(&property) {
            let value = if SAFE_COLOR.is_match(value) {
                value.to_string()
            } else {
                if value != COLOR_FALLBACK {
                    tracing::debug!("Replacing unrecognised color {:?} for {}", value, property);
                    *threats += 1;
                }
                COLOR_FALLBACK.to_string()
            };
            return Some(Declaration {
                property,
                value,
                important,
            });
        }

        if value.contains('<')
            || value.contains('\\')
            || value.contains("/*")
            || value.contains("*/")
            || !is_balanced(value)
        {
            tracing::debug!("🚫 Dropping malformed value for {}", property);
            *threats += 1;
            return None;
        }
        if URL_OPENING.find_iter(value).count() != URL_FUNCTION.find_iter(value).count() {
            tracing::debug!("🚫 Dropping unparsable url() in {}", property);
            *threats += 1;
            return None;
        }

        Some(Declaration {
            property,
            value: self.sanitize_urls(value),
            important,
        })
    }

    /// Replace each rejected `url(...)` token with an empty one, leaving the
    /// rest of the value intact.
    fn sanitize_urls(&self, value: &str) -> String {
        URL_FUNCTION
            .replace_all(value, |caps: &Captures| {
                let token = &caps[0];
                let target = caps[1].trim_matches(|c| c == '"' || c == '\'').trim();
                if target.is_empty() {
                    return token.to_string();
                }
                if self.urls.sanitize(target, self.url_policy).is_empty() {
                    NEUTRALISED_URL.to_string()
                } else {
                    token.to_string()
                }
            })
            .into_owned()
    }
}

/// Alternate comment removal and the dangerous-construct strip until neither
/// changes anything. Either one can expose input for the other:
/// `/javascript:*` strips to `/*`, and `expres/**/sion(` loses its comment.
///
/// The flag reports whether the dangerous-construct strip removed anything.
fn strip_comments_and_dangerous(css: &str) -> (String, bool) {
    let mut current = css.to_string();
    let mut stripped = false;
    loop {
        let uncommented = strip_comments(&current);
        let cleaned = strip_dangerous(&uncommented);
        if cleaned != uncommented {
            stripped = true;
        }
        if cleaned == current {
            return (current, stripped);
        }
        current = cleaned.into_owned();
    }
}

/// Remove comments; an unterminated comment swallows the rest of the input.
fn strip_comments(css: &str) -> String {
    let mut uncommented = COMMENT.replace_all(css, "").into_owned();
    if let Some(start) = uncommented.find("/*") {
        uncommented.truncate(start);
    }
    uncommented
}

/// Single-level brace scanner. Only blocks with no inner braces become rules.
fn scan_rules(css: &str) -> ScannedStylesheet {
    let mut scanned = ScannedStylesheet::default();
    let mut selector = String::new();
    let mut body = String::new();
    let mut depth = 0usize;
    let mut nested = false;

    for c in css.chars() {
        match (c, depth) {
            ('{', 0) => {
                depth = 1;
                nested = false;
                body.clear();
            }
            ('{', _) => {
                depth += 1;
                nested = true;
            }
            ('}', 0) => selector.clear(),
            ('}', 1) => {
                depth = 0;
                let trimmed = selector.trim();
                if nested || trimmed.is_empty() || trimmed.starts_with('@') {
                    scanned.dropped_blocks += 1;
                } else {
                    scanned.rules.push((trimmed.to_string(), std::mem::take(&mut body)));
                }
                selector.clear();
            }
            ('}', _) => depth -= 1,
            // A top-level statement such as `@charset "x";` ends here
            (';', 0) => {
                if !selector.trim().is_empty() {
                    scanned.dropped_blocks += 1;
                }
                selector.clear();
            }
            (_, 0) => selector.push(c),
            (_, 1) => body.push(c),
            _ => {}
        }
    }

    if depth > 0 {
        scanned.dropped_blocks += 1;
    }
    scanned
}

/// Split a declaration block on `;` outside parentheses and quotes, so
/// `url(data:image/png;base64,...)` stays in one piece.
fn split_declarations(body: &str) -> Vec<String> {
    let mut declarations = Vec::new();
    let mut current = String::new();
    let mut parens = 0usize;
    let mut quote: Option<char> = None;

    for c in body.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                parens += 1;
                current.push(c);
            }
            ')' => {
                parens = parens.saturating_sub(1);
                current.push(c);
            }
            ';' if parens == 0 => declarations.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    declarations.push(current);

    declarations
        .into_iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect()
}

fn split_important(value: &str) -> (&str, bool) {
    let lower = value.to_ascii_lowercase();
    if lower.ends_with(IMPORTANT) {
        (value[..value.len() - IMPORTANT.len()].trim_end(), true)
    } else {
        (value, false)
    }
}

/// Quotes closed and parentheses matched.
fn is_balanced(value: &str) -> bool {
    let mut parens = 0i64;
    let mut quote: Option<char> = None;
    for c in value.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') => parens += 1,
            (None, ')') => {
                parens -= 1;
                if parens < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    quote.is_none() && parens == 0
}

/// A selector list where some entry is only `*` and combinators.
fn is_bare_universal(selector: &str) -> bool {
    selector.split(',').any(|part| {
        let significant: Vec<char> = part
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '>' | '+' | '~'))
            .collect();
        !significant.is_empty() && significant.iter().all(|&c| c == '*')
    })
}

fn is_color_property(property: &str) -> bool {
    property == "color" || property.contains("color") || property == "background"
}

/// Reassemble rules as `selector {` / `  property: value;` / `}` blocks.
fn reconstruct_css(rules: &[StyleRule]) -> String {
    rules
        .iter()
        .map(|rule| {
            let declarations = rule
                .declarations
                .iter()
                .map(|d| {
                    format!(
                        "  {}: {}{};",
                        d.property,
                        d.value,
                        if d.important { " !important" } else { "" }
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("{} {{\n{}\n}}", rule.selectors, declarations)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
