//! Tree-based HTML sanitization.
//!
//! Input is parsed with kuchiki (html5ever's tree builder) and the resulting
//! tree is re-serialized node by node. Disallowed elements are unwrapped:
//! the tag goes, its sanitized children stay in place.

use kuchiki::traits::*;
use kuchiki::{ElementData, NodeData, NodeRef};

use marquee_security::{Allowlist, Blocklist, PolicyStore, SecurityLevel};

use crate::config::{SanitizerConfig, UrlPolicy};
use crate::error::{ContentKind, SanitizerError, SanitizerResult};
use crate::escape::{compact_lowercase, escape_html, strip_dangerous};
use crate::url_validator::UrlValidator;
use crate::SanitizationResult;

/// Elements serialized without an end tag
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "source", "wbr"];

/// Wrappers the tree builder synthesizes around every fragment
const DOCUMENT_WRAPPERS: &[&str] = &["html", "head", "body"];

/// Elements whose leading newline the parser discards
const NEWLINE_ELIDING_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

const URL_ATTRIBUTES: &[&str] = &["href", "src", "poster"];

const SCRIPT_URL_MARKERS: &[&str] = &["javascript:", "vbscript:", "data:text/html"];

/// Re-parse rounds allowed for the output to settle
const MAX_SETTLE_PASSES: usize = 3;

/// Allowlist-driven HTML filter
pub struct HtmlSanitizer<'a> {
    policy: &'a PolicyStore,
    urls: &'a UrlValidator,
    url_policy: &'a UrlPolicy,
    max_input_bytes: usize,
    max_depth: usize,
    max_tags: usize,
}

impl<'a> HtmlSanitizer<'a> {
    pub fn new(policy: &'a PolicyStore, urls: &'a UrlValidator, config: &'a SanitizerConfig) -> Self {
        Self {
            policy,
            urls,
            url_policy: &config.url_policy,
            max_input_bytes: config.max_input_bytes,
            max_depth: config.max_html_depth,
            max_tags: config.max_html_tags,
        }
    }

    pub fn sanitize(&self, html: &str, level: SecurityLevel) -> SanitizerResult<SanitizationResult> {
        if html.len() > self.max_input_bytes {
            return Err(SanitizerError::InputTooLarge {
                kind: ContentKind::Html,
                size: html.len(),
                limit: self.max_input_bytes,
            });
        }

        let tags = count_start_tags(html);
        if tags > self.max_tags {
            return Err(SanitizerError::TooManyTags {
                count: tags,
                limit: self.max_tags,
            });
        }

        let mut result = self.walk(html, level, true);

        // Unwrapped children can sit where the tree builder moves them on the
        // next parse, so re-walk until the output parses back to itself
        for _ in 0..MAX_SETTLE_PASSES {
            let next = self.walk(&result.sanitized_content, level, false);
            let settled = next.sanitized_content == result.sanitized_content;
            result.sanitized_content = next.sanitized_content;
            result.threats_blocked += next.threats_blocked;
            if settled {
                return Ok(result);
            }
        }

        tracing::warn!(
            "⚠️ Markup still changing after {} passes, flattening to text",
            MAX_SETTLE_PASSES
        );
        let document = kuchiki::parse_html().one(result.sanitized_content.as_str());
        Ok(SanitizationResult {
            sanitized_content: escape_html(&document.text_contents()),
            threats_blocked: result.threats_blocked + 1,
        })
    }

    /// One parse and serialization pass. Only the first pass reports URL
    /// checks to the shared counters.
    fn walk(&self, html: &str, level: SecurityLevel, count_urls: bool) -> SanitizationResult {
        let document = kuchiki::parse_html().one(html);

        let mut walk = TreeWalk {
            sanitizer: self,
            allowlist: self.policy.allowlist(level),
            blocklist: self.policy.blocklist(),
            output: String::with_capacity(html.len()),
            threats: 0,
            count_urls,
        };
        walk.children(&document, 0);

        SanitizationResult {
            sanitized_content: walk.output,
            threats_blocked: walk.threats,
        }
    }
}

/// `<` followed by a letter, an upper bound on the start tags in `html`.
fn count_start_tags(html: &str) -> usize {
    html.as_bytes()
        .windows(2)
        .filter(|pair| pair[0] == b'<' && pair[1].is_ascii_alphabetic())
        .count()
}

fn starts_with_newline(node: &NodeRef) -> bool {
    node.first_child()
        .and_then(|child| child.as_text().map(|text| text.borrow().starts_with('\n')))
        .unwrap_or(false)
}

/// State for one serialization pass
struct TreeWalk<'s, 'a> {
    sanitizer: &'s HtmlSanitizer<'a>,
    allowlist: &'s Allowlist,
    blocklist: &'s Blocklist,
    output: String,
    threats: usize,
    count_urls: bool,
}

impl<'s, 'a> TreeWalk<'s, 'a> {
    fn children(&mut self, node: &NodeRef, depth: usize) {
        for child in node.children() {
            self.node(&child, depth);
        }
    }

    fn node(&mut self, node: &NodeRef, depth: usize) {
        match node.data() {
            NodeData::Text(text) => self.output.push_str(&escape_html(&text.borrow())),
            NodeData::Element(element) => self.element(node, element, depth),
            NodeData::Document(_) | NodeData::DocumentFragment => self.children(node, depth + 1),
            // Comments, doctypes and processing instructions never survive
            _ => {}
        }
    }

    fn element(&mut self, node: &NodeRef, element: &ElementData, depth: usize) {
        let tag = element.name.local.to_lowercase();

        if depth >= self.sanitizer.max_depth {
            let err = SanitizerError::NestingTooDeep(self.sanitizer.max_depth);
            tracing::warn!("⚠️ {}, flattening <{}> to text", err, tag);
            self.threats += 1;
            self.output.push_str(&escape_html(&node.text_contents()));
            return;
        }

        if DOCUMENT_WRAPPERS.contains(&tag.as_str()) {
            self.children(node, depth + 1);
            return;
        }

        if !self.allowlist.allows_tag(&tag) {
            tracing::debug!("🚫 Element <{}> stripped, keeping its children", tag);
            self.threats += 1;
            self.children(node, depth + 1);
            return;
        }

        self.output.push('<');
        self.output.push_str(&tag);
        self.attributes(element);
        self.output.push('>');

        if VOID_ELEMENTS.contains(&tag.as_str()) {
            return;
        }
        if NEWLINE_ELIDING_ELEMENTS.contains(&tag.as_str()) && starts_with_newline(node) {
            self.output.push('\n');
        }

        self.children(node, depth + 1);
        self.output.push_str("</");
        self.output.push_str(&tag);
        self.output.push('>');
    }

    fn attributes(&mut self, element: &ElementData) {
        let attributes = element.attributes.borrow();
        for (name, attribute) in attributes.map.iter() {
            let attr_name = name.local.to_lowercase();
            if let Some(value) = self.attribute_value(&attr_name, &attribute.value) {
                self.output.push(' ');
                self.output.push_str(&attr_name);
                self.output.push_str("=\"");
                self.output.push_str(&escape_html(&value));
                self.output.push('"');
            }
        }
    }

    /// The value to emit for an attribute, or `None` to drop it.
    fn attribute_value(&mut self, name: &str, value: &str) -> Option<String> {
        if self.blocklist.is_event_handler_attribute(name) {
            tracing::debug!("🚫 Blocked event handler attribute: {}", name);
            self.threats += 1;
            return None;
        }

        if !self.allowlist.allows_attribute(name) {
            tracing::debug!("🚫 Attribute {} not allowed", name);
            self.threats += 1;
            return None;
        }

        if URL_ATTRIBUTES.contains(&name) {
            let compact = compact_lowercase(value);
            if SCRIPT_URL_MARKERS.iter().any(|marker| compact.contains(marker)) {
                tracing::debug!("🚫 Blocked script URL in {}", name);
                self.threats += 1;
                return None;
            }
            let url = if self.count_urls {
                // The validator counts its own rejections
                self.sanitizer.urls.sanitize(value, self.sanitizer.url_policy)
            } else {
                self.sanitizer
                    .urls
                    .check(value, self.sanitizer.url_policy)
                    .unwrap_or_else(|e| {
                        tracing::debug!("🚫 URL blocked on re-parse: {}", e);
                        self.threats += 1;
                        String::new()
                    })
            };
            if url.is_empty() {
                return None;
            }
            return Some(url);
        }

        Some(strip_dangerous(value).into_owned())
    }
}
