//! Static allowlists per security level and the level-independent blocklist.
//!
//! The policy store is a pure lookup table: it is built once, never mutated,
//! and each looser level is derived from the stricter one so the subset
//! relation Strict ⊂ Moderate ⊂ Permissive holds by construction.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::level::SecurityLevel;

const STRICT_TAGS: &[&str] = &[
    "p", "br", "span", "div", "strong", "em", "b", "i", "u", "s", "small",
    "h1", "h2", "h3", "h4", "h5", "h6",
];
const MODERATE_TAGS: &[&str] = &[
    "a", "img", "ul", "ol", "li", "blockquote", "code", "pre", "hr",
    "table", "thead", "tbody", "tfoot", "tr", "th", "td", "caption",
    "sub", "sup", "mark", "figure", "figcaption",
];
const PERMISSIVE_TAGS: &[&str] = &[
    "section", "article", "header", "footer", "nav", "aside", "main",
    "video", "audio", "source", "picture", "time", "abbr", "dl", "dt", "dd",
    "details", "summary", "wbr",
];

const STRICT_ATTRIBUTES: &[&str] = &["class", "id", "title"];
const MODERATE_ATTRIBUTES: &[&str] = &[
    "href", "src", "alt", "width", "height", "role", "colspan", "rowspan",
    "data-*", "aria-*",
];
const PERMISSIVE_ATTRIBUTES: &[&str] = &[
    "lang", "dir", "controls", "loop", "muted", "poster", "datetime", "type",
    "rel", "target", "name",
];

const STRICT_PROPERTIES: &[&str] = &[
    "color", "background-color", "font-size", "font-weight", "font-style",
    "text-align", "text-decoration", "line-height",
    "margin", "margin-top", "margin-right", "margin-bottom", "margin-left",
    "padding", "padding-top", "padding-right", "padding-bottom", "padding-left",
];
const MODERATE_PROPERTIES: &[&str] = &[
    "font-family", "letter-spacing", "word-spacing", "text-transform",
    "white-space", "vertical-align", "background", "background-image",
    "border", "border-width", "border-style", "border-color", "border-radius",
    "border-top", "border-right", "border-bottom", "border-left",
    "width", "height", "min-width", "min-height", "max-width", "max-height",
    "display", "opacity", "visibility", "overflow",
];
const PERMISSIVE_PROPERTIES: &[&str] = &[
    "position", "top", "right", "bottom", "left", "z-index",
    "flex", "flex-direction", "flex-wrap", "flex-grow", "flex-shrink", "flex-basis",
    "justify-content", "align-items", "align-content", "align-self", "order", "gap",
    "grid-template-columns", "grid-template-rows", "grid-column", "grid-row", "grid-gap",
    "transform", "transition", "animation", "animation-name", "animation-duration",
    "animation-delay", "animation-iteration-count", "box-shadow", "text-shadow",
    "background-size", "background-position", "background-repeat", "outline-color",
];

const BLOCKED_PROPERTIES: &[&str] = &[
    "expression", "behavior", "binding", "-moz-binding", "-webkit-binding",
    "-ms-behavior", "-ms-filter",
];

/// Element names a stylesheet may never target.
const BLOCKED_SELECTOR_TOKENS: &[&str] = &[
    "html", "head", "body", "script", "style", "iframe", "object", "embed",
    "meta", "link", "base", "title",
];

const BLOCKED_SCHEMES: &[&str] = &["javascript", "vbscript"];

const EVENT_HANDLER_PREFIX: &str = "on";

lazy_static! {
    static ref BLOCKED_SELECTOR: Regex = Regex::new(&format!(
        r"(?i)(?:^|[^a-z0-9_.#-])(?:{})(?:$|[^a-z0-9_-])",
        BLOCKED_SELECTOR_TOKENS.join("|")
    ))
    .expect("blocked selector pattern is valid");
}

fn to_set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Tags, attribute patterns and CSS properties permitted at one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allowlist {
    tags: HashSet<String>,
    /// Exact names or `prefix*` wildcards
    attribute_patterns: HashSet<String>,
    css_properties: HashSet<String>,
}

impl Allowlist {
    pub fn new(tags: &[&str], attribute_patterns: &[&str], css_properties: &[&str]) -> Self {
        Self {
            tags: to_set(tags),
            attribute_patterns: to_set(attribute_patterns),
            css_properties: to_set(css_properties),
        }
    }

    /// A looser allowlist containing everything in `self` plus the given entries.
    pub fn widen(&self, tags: &[&str], attribute_patterns: &[&str], css_properties: &[&str]) -> Self {
        let mut widened = self.clone();
        widened.tags.extend(to_set(tags));
        widened.attribute_patterns.extend(to_set(attribute_patterns));
        widened.css_properties.extend(to_set(css_properties));
        widened
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_lowercase())
    }

    /// Exact match, or a `prefix*` pattern matching a longer name.
    pub fn allows_attribute(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        if self.attribute_patterns.contains(&name) {
            return true;
        }
        self.attribute_patterns.iter().any(|pattern| {
            pattern
                .strip_suffix('*')
                .map_or(false, |prefix| name.len() > prefix.len() && name.starts_with(prefix))
        })
    }

    pub fn allows_css_property(&self, property: &str) -> bool {
        self.css_properties.contains(&property.to_lowercase())
    }

    /// True when every entry of `self` is also in `other`.
    pub fn is_subset(&self, other: &Allowlist) -> bool {
        self.tags.is_subset(&other.tags)
            && self.attribute_patterns.is_subset(&other.attribute_patterns)
            && self.css_properties.is_subset(&other.css_properties)
    }
}

/// Constructs rejected at every security level.
#[derive(Debug, Clone)]
pub struct Blocklist {
    css_properties: HashSet<String>,
    schemes: HashSet<String>,
}

impl Default for Blocklist {
    fn default() -> Self {
        Self {
            css_properties: to_set(BLOCKED_PROPERTIES),
            schemes: to_set(BLOCKED_SCHEMES),
        }
    }
}

impl Blocklist {
    pub fn is_blocked_property(&self, property: &str) -> bool {
        self.css_properties.contains(&property.trim().to_lowercase())
    }

    /// Accepts a scheme with or without its trailing colon.
    pub fn is_blocked_scheme(&self, scheme: &str) -> bool {
        let scheme = scheme.trim().trim_end_matches(':').to_lowercase();
        self.schemes.contains(&scheme)
    }

    pub fn is_event_handler_attribute(&self, name: &str) -> bool {
        name.trim().to_lowercase().starts_with(EVENT_HANDLER_PREFIX)
    }

    /// Whether a selector targets a blocked element or can escape the style context.
    ///
    /// Element tokens only match at identifier boundaries, so `.body-text`
    /// and `#header` pass while `body`, `div > script` and `:not(html)` do not.
    pub fn selector_is_blocked(&self, selector: &str) -> bool {
        if selector.contains('<') || selector.contains('\\') {
            return true;
        }
        if selector.to_lowercase().contains(":root") {
            return true;
        }
        BLOCKED_SELECTOR.is_match(selector)
    }

    pub fn blocked_properties(&self) -> &HashSet<String> {
        &self.css_properties
    }
}

/// Lookup table from security level to allowlist.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    strict: Allowlist,
    moderate: Allowlist,
    permissive: Allowlist,
    blocklist: Blocklist,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyStore {
    pub fn new() -> Self {
        let strict = Allowlist::new(STRICT_TAGS, STRICT_ATTRIBUTES, STRICT_PROPERTIES);
        let moderate = strict.widen(MODERATE_TAGS, MODERATE_ATTRIBUTES, MODERATE_PROPERTIES);
        let permissive = moderate.widen(PERMISSIVE_TAGS, PERMISSIVE_ATTRIBUTES, PERMISSIVE_PROPERTIES);

        Self {
            strict,
            moderate,
            permissive,
            blocklist: Blocklist::default(),
        }
    }

    pub fn allowlist(&self, level: SecurityLevel) -> &Allowlist {
        match level {
            SecurityLevel::Strict => &self.strict,
            SecurityLevel::Moderate => &self.moderate,
            SecurityLevel::Permissive => &self.permissive,
        }
    }

    /// Look up a level by name; unknown names get the strict allowlist.
    pub fn allowlist_named(&self, name: &str) -> &Allowlist {
        self.allowlist(SecurityLevel::parse_or_strict(name))
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }
}
