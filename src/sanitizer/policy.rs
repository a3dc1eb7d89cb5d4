use std::collections::{HashMap, HashSet};

/// Tags allowed in user-authored rich text (posts and comments).
pub const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "caption", "b", "blockquote", "code", "em", "h1", "h2", "h3", "h4",
    "h5", "h6", "i", "li", "ol", "p", "strong", "table", "tbody", "td", "tr", "ul",
];

/// Per-tag attribute allow-list.
pub const ALLOWED_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "title"]),
    ("abbr", &["title"]),
    ("acronym", &["title"]),
    ("table", &["border"]),
];

pub const ALLOWED_PROTOCOLS: &[&str] = &["http", "https", "mailto"];

/// Attributes whose value is a URI and must pass the protocol allow-list.
pub const URI_ATTRIBUTES: &[&str] = &[
    "href",
    "src",
    "cite",
    "action",
    "formaction",
    "background",
    "poster",
    "longdesc",
    "xlink:href",
];

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose content a browser reads as raw text. When not allowed, their tags are
/// escaped even by a stripping policy so the enclosed code stays visibly inert.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// SanitizationPolicy
///
/// Allow-lists plus the strip-vs-escape switches that drive [`crate::sanitizer::clean`].
/// A policy is assembled with the consuming `with_*` methods and is read-only afterwards;
/// the application builds one at startup and shares it behind an `Arc`.
///
/// Attributes listed under the tag `"*"` are allowed on every allowed tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationPolicy {
    tags: HashSet<String>,
    attributes: HashMap<String, HashSet<String>>,
    protocols: HashSet<String>,
    strip: bool,
    strip_comments: bool,
}

impl SanitizationPolicy {
    /// An empty policy: no tags, no attributes, no protocols. Disallowed markup is escaped and
    /// comments are stripped.
    pub fn empty() -> Self {
        Self {
            tags: HashSet::new(),
            attributes: HashMap::new(),
            protocols: HashSet::new(),
            strip: false,
            strip_comments: true,
        }
    }

    /// The fixed policy applied to every user-supplied field of the blog.
    pub fn blog() -> Self {
        let mut policy = Self::empty()
            .with_tags(ALLOWED_TAGS.iter().copied())
            .with_protocols(ALLOWED_PROTOCOLS.iter().copied())
            .strip(true)
            .strip_comments(true);
        for (tag, attrs) in ALLOWED_ATTRIBUTES {
            policy = policy.with_attributes(tag, attrs.iter().copied());
        }
        policy
    }

    pub fn with_tags<'a>(mut self, tags: impl IntoIterator<Item = &'a str>) -> Self {
        self.tags
            .extend(tags.into_iter().map(|t| t.to_ascii_lowercase()));
        self
    }

    pub fn without_tag(mut self, tag: &str) -> Self {
        self.tags.remove(&tag.to_ascii_lowercase());
        self
    }

    pub fn with_attributes<'a>(
        mut self,
        tag: &str,
        attributes: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.attributes
            .entry(tag.to_ascii_lowercase())
            .or_default()
            .extend(attributes.into_iter().map(|a| a.to_ascii_lowercase()));
        self
    }

    pub fn with_protocols<'a>(mut self, protocols: impl IntoIterator<Item = &'a str>) -> Self {
        self.protocols
            .extend(protocols.into_iter().map(|p| p.to_ascii_lowercase()));
        self
    }

    /// `true` removes disallowed markup, `false` escapes it into visible text. Tags of
    /// [`RAW_TEXT_ELEMENTS`] are escaped either way.
    pub fn strip(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }

    pub fn strip_comments(mut self, strip_comments: bool) -> Self {
        self.strip_comments = strip_comments;
        self
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn allows_attribute(&self, tag: &str, attribute: &str) -> bool {
        [tag, "*"].iter().any(|key| {
            self.attributes
                .get(*key)
                .is_some_and(|allowed| allowed.contains(attribute))
        })
    }

    pub fn allows_protocol(&self, protocol: &str) -> bool {
        self.protocols.contains(protocol)
    }

    pub fn strips_disallowed(&self) -> bool {
        self.strip
    }

    pub fn strips_comments(&self) -> bool {
        self.strip_comments
    }
}

impl Default for SanitizationPolicy {
    fn default() -> Self {
        Self::blog()
    }
}

pub fn is_uri_attribute(attribute: &str) -> bool {
    URI_ATTRIBUTES.contains(&attribute)
}

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}
