use std::{collections::HashMap, fmt};

use serde::Serialize;

mod lexer;
mod policy;

use lexer::{Lexer, StartTag, Token};
pub use policy::{
    ALLOWED_ATTRIBUTES, ALLOWED_PROTOCOLS, ALLOWED_TAGS, RAW_TEXT_ELEMENTS, SanitizationPolicy,
    is_raw_text_element, is_uri_attribute, is_void_element,
};

/// SafeText
///
/// Text that has passed through the sanitizer and may be stored or rendered. [`clean`] is the
/// only constructor, and the repository takes `SafeText` for every user-authored field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SafeText(String);

impl SafeText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// True when nothing but whitespace survived sanitization.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl AsRef<str> for SafeText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sanitizer
///
/// Owns the process-wide [`SanitizationPolicy`]. It holds no per-call state, so one instance
/// is shared by every request.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    policy: SanitizationPolicy,
}

impl Sanitizer {
    pub fn new(policy: SanitizationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SanitizationPolicy {
        &self.policy
    }

    pub fn clean(&self, text: &str) -> SafeText {
        clean(text, &self.policy)
    }
}

/// Sanitizes `text` against `policy`.
///
/// Allowed elements are re-serialized with only their allowed attributes; elements that are
/// not allowed are removed or escaped according to [`SanitizationPolicy::strip`], while their
/// children are sanitized on their own merits. `<script>` and `<style>` tags are always
/// escaped when not allowed. Allowed elements are balanced, so the output never leaves an
/// element open. The result is stable: cleaning it again yields the same text.
pub fn clean(text: &str, policy: &SanitizationPolicy) -> SafeText {
    let mut out = String::with_capacity(text.len());
    let mut open: Vec<String> = Vec::new();
    let mut open_counts: HashMap<String, usize> = HashMap::new();

    for token in Lexer::new(text) {
        match token {
            Token::Text(text) => escape_text(text, &mut out),
            Token::StartTag(tag) => {
                if !policy.allows_tag(&tag.name) {
                    disallowed(Some(&tag.name), tag.raw, policy, &mut out);
                    continue;
                }
                write_start_tag(&tag, policy, &mut out);
                if !is_void_element(&tag.name) {
                    *open_counts.entry(tag.name.clone()).or_default() += 1;
                    open.push(tag.name);
                }
            }
            Token::EndTag { name, raw } => {
                if !policy.allows_tag(&name) {
                    disallowed(Some(&name), raw, policy, &mut out);
                    continue;
                }
                // End tags with no matching open element are dropped.
                if open_counts.get(&name).copied().unwrap_or(0) == 0 {
                    continue;
                }
                if let Some(at) = open.iter().rposition(|n| *n == name) {
                    for name in open.drain(at..).rev() {
                        if let Some(count) = open_counts.get_mut(&name) {
                            *count -= 1;
                        }
                        write_end_tag(&name, &mut out);
                    }
                }
            }
            Token::Comment(body) => {
                if !policy.strips_comments() {
                    out.push_str("<!--");
                    out.push_str(body);
                    out.push_str("-->");
                }
            }
            Token::Declaration(raw) => disallowed(None, raw, policy, &mut out),
        }
    }

    for name in open.into_iter().rev() {
        write_end_tag(&name, &mut out);
    }

    SafeText(out)
}

fn disallowed(tag: Option<&str>, raw: &str, policy: &SanitizationPolicy, out: &mut String) {
    if !policy.strips_disallowed() || tag.is_some_and(is_raw_text_element) {
        escape_text(raw, out);
    }
}

fn write_start_tag(tag: &StartTag<'_>, policy: &SanitizationPolicy, out: &mut String) {
    out.push('<');
    out.push_str(&tag.name);
    for attr in &tag.attributes {
        if !policy.allows_attribute(&tag.name, &attr.name) {
            continue;
        }
        match &attr.value {
            Some(value) => {
                if is_uri_attribute(&attr.name) && !uri_allowed(value, policy) {
                    continue;
                }
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
            None => {
                out.push(' ');
                out.push_str(&attr.name);
            }
        }
    }
    out.push('>');
}

fn write_end_tag(name: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Relative URIs pass; absolute ones must use an allowed protocol. Whitespace and control
/// characters are ignored when reading the scheme, as browsers do.
fn uri_allowed(value: &str, policy: &SanitizationPolicy) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    match normalized.find([':', '/', '?', '#']) {
        Some(at) if normalized.as_bytes()[at] == b':' => policy.allows_protocol(&normalized[..at]),
        _ => true,
    }
}

/// Escapes `<`, `>` and any `&` that does not start a character reference. Existing
/// references are kept so escaping twice is the same as escaping once.
fn escape_text(text: &str, out: &mut String) {
    for (at, c) in text.char_indices() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' if is_char_reference(&text[at + 1..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
}

/// Whether `rest` (the text after an `&`) is `name;`, `#digits;` or `#xhex;`.
fn is_char_reference(rest: &str) -> bool {
    let end = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'#')
        .count();
    if rest.as_bytes().get(end) != Some(&b';') {
        return false;
    }
    let body = &rest[..end];
    if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some(digits) = body.strip_prefix('#') {
        return !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit());
    }
    let mut chars = body.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric())
}
