//! XML utility functions for inline markup fragments.
//!
//! Fragments handled here are tiny and come from a single controlled
//! markup dialect, so most helpers work on the verbatim serialization of
//! an element (its byte range in the parsed input) rather than on a
//! re-serialized form.

use regex::Regex;
use roxmltree::Node;
use std::sync::LazyLock;

use crate::config::FRAGMENT_ROOT;

/// Any tag-like markup.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.+?>").expect("valid regex"));

/// Single-level tag pair: start tag, inner content, end tag.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static TAG_PAIR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(<.+?>)(.+?)(</.+?>)").expect("valid regex"));

/// Self-closing placeholder tag such as `<ph id="1"/>`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SELF_CLOSING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^<]+?)\b\s*[^<]*?/>").expect("valid regex"));

/// Named start, end or self-closing tag. Stricter than [`TAG_PATTERN`] so
/// that a bare `<` in unescaped text is not taken for markup.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NAMED_TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[A-Za-z_][\w.:-]*(?:\s[^<>]*)?/?>").expect("valid regex")
});

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use markup_cleanup::xml::get_tag_name;
///
/// let doc = Document::parse(r#"<root><cf bold="True">x</cf></root>"#).unwrap();
/// let cf = doc.root_element().first_element_child().unwrap();
/// assert_eq!(get_tag_name(cf), "cf");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Get the verbatim serialization of a node from the parsed input.
pub fn raw_markup<'input>(node: Node<'_, 'input>) -> &'input str {
    let input = node.document().input_text();
    &input[node.range()]
}

/// Check whether an element was written in self-closing form (`<x/>`).
///
/// `<x></x>` is not self-closing even though it has no children.
pub fn is_self_closing(node: Node<'_, '_>) -> bool {
    node.is_element() && !node.has_children() && raw_markup(node).ends_with("/>")
}

/// Check whether an element has any element children.
pub fn has_element_children(node: Node<'_, '_>) -> bool {
    node.children().any(|child| child.is_element())
}

/// Collect the attributes of an element as ordered name/value pairs.
pub fn attributes(node: Node<'_, '_>) -> Vec<(String, String)> {
    node.attributes()
        .map(|attr| (attr.name().to_string(), attr.value().to_string()))
        .collect()
}

/// Verbatim parts of a non-self-closing element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementParts<'input> {
    /// Start tag, e.g. `<cf bold="True">`.
    pub start_tag: &'input str,
    /// Raw markup between the start and end tag.
    pub inner: &'input str,
    /// End tag, e.g. `</cf>`.
    pub end_tag: &'input str,
}

/// Split an element into start tag, inner markup and end tag.
///
/// Returns `None` for self-closing elements and non-elements.
pub fn split_element<'input>(node: Node<'_, 'input>) -> Option<ElementParts<'input>> {
    if !node.is_element() || is_self_closing(node) {
        return None;
    }

    let input = node.document().input_text();
    let range = node.range();
    let raw = &input[range.clone()];
    let end_tag_start = range.start + raw.rfind("</")?;

    let (inner_start, inner_end) = match (node.first_child(), node.last_child()) {
        (Some(first), Some(last)) => (first.range().start, last.range().end),
        _ => (end_tag_start, end_tag_start),
    };

    Some(ElementParts {
        start_tag: &input[range.start..inner_start],
        inner: &input[inner_start..inner_end],
        end_tag: &input[inner_end..range.end],
    })
}

/// Check if text contains anything that looks like a tag.
pub fn contains_tags(text: &str) -> bool {
    TAG_PATTERN.is_match(text)
}

/// Match of the single-level tag pair pattern on plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagPairMatch<'t> {
    /// Text before the start tag.
    pub before: &'t str,
    /// Start tag.
    pub start_tag: &'t str,
    /// Content between the tags.
    pub inner: &'t str,
    /// End tag.
    pub end_tag: &'t str,
    /// Text after the end tag.
    pub after: &'t str,
}

/// Match the first `(<start>)(inner)(</end>)` group in a string.
///
/// This is a textual match used where the text is not guaranteed to be
/// well-formed markup (e.g. the output of a case conversion).
pub fn match_tag_pair(text: &str) -> Option<TagPairMatch<'_>> {
    let caps = TAG_PAIR_PATTERN.captures(text)?;
    let whole = caps.get(0)?;
    Some(TagPairMatch {
        before: &text[..whole.start()],
        start_tag: caps.get(1)?.as_str(),
        inner: caps.get(2)?.as_str(),
        end_tag: caps.get(3)?.as_str(),
        after: &text[whole.end()..],
    })
}

/// Piece of text split around self-closing placeholder tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'t> {
    /// Plain text between placeholders.
    Text(&'t str),
    /// Verbatim placeholder tag.
    Placeholder(&'t str),
}

/// Split text into plain pieces and self-closing placeholder tags.
///
/// Empty text pieces are dropped. Returns an empty vector when the text
/// holds no placeholder tag at all.
pub fn split_placeholders(text: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut last = 0;

    for m in SELF_CLOSING_PATTERN.find_iter(text) {
        if m.start() > last {
            pieces.push(Piece::Text(&text[last..m.start()]));
        }
        pieces.push(Piece::Placeholder(m.as_str()));
        last = m.end();
    }

    if pieces.is_empty() {
        return pieces;
    }
    if last < text.len() {
        pieces.push(Piece::Text(&text[last..]));
    }
    pieces
}

/// Wrap a fragment in the synthetic root element so it parses as one document.
pub fn wrap_fragment(fragment: &str) -> String {
    format!("<{FRAGMENT_ROOT}>{fragment}</{FRAGMENT_ROOT}>")
}

/// Escape text for inclusion in markup.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape the text between the tags of unescaped markup.
///
/// Tags are copied verbatim, everything else goes through [`escape_text`].
///
/// # Examples
/// ```
/// use markup_cleanup::xml::escape_outside_tags;
///
/// assert_eq!(
///     escape_outside_tags("<b>Tom & Jerry</b>"),
///     "<b>Tom &amp; Jerry</b>"
/// );
/// ```
pub fn escape_outside_tags(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut last = 0;
    for m in NAMED_TAG_PATTERN.find_iter(text) {
        escaped.push_str(&escape_text(&text[last..m.start()]));
        escaped.push_str(m.as_str());
        last = m.end();
    }
    escaped.push_str(&escape_text(&text[last..]));
    escaped
}

/// Reverse [`escape_text`] and the quote entities.
pub fn unescape_text(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
