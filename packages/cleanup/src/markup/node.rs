//! Node variants of a segment tree.

use serde::{Deserialize, Serialize};

/// Plain text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    /// Unescaped text content.
    pub text: String,
}

impl TextRun {
    /// Create a new text run.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Atomic, childless inline tag representing opaque content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderTag {
    /// Verbatim tag markup, e.g. `<ph id="1"/>`.
    pub content: String,
    /// Whether the placeholder stands in for a collapsed tag pair.
    pub is_tag_pair: bool,
}

impl PlaceholderTag {
    /// Create a placeholder tag from its markup.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_tag_pair: false,
        }
    }
}

/// One formatting property carried by a start tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattingItem {
    pub name: String,
    pub value: String,
}

/// Ordered formatting properties of a start tag.
///
/// Names are unique; setting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formatting {
    items: Vec<FormattingItem>,
}

impl Formatting {
    /// Create empty formatting.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, or merge it into the existing item with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.items.iter_mut().find(|item| item.name == name) {
            Some(item) => item.value = value,
            None => self.items.push(FormattingItem { name, value }),
        }
    }

    /// Look up a value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .map(|item| item.value.as_str())
    }

    /// Iterate items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FormattingItem> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Formatting {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut formatting = Self::new();
        for (name, value) in iter {
            formatting.set(name, value);
        }
        formatting
    }
}

/// Paired start/end inline tag. Its children live in the owning segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPair {
    /// Verbatim start tag, e.g. `<cf bold="True">`.
    pub start_tag_content: String,
    /// Text shown for the start tag in an editor.
    pub display_text: String,
    /// Verbatim end tag, e.g. `</cf>`.
    pub end_tag_content: String,
    /// Formatting applied by this tag pair.
    pub formatting: Formatting,
    /// Opaque tag metadata; values may embed quoted attribute values.
    pub metadata: Vec<(String, String)>,
}

impl TagPair {
    /// Create a tag pair from its start and end tags.
    #[must_use]
    pub fn new(start_tag: impl Into<String>, end_tag: impl Into<String>) -> Self {
        let start_tag_content = start_tag.into();
        Self {
            display_text: start_tag_content.clone(),
            start_tag_content,
            end_tag_content: end_tag.into(),
            formatting: Formatting::new(),
            metadata: Vec::new(),
        }
    }

    /// Set the formatting items.
    #[must_use]
    pub fn with_formatting(mut self, formatting: Formatting) -> Self {
        self.formatting = formatting;
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Look up a metadata value by key.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the value of a metadata key, adding it when missing.
    pub fn set_metadata(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.metadata.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.metadata.push((key.to_string(), value)),
        }
    }
}

/// A node of a segment tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(TextRun),
    Placeholder(PlaceholderTag),
    TagPair(TagPair),
}

impl Node {
    /// Shorthand for a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextRun::new(text))
    }

    /// Shorthand for a placeholder node.
    #[must_use]
    pub fn placeholder(content: impl Into<String>) -> Self {
        Self::Placeholder(PlaceholderTag::new(content))
    }

    /// Whether this node can hold children.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::TagPair(_))
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            Self::Text(run) => Some(run),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_tag_pair(&self) -> Option<&TagPair> {
        match self {
            Self::TagPair(pair) => Some(pair),
            _ => None,
        }
    }
}

/// Detached node with owned children, produced by the fragment parser
/// and grafted into a segment on splice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNode {
    pub node: Node,
    pub children: Vec<ParsedNode>,
}

impl ParsedNode {
    /// Create a childless parsed node.
    #[must_use]
    pub fn leaf(node: Node) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// Check whether any descendant is a tag pair.
    #[must_use]
    pub fn has_tag_pair_descendant(&self) -> bool {
        self.children
            .iter()
            .any(|child| child.node.is_container() || child.has_tag_pair_descendant())
    }
}
