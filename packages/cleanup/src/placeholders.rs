//! Registry of substrings that must be treated as opaque placeholders.
//!
//! Every placeholder tag produced during a pass is recorded here so the
//! host can persist it. Deduplication is by containment: a value is only
//! added when no recorded entry already contains it. This means a short
//! tag like `<x/>` is suppressed once a longer entry embedding it exists,
//! and the outcome depends on recording order.

use serde::{Deserialize, Serialize};

/// A substring persisted as an opaque placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    /// Verbatim placeholder markup.
    pub content: String,
    /// Whether the placeholder stands in for a tag pair.
    #[serde(default)]
    pub is_tag_pair: bool,
}

impl Placeholder {
    #[must_use]
    pub fn new(content: impl Into<String>, is_tag_pair: bool) -> Self {
        Self {
            content: content.into(),
            is_tag_pair,
        }
    }
}

/// Insert `value` into `entries` unless an existing entry contains it.
///
/// Returns `true` if the entry was added.
fn insert_unless_contained(entries: &mut Vec<Placeholder>, value: &str, is_tag_pair: bool) -> bool {
    if entries.iter().any(|p| p.content.contains(value)) {
        return false;
    }
    entries.push(Placeholder::new(value, is_tag_pair));
    true
}

/// Deduplicated, insertion-ordered record of placeholders.
///
/// # Examples
/// ```
/// use markup_cleanup::placeholders::PlaceholderRegistry;
///
/// let mut registry = PlaceholderRegistry::new();
/// assert!(registry.record(r#"<ph id="1"/>"#, false));
/// assert!(!registry.record(r#"<ph id="1"/>"#, false));
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlaceholderRegistry {
    entries: Vec<Placeholder>,
}

impl PlaceholderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a placeholder value.
    ///
    /// Returns `true` if it was added, `false` if an existing entry
    /// already contains it.
    pub fn record(&mut self, value: &str, is_tag_pair: bool) -> bool {
        insert_unless_contained(&mut self.entries, value, is_tag_pair)
    }

    /// Merge recorded entries into a persisted list using the same
    /// containment rule. Returns the number of entries added.
    pub fn merge_into(&self, target: &mut Vec<Placeholder>) -> usize {
        self.entries
            .iter()
            .filter(|p| insert_unless_contained(target, &p.content, p.is_tag_pair))
            .count()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_suppresses_contained_values() {
        let mut registry = PlaceholderRegistry::new();
        assert!(registry.record("<ph id=\"1\"/><x/>", false));
        assert!(!registry.record("<x/>", false));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_record_is_order_dependent() {
        let mut registry = PlaceholderRegistry::new();
        assert!(registry.record("<x/>", false));
        assert!(registry.record("<ph id=\"1\"/><x/>", false));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_iter_keeps_insertion_order() {
        let mut registry = PlaceholderRegistry::new();
        registry.record("<b/>", false);
        registry.record("<a/>", true);
        let contents: Vec<&str> = registry.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["<b/>", "<a/>"]);
        assert!(registry.iter().nth(1).unwrap().is_tag_pair);
    }

    #[test]
    fn test_merge_into_uses_containment() {
        let mut registry = PlaceholderRegistry::new();
        registry.record("<x/>", false);
        registry.record("<y/>", false);

        let mut persisted = vec![Placeholder::new("<z/><x/>", false)];
        let added = registry.merge_into(&mut persisted);

        assert_eq!(added, 1);
        assert_eq!(
            persisted,
            vec![
                Placeholder::new("<z/><x/>", false),
                Placeholder::new("<y/>", false)
            ]
        );
    }
}
