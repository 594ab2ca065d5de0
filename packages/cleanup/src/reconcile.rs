//! Splicing rule results back into a segment tree.
//!
//! Two kinds of results reach the tree:
//!
//! - a placeholder rule result for a text run, which replaces the run with
//!   the text and tags it contains ([`splice_text_run`]);
//! - an updated full text for a tag pair, which is compared with the
//!   original to decide whether the tag itself, only its attributes or
//!   only its content changed ([`reconcile_tag_pair`]).
//!
//! Every fallible step (parsing, fragment conversion) runs before the
//! first mutation, so an error leaves the tree as it was.

use roxmltree::{Document, Node as XmlNode};

use crate::error::{ReconcileError, TreeError};
use crate::fragment::parse_fragment;
use crate::markup::{Node, NodeId, Parent, ParsedNode, Segment};
use crate::placeholders::PlaceholderRegistry;
use crate::xml::{
    attributes, contains_tags, is_self_closing, split_element, split_placeholders,
    unescape_text, wrap_fragment, Piece,
};

/// What a tag pair reconciliation did to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Name, attributes and content are unchanged.
    Unchanged,
    /// The updated text holds no tags; the tag pair became a text run.
    Collapsed,
    /// The tag changed; the subtree was replaced by parsed nodes.
    Replaced,
    /// The tag pair was updated in place.
    Updated { attributes: bool, content: bool },
}

/// Replace a text run with the markup of a placeholder rule result.
///
/// Self-closing tags are split out of the text and recorded in the
/// registry; otherwise a tag pair in the text goes through the fragment
/// parser. Returns the index the new nodes were inserted at.
///
/// # Errors
/// - `NoMarkup` if the text holds neither placeholders nor a tag pair
/// - `Fragment` if the tag pair fragment is rejected
/// - `Tree` if the run is detached
pub fn splice_text_run(
    segment: &mut Segment,
    run: NodeId,
    payload: &str,
    registry: &mut PlaceholderRegistry,
) -> Result<usize, ReconcileError> {
    let pieces = split_placeholders(payload);
    let nodes = if !pieces.is_empty() {
        pieces
            .into_iter()
            .map(|piece| match piece {
                Piece::Text(text) => ParsedNode::leaf(Node::text(text)),
                Piece::Placeholder(tag) => {
                    registry.record(tag, false);
                    ParsedNode::leaf(Node::placeholder(tag))
                }
            })
            .collect()
    } else if contains_tags(payload) {
        parse_fragment(payload, registry)?
    } else {
        return Err(ReconcileError::NoMarkup {
            text: payload.to_string(),
        });
    };

    Ok(segment.splice(run, nodes)?)
}

/// Parse markup expected to be a single tag pair, returning its root
/// element, or `None` when the markup is not a single element.
fn single_element<'a, 'input>(doc: &'a Document<'input>) -> Option<XmlNode<'a, 'input>> {
    let root = doc.root_element();
    let mut elements = root.children().filter(XmlNode::is_element);
    let element = elements.next()?;
    let stray_text = root
        .children()
        .filter(XmlNode::is_text)
        .any(|t| t.text().is_some_and(|s| !s.trim().is_empty()));
    if elements.next().is_some() || stray_text {
        return None;
    }
    Some(element)
}

fn parse_document<'input>(
    wrapped: &'input str,
    text: &str,
) -> Result<Document<'input>, ReconcileError> {
    Document::parse(wrapped).map_err(|source| ReconcileError::Parse {
        text: text.to_string(),
        source,
    })
}

fn sorted_attributes(element: XmlNode<'_, '_>) -> Vec<(String, String)> {
    let mut attrs = attributes(element);
    attrs.sort();
    attrs
}

/// Reconcile a tag pair with the updated version of its full text.
///
/// Attribute changes rewrite stored metadata by plain substitution of the
/// quoted old value, so another attribute sharing that value changes too.
///
/// # Arguments
/// * `segment` - Segment owning the tag pair
/// * `tag_pair` - Attached tag pair node
/// * `original` - Full text of the tag pair before the rule
/// * `updated` - Full text after the rule
/// * `registry` - Receives placeholders found in parsed fragments
///
/// # Errors
/// - `Parse` if either text is not well-formed
/// - `Fragment` if rebuilt content is rejected by the fragment parser
/// - `ContentUnavailable` if the updated tag has no content form
/// - `Tree` if the tag pair is detached
pub fn reconcile_tag_pair(
    segment: &mut Segment,
    tag_pair: NodeId,
    original: &str,
    updated: &str,
    registry: &mut PlaceholderRegistry,
) -> Result<Reconciliation, ReconcileError> {
    let parent = segment
        .parent(tag_pair)
        .ok_or(TreeError::Detached(tag_pair.index()))?;

    if !contains_tags(updated) {
        let index = segment
            .remove_from_parent(tag_pair)
            .ok_or(TreeError::Detached(tag_pair.index()))?;
        if !updated.is_empty() {
            let run = segment.create(Node::text(unescape_text(updated)));
            segment.insert(parent, index, run)?;
        }
        return Ok(Reconciliation::Collapsed);
    }

    let updated_wrapped = wrap_fragment(updated);
    let original_wrapped = wrap_fragment(original);
    let updated_doc = parse_document(&updated_wrapped, updated)?;
    let original_doc = parse_document(&original_wrapped, original)?;

    let same_tag = single_element(&updated_doc)
        .zip(single_element(&original_doc))
        .filter(|(new, old)| new.tag_name() == old.tag_name());
    let Some((new_root, old_root)) = same_tag else {
        let nodes = parse_fragment(updated, registry)?;
        segment.splice(tag_pair, nodes)?;
        return Ok(Reconciliation::Replaced);
    };

    let new_parts = if is_self_closing(new_root) {
        None
    } else {
        split_element(new_root)
    }
    .ok_or_else(|| ReconcileError::ContentUnavailable {
        text: updated.to_string(),
    })?;
    let old_inner = split_element(old_root).map_or("", |parts| parts.inner);

    let new_attributes = sorted_attributes(new_root);
    let old_attributes = sorted_attributes(old_root);
    let attributes_changed = new_attributes != old_attributes;
    let content_changed = new_parts.inner != old_inner;

    let rebuilt = if content_changed {
        Some(parse_fragment(new_parts.inner, registry)?)
    } else {
        None
    };

    if attributes_changed {
        if let Node::TagPair(pair) = segment.node_mut(tag_pair) {
            for (name, value) in attributes(new_root) {
                if let Some(old_value) = old_root.attribute(name.as_str()) {
                    if old_value != value {
                        let from = format!("\"{old_value}\"");
                        let to = format!("\"{value}\"");
                        for entry in &mut pair.metadata {
                            if entry.1.contains(&from) {
                                entry.1 = entry.1.replace(&from, &to);
                            }
                        }
                    }
                }
                pair.formatting.set(name, value);
            }
            pair.start_tag_content = new_parts.start_tag.to_string();
            pair.display_text = new_parts.start_tag.to_string();
        }
    }

    if let Some(nodes) = rebuilt {
        segment.clear_children(Parent::Node(tag_pair));
        for parsed in nodes {
            let child = segment.graft(parsed);
            segment.append(Parent::Node(tag_pair), child)?;
        }
    }

    if !attributes_changed && !content_changed {
        return Ok(Reconciliation::Unchanged);
    }
    Ok(Reconciliation::Updated {
        attributes: attributes_changed,
        content: content_changed,
    })
}
