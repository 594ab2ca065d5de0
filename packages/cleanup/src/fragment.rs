//! Parser for flat inline-markup fragments.
//!
//! A fragment is the text produced by a string substitution, e.g.
//! `Fix <ph id="1"/> now` or `<cf bold="True">hello</cf>`. It is wrapped in
//! a synthetic root element, parsed, and turned into an ordered list of
//! detached nodes ready to be grafted into a segment.
//!
//! Only one level of tags is supported: a tag pair may contain text, but
//! not another element. Nested tags are rejected rather than flattened.

use roxmltree::{Document, Node as XmlNode};

use crate::config::FORMATTING_CARRIER;
use crate::error::FragmentError;
use crate::markup::{Formatting, Node, ParsedNode, TagPair};
use crate::placeholders::PlaceholderRegistry;
use crate::xml::{
    attributes, get_tag_name, has_element_children, is_self_closing, raw_markup, split_element,
    wrap_fragment,
};

/// Parse a fragment into detached nodes.
///
/// Self-closing elements become placeholder tags and are recorded in
/// `registry`. Other elements become tag pairs holding a single text run
/// (none when the element is empty). Attributes of the formatting carrier
/// element become formatting items. Comments and processing instructions
/// are dropped.
///
/// # Errors
/// - `FragmentError::Malformed` if the fragment is not well-formed
/// - `FragmentError::NestedTags` if a tag pair contains another element
///
/// # Examples
/// ```
/// use markup_cleanup::fragment::parse_fragment;
/// use markup_cleanup::placeholders::PlaceholderRegistry;
///
/// let mut registry = PlaceholderRegistry::new();
/// let nodes = parse_fragment("Fix <ph/> now", &mut registry).unwrap();
/// assert_eq!(nodes.len(), 3);
/// assert_eq!(registry.len(), 1);
/// ```
pub fn parse_fragment(
    fragment: &str,
    registry: &mut PlaceholderRegistry,
) -> Result<Vec<ParsedNode>, FragmentError> {
    let wrapped = wrap_fragment(fragment);
    let doc = Document::parse(&wrapped).map_err(|source| FragmentError::Malformed {
        text: fragment.to_string(),
        source,
    })?;

    // Only direct children of the root are visited; an element's
    // descendants are consumed together with it.
    let mut nodes = Vec::new();
    for child in doc.root_element().children() {
        if child.is_text() {
            if let Some(text) = child.text().filter(|t| !t.is_empty()) {
                nodes.push(ParsedNode::leaf(Node::text(text)));
            }
        } else if child.is_element() {
            nodes.push(parse_element(child, fragment, registry)?);
        }
    }

    Ok(nodes)
}

fn parse_element(
    element: XmlNode<'_, '_>,
    fragment: &str,
    registry: &mut PlaceholderRegistry,
) -> Result<ParsedNode, FragmentError> {
    if is_self_closing(element) {
        let markup = raw_markup(element);
        registry.record(markup, false);
        return Ok(ParsedNode::leaf(Node::placeholder(markup)));
    }

    if has_element_children(element) {
        return Err(FragmentError::NestedTags {
            text: fragment.to_string(),
        });
    }

    let Some(parts) = split_element(element) else {
        // Unreachable for parsed elements, treated like a nested-tag rejection.
        return Err(FragmentError::NestedTags {
            text: fragment.to_string(),
        });
    };

    let mut pair = TagPair::new(parts.start_tag, parts.end_tag);
    if get_tag_name(element) == FORMATTING_CARRIER {
        let formatting: Formatting = attributes(element).into_iter().collect();
        pair = pair.with_formatting(formatting);
    }

    let inner: String = element
        .children()
        .filter(XmlNode::is_text)
        .filter_map(|child| child.text())
        .collect();

    let children = if inner.is_empty() {
        Vec::new()
    } else {
        vec![ParsedNode::leaf(Node::text(inner))]
    };

    Ok(ParsedNode {
        node: Node::TagPair(pair),
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(fragment: &str) -> Result<Vec<ParsedNode>, FragmentError> {
        parse_fragment(fragment, &mut PlaceholderRegistry::new())
    }

    #[test]
    fn test_text_and_placeholders() {
        let mut registry = PlaceholderRegistry::new();
        let nodes = parse_fragment(r#"Fix <ph id="1"/> now"#, &mut registry).unwrap();

        assert_eq!(
            nodes,
            vec![
                ParsedNode::leaf(Node::text("Fix ")),
                ParsedNode::leaf(Node::placeholder(r#"<ph id="1"/>"#)),
                ParsedNode::leaf(Node::text(" now")),
            ]
        );
        assert_eq!(registry.iter().next().unwrap().content, r#"<ph id="1"/>"#);
    }

    #[test]
    fn test_tag_pair_with_text() {
        let nodes = parse("<i>hello</i>").unwrap();
        assert_eq!(nodes.len(), 1);

        let pair = nodes[0].node.as_tag_pair().unwrap();
        assert_eq!(pair.start_tag_content, "<i>");
        assert_eq!(pair.end_tag_content, "</i>");
        assert_eq!(nodes[0].children, vec![ParsedNode::leaf(Node::text("hello"))]);
    }

    #[test]
    fn test_entities_are_decoded() {
        let nodes = parse("a &amp; b<b>&lt;x&gt;</b>").unwrap();
        assert_eq!(nodes[0], ParsedNode::leaf(Node::text("a & b")));
        assert_eq!(nodes[1].children, vec![ParsedNode::leaf(Node::text("<x>"))]);
    }

    #[test]
    fn test_formatting_carrier_attributes() {
        let nodes = parse(r#"<cf bold="True" size="10">x</cf>"#).unwrap();
        let pair = nodes[0].node.as_tag_pair().unwrap();
        assert_eq!(pair.formatting.get("bold"), Some("True"));
        assert_eq!(pair.formatting.get("size"), Some("10"));
        assert_eq!(pair.start_tag_content, r#"<cf bold="True" size="10">"#);
    }

    #[test]
    fn test_other_elements_carry_no_formatting() {
        let nodes = parse(r#"<b x="1">hi</b>"#).unwrap();
        assert!(nodes[0].node.as_tag_pair().unwrap().formatting.is_empty());
    }

    #[test]
    fn test_empty_tag_pair_has_no_children() {
        let nodes = parse("<b></b>").unwrap();
        assert!(nodes[0].node.is_container());
        assert!(nodes[0].children.is_empty());
    }

    #[test]
    fn test_nested_tags_rejected() {
        let err = parse("a <b>x <i>y</i></b>").unwrap_err();
        assert!(matches!(err, FragmentError::NestedTags { .. }));

        let err = parse("<b>x <ph/></b>").unwrap_err();
        assert!(matches!(err, FragmentError::NestedTags { .. }));
    }

    #[test]
    fn test_malformed_fragment() {
        let err = parse("<b>unclosed").unwrap_err();
        match err {
            FragmentError::Malformed { text, .. } => assert_eq!(text, "<b>unclosed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sibling_tag_pairs_are_not_reprocessed() {
        let nodes = parse("<b>one</b> and <i>two</i>").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().all(|n| !n.has_tag_pair_descendant()));
        assert_eq!(nodes[1], ParsedNode::leaf(Node::text(" and ")));
    }

    #[test]
    fn test_comments_ignored() {
        let nodes = parse("a<!-- note -->b").unwrap();
        assert_eq!(
            nodes,
            vec![
                ParsedNode::leaf(Node::text("a")),
                ParsedNode::leaf(Node::text("b"))
            ]
        );
    }
}
