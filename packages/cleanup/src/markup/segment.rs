//! Segment tree: an arena of nodes owned by one segment.
//!
//! Every node lives in a slot of the segment's arena and is addressed by a
//! [`NodeId`]. Containers (the segment root and tag pairs) own an ordered
//! list of child ids; each slot keeps a back-reference to its parent.
//! Indices are never stored, they are recomputed from the parent's child
//! list, so removals cannot leave stale offsets behind.
//!
//! Removing a node detaches it but keeps its slot: a detached id stays
//! valid for reads, and [`Segment::is_attached`] tells callers holding an
//! old handle that the node no longer belongs to the document.

use std::fmt;

use roxmltree::{Document, Node as XmlNode};

use super::node::{Formatting, Node, ParsedNode, PlaceholderTag, TagPair, TextRun};
use crate::error::{Result, TreeError};
use crate::xml::{attributes, escape_text, is_self_closing, split_element, wrap_fragment};

/// Handle of a node in its segment's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Container a node can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parent {
    /// Top level of the segment.
    Segment,
    /// A tag pair.
    Node(NodeId),
}

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    parent: Option<Parent>,
    children: Vec<NodeId>,
}

/// Root container of one bilingual content unit.
#[derive(Debug, Clone)]
pub struct Segment {
    id: String,
    children: Vec<NodeId>,
    slots: Vec<Slot>,
}

impl Segment {
    /// Create an empty segment.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            children: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// Build a segment from inline markup.
    ///
    /// Text becomes text runs, self-closing elements become placeholders
    /// and every other element becomes a tag pair (nesting allowed). Tag
    /// pair attributes are carried over as formatting items.
    ///
    /// # Errors
    /// Returns `XmlParse` if the markup is not well-formed.
    ///
    /// # Examples
    /// ```
    /// use markup_cleanup::markup::{Parent, Segment};
    ///
    /// let segment = Segment::from_markup("1", "Select a <b>Color</b>").unwrap();
    /// assert_eq!(segment.children(Parent::Segment).len(), 2);
    /// assert_eq!(segment.to_markup(), "Select a <b>Color</b>");
    /// ```
    pub fn from_markup(id: impl Into<String>, markup: &str) -> Result<Self> {
        let wrapped = wrap_fragment(markup);
        let doc = Document::parse(&wrapped)?;
        let mut segment = Self::new(id);
        for child in doc.root_element().children() {
            segment.build_from_xml(child, Parent::Segment)?;
        }
        Ok(segment)
    }

    fn build_from_xml(&mut self, xml: XmlNode<'_, '_>, parent: Parent) -> Result<()> {
        if xml.is_text() {
            let text = xml.text().unwrap_or_default();
            let id = self.create(Node::text(text));
            self.append(parent, id)?;
        } else if xml.is_element() {
            if is_self_closing(xml) {
                let id = self.create(Node::placeholder(crate::xml::raw_markup(xml)));
                self.append(parent, id)?;
            } else if let Some(parts) = split_element(xml) {
                let formatting: Formatting = attributes(xml).into_iter().collect();
                let pair = TagPair::new(parts.start_tag, parts.end_tag).with_formatting(formatting);
                let id = self.create(Node::TagPair(pair));
                self.append(parent, id)?;
                for child in xml.children() {
                    self.build_from_xml(child, Parent::Node(id))?;
                }
            }
        }
        Ok(())
    }

    /// Segment identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Allocate a detached node.
    pub fn create(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            node,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Allocate a detached subtree and return its root.
    pub fn graft(&mut self, parsed: ParsedNode) -> NodeId {
        let ParsedNode { node, children } = parsed;
        let id = self.create(node);
        for child in children {
            let child_id = self.graft(child);
            self.slots[child_id.0].parent = Some(Parent::Node(id));
            self.slots[id.0].children.push(child_id);
        }
        id
    }

    /// Borrow a node.
    ///
    /// # Panics
    /// Panics if the id does not belong to this segment.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.slots[id.0].node
    }

    /// Mutably borrow a node.
    ///
    /// # Panics
    /// Panics if the id does not belong to this segment.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.slots[id.0].node
    }

    /// Parent of a node, `None` when detached.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<Parent> {
        self.slots[id.0].parent
    }

    /// Ordered children of a container.
    #[must_use]
    pub fn children(&self, parent: Parent) -> &[NodeId] {
        match parent {
            Parent::Segment => &self.children,
            Parent::Node(id) => &self.slots[id.0].children,
        }
    }

    fn children_mut(&mut self, parent: Parent) -> &mut Vec<NodeId> {
        match parent {
            Parent::Segment => &mut self.children,
            Parent::Node(id) => &mut self.slots[id.0].children,
        }
    }

    /// Position of a node among its parent's children.
    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    /// Check whether a node is reachable from the segment root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            match self.parent(current) {
                Some(Parent::Segment) => return true,
                Some(Parent::Node(parent)) => current = parent,
                None => return false,
            }
        }
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, of: Parent) -> bool {
        let mut current = match of {
            Parent::Segment => return false,
            Parent::Node(id) => id,
        };
        loop {
            if current == candidate {
                return true;
            }
            match self.parent(current) {
                Some(Parent::Node(parent)) => current = parent,
                _ => return false,
            }
        }
    }

    /// Insert a detached node at `index` in `parent`'s children.
    ///
    /// # Errors
    /// Fails if the node is attached, the parent is not a container, the
    /// index is past the end, or the parent lies inside the node.
    pub fn insert(
        &mut self,
        parent: Parent,
        index: usize,
        id: NodeId,
    ) -> std::result::Result<(), TreeError> {
        if self.parent(id).is_some() {
            return Err(TreeError::AlreadyAttached(id.0));
        }
        if let Parent::Node(parent_id) = parent {
            if !self.node(parent_id).is_container() {
                return Err(TreeError::NotAContainer(parent_id.0));
            }
        }
        if self.is_ancestor_or_self(id, parent) {
            return Err(TreeError::Cycle(id.0));
        }
        let len = self.children(parent).len();
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }

        self.children_mut(parent).insert(index, id);
        self.slots[id.0].parent = Some(parent);
        Ok(())
    }

    /// Append a detached node to `parent`'s children.
    ///
    /// # Errors
    /// Same conditions as [`Segment::insert`].
    pub fn append(&mut self, parent: Parent, id: NodeId) -> std::result::Result<(), TreeError> {
        let len = self.children(parent).len();
        self.insert(parent, len, id)
    }

    /// Detach a node from its parent, returning its former index.
    ///
    /// The node keeps its own children; the whole subtree becomes detached.
    pub fn remove_from_parent(&mut self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children_mut(parent).remove(index);
        self.slots[id.0].parent = None;
        Some(index)
    }

    /// Detach all children of a container.
    pub fn clear_children(&mut self, parent: Parent) {
        let children = std::mem::take(self.children_mut(parent));
        for child in children {
            self.slots[child.0].parent = None;
        }
    }

    /// Replace an attached node with a sequence of new nodes.
    ///
    /// All new nodes are inserted at the target's index first, then the
    /// target is removed. Returns the index the nodes were inserted at.
    ///
    /// # Errors
    /// Returns `Detached` if the target has no parent.
    pub fn splice(
        &mut self,
        target: NodeId,
        nodes: Vec<ParsedNode>,
    ) -> std::result::Result<usize, TreeError> {
        let parent = self.parent(target).ok_or(TreeError::Detached(target.0))?;
        let start = self
            .index_in_parent(target)
            .ok_or(TreeError::Detached(target.0))?;

        let mut index = start;
        for parsed in nodes {
            let id = self.graft(parsed);
            self.insert(parent, index, id)?;
            index += 1;
        }
        self.remove_from_parent(target);
        Ok(start)
    }

    /// Attached text runs in document order.
    #[must_use]
    pub fn text_runs(&self) -> Vec<NodeId> {
        let mut runs = Vec::new();
        self.walk(
            Parent::Segment,
            &mut |segment, id| {
                if matches!(segment.node(id), Node::Text(_)) {
                    runs.push(id);
                }
            },
            &mut |_, _| {},
        );
        runs
    }

    /// Attached tag pairs, leaf-first (children before their parent).
    #[must_use]
    pub fn tag_pairs(&self) -> Vec<NodeId> {
        let mut pairs = Vec::new();
        self.walk(Parent::Segment, &mut |_, _| {}, &mut |segment, id| {
            if segment.node(id).is_container() {
                pairs.push(id);
            }
        });
        pairs
    }

    fn walk(
        &self,
        parent: Parent,
        pre: &mut dyn FnMut(&Self, NodeId),
        post: &mut dyn FnMut(&Self, NodeId),
    ) {
        for &child in self.children(parent) {
            pre(self, child);
            self.walk(Parent::Node(child), pre, post);
            post(self, child);
        }
    }

    /// Text of a text run, `None` for other node kinds.
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).as_text().map(|run| run.text.as_str())
    }

    /// Replace the text of a text run. Ignored for other node kinds.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Node::Text(run) = self.node_mut(id) {
            run.text = text.into();
        }
    }

    /// Full reconstructed text of a node: start tag, descendant content in
    /// document order, end tag. Text is concatenated unescaped.
    #[must_use]
    pub fn full_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_full_text(id, &mut out, false);
        out
    }

    /// Like [`Segment::full_text`], but with text escaped so the result
    /// parses as markup.
    #[must_use]
    pub fn markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_full_text(id, &mut out, true);
        out
    }

    /// Serialize the attached tree back to inline markup, escaping text.
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for &child in &self.children {
            self.write_full_text(child, &mut out, true);
        }
        out
    }

    fn write_full_text(&self, id: NodeId, out: &mut String, escape: bool) {
        match self.node(id) {
            Node::Text(TextRun { text }) => {
                if escape {
                    out.push_str(&escape_text(text));
                } else {
                    out.push_str(text);
                }
            }
            Node::Placeholder(PlaceholderTag { content, .. }) => out.push_str(content),
            Node::TagPair(pair) => {
                out.push_str(&pair.start_tag_content);
                for &child in self.children(Parent::Node(id)) {
                    self.write_full_text(child, out, escape);
                }
                out.push_str(&pair.end_tag_content);
            }
        }
    }

    /// Plain text of the attached tree with all tags dropped.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.text_runs()
            .into_iter()
            .filter_map(|id| self.text(id))
            .collect()
    }
}
