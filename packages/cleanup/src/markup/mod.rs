//! Markup tree model.
//!
//! A [`Segment`] owns every node of one content unit in an arena; nodes
//! are addressed by [`NodeId`] and kinds are the closed [`Node`] enum.

mod node;
mod segment;

pub use node::{
    Formatting, FormattingItem, Node, ParsedNode, PlaceholderTag, TagPair, TextRun,
};
pub use segment::{NodeId, Parent, Segment};
