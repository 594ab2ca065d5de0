//! Error types for the cleanup engine.
//!
//! Uses the dual-error pattern: `CleanupError` for library consumers
//! with detailed error context, and specific error types for internal use
//! (`TreeError`, `FragmentError`, `ReconcileError`, `RuleError`,
//! `ConversionError`). The internal errors never escape a processing pass;
//! they are turned into reporter messages by the processor.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the cleanup library.
#[derive(Debug, Error)]
pub enum CleanupError {
    /// Invalid locale tag.
    #[error("Invalid locale tag: '{0}'. Expected a BCP-47 tag (e.g., ja-JP)")]
    InvalidLocale(String),

    /// Rule file larger than the allowed size.
    #[error("Rule file {path} is too large ({size} bytes, limit {limit})")]
    RuleFileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// Rule file validation found problems.
    #[error("{0} rule file(s) failed validation")]
    RuleCheckFailed(usize),

    /// Failed to read or write a file.
    #[error("Failed to access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Markup could not be parsed into a segment tree.
    #[error("Markup parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// Tree operation violated a structural invariant.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Result type alias for cleanup operations.
pub type Result<T> = std::result::Result<T, CleanupError>;

/// Structural errors raised by segment tree operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The target parent cannot hold children.
    #[error("Node {0} cannot contain children")]
    NotAContainer(usize),

    /// The node already has a parent.
    #[error("Node {0} is already attached")]
    AlreadyAttached(usize),

    /// The node has no parent.
    #[error("Node {0} is not attached to the segment")]
    Detached(usize),

    /// Insert index past the end of the child list.
    #[error("Index {index} out of bounds for {len} children")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Insert would make a node its own ancestor.
    #[error("Inserting node {0} would create a cycle")]
    Cycle(usize),
}

/// Errors from the fragment parser.
#[derive(Debug, Error)]
pub enum FragmentError {
    /// Fragment is not well-formed markup.
    #[error("Error parsing updated text. Xml invalid: {text}")]
    Malformed {
        text: String,
        #[source]
        source: roxmltree::Error,
    },

    /// A tag pair contains another tag.
    #[error("Nested tags not fully supported: {text}")]
    NestedTags { text: String },
}

/// Errors from splicing rule results back into a segment tree.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The replacement fragment was rejected by the fragment parser.
    #[error(transparent)]
    Fragment(#[from] FragmentError),

    /// Updated or original tag pair markup is not well-formed.
    #[error("Error parsing updated text. Xml invalid: {text}")]
    Parse {
        text: String,
        #[source]
        source: roxmltree::Error,
    },

    /// The updated markup has no content to rebuild the tag pair from.
    #[error("Could not update tag content: {text}")]
    ContentUnavailable { text: String },

    /// A placeholder result holds no markup to splice.
    #[error("Placeholder not found: {text}")]
    NoMarkup { text: String },

    /// The tree rejected the splice.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Errors from evaluating a single rule against a text.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Search text is empty or whitespace.
    #[error("Search text is empty")]
    EmptySearchText,

    /// Search pattern is not a valid regular expression.
    #[error("Regular expression error: {pattern}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    /// String conversion cannot be applied.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Errors from string conversion flags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Two mutually exclusive flags were combined.
    #[error("Conflicting string conversions: {0} and {1}")]
    Conflict(&'static str, &'static str),

    /// The conversion is not valid for the source locale.
    #[error("String conversion {conversion} is not supported for locale {locale}")]
    UnsupportedLocale {
        conversion: &'static str,
        locale: String,
    },

    /// The conversion needs tables this engine does not carry.
    #[error("String conversion {0} is not available")]
    Unavailable(&'static str),
}
