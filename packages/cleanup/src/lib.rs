//! Markup Cleanup - Markup-aware find/replace for segments with inline tags.
//!
//! This crate applies ordered find/replace rules to translation segments
//! whose text is interleaved with inline markup (tag pairs such as
//! `<b>…</b>` and self-closing placeholders such as `<ph id="1"/>`).
//! Rules act on the text runs, or on the full markup of tag pairs, and the
//! results are spliced back into the segment tree so that untouched nodes
//! keep their identity.
//!
//! # Example
//!
//! ```
//! use markup_cleanup::markup::Segment;
//! use markup_cleanup::report::{ChangeReport, MessageLog};
//! use markup_cleanup::{ConversionRule, ReplacementSpec, SearchSpec, SegmentProcessor};
//!
//! let rules = vec![ConversionRule::new(
//!     SearchSpec::new("color"),
//!     ReplacementSpec::new("colour"),
//! )];
//! let mut processor = SegmentProcessor::new(rules.into(), None);
//!
//! let mut segment = Segment::from_markup("1", "Select a <b>Color</b>").unwrap();
//! processor.process(&mut segment, &mut MessageLog::new(), &mut ChangeReport::new());
//! assert_eq!(segment.to_markup(), "Select a <b>Colour</b>");
//! ```
//!
//! # Architecture
//!
//! The engine is organized into several modules:
//!
//! - [`config`]: Configuration constants and validation
//! - [`types`]: Conversion rule types and rule file loading
//! - [`error`]: Error types and Result alias
//! - [`markup`]: Segment tree model (text runs, placeholders, tag pairs)
//! - [`xml`]: XML utilities over `roxmltree`
//! - [`fragment`]: Parsing replacement markup into detached nodes
//! - [`placeholders`]: Registry of placeholders discovered during a pass
//! - [`rules`]: Rule evaluation, matching and string conversions
//! - [`reconcile`]: Splicing rule results back into the tree
//! - [`processor`]: Applying a rule set to one segment
//! - [`report`]: Messages and change records
//! - [`settings`]: Persisted settings
//! - [`document`]: YAML documents of segments
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod fragment;
pub mod markup;
pub mod placeholders;
pub mod processor;
pub mod reconcile;
pub mod report;
pub mod rules;
pub mod settings;
pub mod types;
pub mod xml;

// Re-export commonly used items
pub use document::{ConversionSummary, Document, SegmentEntry};
pub use error::{CleanupError, Result};
pub use markup::Segment;
pub use processor::SegmentProcessor;
pub use rules::SourceLocale;
pub use settings::Settings;
pub use types::{
    ConversionRule, ConversionRuleList, ConversionRuleSet, ReplacementSpec, SearchSpec, StrConv,
};
