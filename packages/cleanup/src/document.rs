//! YAML documents of segments.
//!
//! Input:
//!
//! ```yaml
//! segments:
//!   - id: "1"
//!     source: 'Select a <b>Color</b>'
//! ```
//!
//! The converted document has the same shape, with the converted
//! `source` and the messages reported for each segment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{CleanupError, Result};
use crate::markup::Segment;
use crate::processor::SegmentProcessor;
use crate::report::{messages, ChangeLog, Level, Message, MessageLog, MessageReporter};

/// One segment of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentEntry {
    pub id: String,
    /// Inline markup of the segment.
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

impl SegmentEntry {
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            messages: Vec::new(),
        }
    }
}

/// A document of segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub segments: Vec<SegmentEntry>,
}

/// Counts from converting a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub segments: usize,
    /// Segments whose markup changed.
    pub changed: usize,
    pub warnings: usize,
    pub errors: usize,
}

impl Document {
    /// Parse a document from YAML.
    ///
    /// # Errors
    /// Returns `Yaml` if the document does not match the schema.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a document from a YAML file.
    ///
    /// # Errors
    /// Returns `File` if the file cannot be read and `Yaml` if it cannot
    /// be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| CleanupError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Serialize the document to YAML.
    ///
    /// # Errors
    /// Returns `Yaml` if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Convert every segment with `processor`.
    ///
    /// Segments whose source is not well-formed markup are kept as they
    /// are and get an error message. `on_segment` is called after each
    /// segment, e.g. to advance a progress bar.
    pub fn convert(
        &self,
        processor: &mut SegmentProcessor,
        changes: &mut dyn ChangeLog,
        mut on_segment: impl FnMut(&SegmentEntry),
    ) -> (Self, ConversionSummary) {
        let mut summary = ConversionSummary::default();
        let mut segments = Vec::with_capacity(self.segments.len());

        for entry in &self.segments {
            let mut log = MessageLog::new();
            let source = match Segment::from_markup(entry.id.as_str(), &entry.source) {
                Ok(mut segment) => {
                    processor.process(&mut segment, &mut log, changes);
                    segment.to_markup()
                }
                Err(err) => {
                    log.report(
                        &entry.id,
                        Level::Error,
                        messages::SOURCE_INVALID,
                        &err.to_string(),
                    );
                    entry.source.clone()
                }
            };

            summary.segments += 1;
            if source != entry.source {
                summary.changed += 1;
            }
            summary.warnings += log.count(Level::Warning);
            summary.errors += log.count(Level::Error);

            let converted = SegmentEntry {
                id: entry.id.clone(),
                source,
                messages: log.messages().to_vec(),
            };
            on_segment(&converted);
            segments.push(converted);
        }

        (Self { segments }, summary)
    }
}
