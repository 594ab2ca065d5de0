//! Message reporting and change logging.
//!
//! The processor never fails a pass: problems with a single unit are sent
//! to a [`MessageReporter`], successful text changes to a [`ChangeLog`].
//! [`MessageLog`] and [`ChangeReport`] are the collecting implementations
//! used by the command-line host.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CleanupError, Result};

/// Fixed message texts reported by the processor.
pub mod messages {
    pub const SEARCH_TEXT_EMPTY: &str = "Search text is empty";
    pub const REGEX_ERROR: &str = "Regular expression error";
    pub const STRING_CONVERSION_ERROR: &str = "String conversion error";
    pub const NESTED_TAGS: &str = "Nested tags not fully supported";
    pub const XML_INVALID: &str = "Error parsing updated text. Xml invalid.";
    pub const SOURCE_EMPTY: &str = "Source was empty";
    pub const PLACEHOLDER_NOT_FOUND: &str = "Placeholder not found";
    pub const TAG_CONTENT: &str = "Could not update tag content";
    pub const TREE_ERROR: &str = "Could not update segment";
    pub const SOURCE_INVALID: &str = "Could not parse segment source";
}

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Sink for unit-local warnings and errors.
///
/// Implementations must not panic.
pub trait MessageReporter {
    /// Report a message.
    ///
    /// # Arguments
    /// * `location` - Unit the message is about (segment id)
    /// * `level` - Severity
    /// * `message` - Short fixed message, e.g. "Search text is empty"
    /// * `context` - Offending text or pattern
    fn report(&mut self, location: &str, level: Level, message: &str, context: &str);
}

/// Sink for successful text changes.
pub trait ChangeLog {
    fn record_change(
        &mut self,
        unit_id: &str,
        original: &str,
        updated: &str,
        search: &str,
        replacement: &str,
    );
}

/// A reported message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub location: String,
    pub level: Level,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

/// Collects reported messages and mirrors them to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages reported for one location.
    pub fn for_location<'a>(&'a self, location: &'a str) -> impl Iterator<Item = &'a Message> {
        self.messages.iter().filter(move |m| m.location == location)
    }

    /// Number of messages at a level.
    #[must_use]
    pub fn count(&self, level: Level) -> usize {
        self.messages.iter().filter(|m| m.level == level).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl MessageReporter for MessageLog {
    fn report(&mut self, location: &str, level: Level, message: &str, context: &str) {
        match level {
            Level::Warning => tracing::warn!(segment = %location, context = %context, "{message}"),
            Level::Error => tracing::error!(segment = %location, context = %context, "{message}"),
        }
        self.messages.push(Message {
            location: location.to_string(),
            level,
            message: message.to_string(),
            context: context.to_string(),
        });
    }
}

/// One recorded text change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub unit_id: String,
    pub original: String,
    pub updated: String,
    pub search: String,
    pub replacement: String,
}

/// Collected change records with a generation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeReport {
    pub generated_at: DateTime<Utc>,
    pub changes: Vec<ChangeRecord>,
}

impl Default for ChangeReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeReport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            changes: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Serialize the report to YAML.
    ///
    /// # Errors
    /// Returns `Yaml` if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Write the report as YAML, creating parent directories.
    ///
    /// # Errors
    /// Returns `File` if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CleanupError::File {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, yaml).map_err(|source| CleanupError::File {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ChangeLog for ChangeReport {
    fn record_change(
        &mut self,
        unit_id: &str,
        original: &str,
        updated: &str,
        search: &str,
        replacement: &str,
    ) {
        tracing::debug!(segment = %unit_id, search = %search, "text changed");
        self.changes.push(ChangeRecord {
            unit_id: unit_id.to_string(),
            original: original.to_string(),
            updated: updated.to_string(),
            search: search.to_string(),
            replacement: replacement.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_log_collects() {
        let mut log = MessageLog::new();
        log.report("1", Level::Warning, "Search text is empty", "");
        log.report("2", Level::Error, "Error parsing updated text. Xml invalid.", "<b>");

        assert_eq!(log.messages().len(), 2);
        assert_eq!(log.count(Level::Warning), 1);
        assert_eq!(log.count(Level::Error), 1);
        assert_eq!(log.for_location("2").next().unwrap().context, "<b>");
    }

    #[test]
    fn test_change_report_yaml() {
        let mut report = ChangeReport::new();
        report.record_change("1", "Select a Color", "Select a Colour", "color", "colour");

        let yaml = report.to_yaml().unwrap();
        assert!(yaml.contains("generated_at:"));
        assert!(yaml.contains("unit_id: '1'"));
        assert!(yaml.contains("updated: Select a Colour"));

        let parsed: ChangeReport = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(parsed.changes, report.changes);
    }

    #[test]
    fn test_change_report_write_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("changes.yaml");
        ChangeReport::new().write(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Warning.to_string(), "warning");
        assert_eq!(Level::Error.to_string(), "error");
    }
}
