//! Persisted cleanup settings.
//!
//! Settings live in a YAML file next to the rule files they reference:
//!
//! ```yaml
//! source_locale: ja-JP
//! conversion_files:
//!   - path: rules/spelling.yaml
//!   - path: rules/legacy.yaml
//!     enabled: false
//! placeholders:
//!   - content: <ph id="1"/>
//! ```
//!
//! Relative rule file paths resolve against the settings file's directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CleanupError, Result};
use crate::placeholders::{Placeholder, PlaceholderRegistry};
use crate::rules::SourceLocale;
use crate::types::ConversionRuleSet;

fn default_enabled() -> bool {
    true
}

/// A rule file listed in the settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionFile {
    pub path: PathBuf,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ConversionFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            enabled: true,
        }
    }
}

/// Cleanup settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Source language locale tag, e.g. `ja-JP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_locale: Option<String>,

    #[serde(default)]
    pub conversion_files: Vec<ConversionFile>,

    /// Substrings persisted as opaque placeholders.
    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
}

impl Settings {
    /// Parse settings from YAML.
    ///
    /// # Errors
    /// Returns `Yaml` if the document does not match the settings schema.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load settings; a missing file yields default settings.
    ///
    /// # Errors
    /// Returns `File` if the file exists but cannot be read and `Yaml` if
    /// it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "settings file not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| CleanupError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Save settings as YAML.
    ///
    /// # Errors
    /// Returns `Yaml` if serialization fails and `File` if the file cannot
    /// be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml_ng::to_string(self)?;
        fs::write(path, yaml).map_err(|source| CleanupError::File {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse the configured source locale.
    ///
    /// # Errors
    /// Returns `InvalidLocale` if the tag is malformed.
    pub fn source_locale(&self) -> Result<Option<SourceLocale>> {
        self.source_locale
            .as_deref()
            .filter(|tag| !tag.trim().is_empty())
            .map(SourceLocale::parse)
            .transpose()
    }

    /// Enabled rule files that exist, resolved against `base_dir`.
    ///
    /// Missing files are skipped with a warning.
    #[must_use]
    pub fn enabled_rule_files(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.conversion_files
            .iter()
            .filter(|file| file.enabled)
            .map(|file| base_dir.join(&file.path))
            .filter(|path| {
                let exists = path.is_file();
                if !exists {
                    tracing::warn!(path = %path.display(), "Conversion file not found, skipping");
                }
                exists
            })
            .collect()
    }

    /// Load the rule set from the enabled rule files.
    ///
    /// # Errors
    /// Fails on the first rule file that cannot be loaded.
    pub fn load_rules(&self, base_dir: &Path) -> Result<ConversionRuleSet> {
        ConversionRuleSet::load(&self.enabled_rule_files(base_dir))
    }

    /// Merge placeholders recorded during a pass. Returns the number added.
    pub fn merge_placeholders(&mut self, registry: &PlaceholderRegistry) -> usize {
        registry.merge_into(&mut self.placeholders)
    }
}
