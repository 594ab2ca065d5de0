//! Conversion rule types and rule file loading.
//!
//! A rule file is a YAML document with an `items:` list of find/replace
//! rules. Several files compose into one ordered [`ConversionRuleSet`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::MAX_RULE_FILE_SIZE;
use crate::error::{CleanupError, Result};

/// String conversion applied to each match of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrConv {
    /// Convert to upper case.
    Uppercase,
    /// Convert to lower case.
    Lowercase,
    /// Capitalize the first letter of each word.
    ProperCase,
    /// Narrow (half-width) characters to wide (full-width).
    Wide,
    /// Wide (full-width) characters to narrow (half-width).
    Narrow,
    /// Hiragana to katakana.
    Katakana,
    /// Katakana to hiragana.
    Hiragana,
    /// Traditional to simplified Chinese.
    SimplifiedChinese,
    /// Simplified to traditional Chinese.
    TraditionalChinese,
}

impl StrConv {
    /// Name used in messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uppercase => "Uppercase",
            Self::Lowercase => "Lowercase",
            Self::ProperCase => "ProperCase",
            Self::Wide => "Wide",
            Self::Narrow => "Narrow",
            Self::Katakana => "Katakana",
            Self::Hiragana => "Hiragana",
            Self::SimplifiedChinese => "SimplifiedChinese",
            Self::TraditionalChinese => "TraditionalChinese",
        }
    }
}

/// What a rule looks for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpec {
    /// Literal text or regular expression.
    pub text: String,
    pub case_sensitive: bool,
    /// Treat `text` as a regular expression.
    pub use_regex: bool,
    /// Match whole words only.
    pub whole_word: bool,
    /// Apply the rule to the full markup of tag pairs instead of text runs.
    pub tag_pair: bool,
    /// String conversions; non-empty switches the rule to conversion mode.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub str_conv: Vec<StrConv>,
}

impl SearchSpec {
    /// Create a case-insensitive literal search.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    #[must_use]
    pub fn regex(mut self) -> Self {
        self.use_regex = true;
        self
    }

    #[must_use]
    pub fn whole_word(mut self) -> Self {
        self.whole_word = true;
        self
    }

    #[must_use]
    pub fn tag_pair(mut self) -> Self {
        self.tag_pair = true;
        self
    }

    #[must_use]
    pub fn with_str_conv(mut self, conv: StrConv) -> Self {
        self.str_conv.push(conv);
        self
    }

    /// Whether the rule runs in string conversion mode.
    #[must_use]
    pub fn is_str_conv(&self) -> bool {
        !self.str_conv.is_empty()
    }
}

/// What a rule inserts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplacementSpec {
    /// Replacement text; `$1` and `${name}` expand in regex mode.
    pub text: String,
    /// Splice the result into the tree as markup.
    pub placeholder: bool,
    pub to_upper: bool,
    pub to_lower: bool,
}

impl ReplacementSpec {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn placeholder(mut self) -> Self {
        self.placeholder = true;
        self
    }

    #[must_use]
    pub fn to_upper(mut self) -> Self {
        self.to_upper = true;
        self
    }

    #[must_use]
    pub fn to_lower(mut self) -> Self {
        self.to_lower = true;
        self
    }
}

/// One find/replace rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRule {
    pub search: SearchSpec,
    #[serde(default)]
    pub replacement: ReplacementSpec,
}

impl ConversionRule {
    #[must_use]
    pub fn new(search: SearchSpec, replacement: ReplacementSpec) -> Self {
        Self {
            search,
            replacement,
        }
    }

    /// Whether the rule applies a case change or string conversion.
    #[must_use]
    pub fn has_conversion(&self) -> bool {
        self.search.is_str_conv() || self.replacement.to_upper || self.replacement.to_lower
    }

    /// Copy of the rule with every case change and string conversion removed.
    #[must_use]
    pub fn without_conversion(&self) -> Self {
        let mut rule = self.clone();
        rule.search.str_conv.clear();
        rule.replacement.to_upper = false;
        rule.replacement.to_lower = false;
        rule
    }
}

/// Rules of a single rule file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRuleList {
    #[serde(default)]
    pub items: Vec<ConversionRule>,
}

impl ConversionRuleList {
    /// Parse a rule list from YAML.
    ///
    /// # Errors
    /// Returns `Yaml` if the document does not match the rule schema.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a rule file, enforcing [`MAX_RULE_FILE_SIZE`].
    ///
    /// # Errors
    /// Returns `File` if the file cannot be read, `RuleFileTooLarge` if it
    /// exceeds the limit and `Yaml` if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|source| CleanupError::File {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(CleanupError::RuleFileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: MAX_RULE_FILE_SIZE,
            });
        }

        let content = fs::read_to_string(path).map_err(|source| CleanupError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }
}

/// Ordered rules composed from rule files: file order, then item order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionRuleSet {
    rules: Vec<ConversionRule>,
    sources: Vec<PathBuf>,
}

impl ConversionRuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and compose rule files in order.
    ///
    /// # Errors
    /// Fails on the first file that cannot be loaded.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut set = Self::new();
        for path in paths {
            let path = path.as_ref();
            let list = ConversionRuleList::load(path)?;
            set.extend(list);
            set.sources.push(path.to_path_buf());
        }
        Ok(set)
    }

    /// Append the rules of a list.
    pub fn extend(&mut self, list: ConversionRuleList) {
        self.rules.extend(list.items);
    }

    /// Append the rules and sources of another set.
    pub fn append(&mut self, other: Self) {
        self.rules.extend(other.rules);
        self.sources.extend(other.sources);
    }

    /// Append a single rule.
    pub fn push(&mut self, rule: ConversionRule) {
        self.rules.push(rule);
    }

    #[must_use]
    pub fn rules(&self) -> &[ConversionRule] {
        &self.rules
    }

    /// Files the rules were loaded from.
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<Vec<ConversionRule>> for ConversionRuleSet {
    fn from(rules: Vec<ConversionRule>) -> Self {
        Self {
            rules,
            sources: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const RULES: &str = r#"
items:
  - search:
      text: color
    replacement:
      text: colour
  - search:
      text: '(\d+)px'
      use_regex: true
      case_sensitive: true
    replacement:
      text: '${1} px'
  - search:
      text: '[a-z]+'
      use_regex: true
      str_conv: [uppercase]
"#;

    #[test]
    fn test_rule_list_from_yaml() {
        let list = ConversionRuleList::from_yaml(RULES).unwrap();
        assert_eq!(list.items.len(), 3);

        assert_eq!(
            list.items[0],
            ConversionRule::new(SearchSpec::new("color"), ReplacementSpec::new("colour"))
        );
        assert!(list.items[1].search.use_regex);
        assert!(list.items[1].search.case_sensitive);
        assert_eq!(list.items[2].search.str_conv, vec![StrConv::Uppercase]);
        assert_eq!(list.items[2].replacement, ReplacementSpec::default());
    }

    #[test]
    fn test_rule_list_rejects_unknown_conversion() {
        let yaml = "items:\n  - search:\n      text: x\n      str_conv: [sideways]\n";
        assert!(ConversionRuleList::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_without_conversion() {
        let rule = ConversionRule::new(
            SearchSpec::new("a").with_str_conv(StrConv::Wide),
            ReplacementSpec::new("b").to_upper(),
        );
        assert!(rule.has_conversion());
        let plain = rule.without_conversion();
        assert!(!plain.has_conversion());
        assert_eq!(plain.search.text, "a");
        assert_eq!(plain.replacement.text, "b");
    }

    #[test]
    fn test_rule_set_load_keeps_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.yaml");
        let second = dir.path().join("second.yaml");
        fs::write(&first, "items:\n  - search: {text: a}\n    replacement: {text: b}\n").unwrap();
        fs::write(&second, "items:\n  - search: {text: b}\n    replacement: {text: c}\n").unwrap();

        let set = ConversionRuleSet::load(&[&first, &second]).unwrap();
        let searches: Vec<&str> = set.rules().iter().map(|r| r.search.text.as_str()).collect();
        assert_eq!(searches, vec!["a", "b"]);
        assert_eq!(set.sources(), &[first, second]);
    }

    #[test]
    fn test_rule_file_too_large() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let line = "# padding padding padding padding padding padding padding\n";
        let repeats = usize::try_from(MAX_RULE_FILE_SIZE).unwrap() / line.len() + 1;
        for _ in 0..repeats {
            file.write_all(line.as_bytes()).unwrap();
        }
        file.flush().unwrap();

        let err = ConversionRuleList::load(file.path()).unwrap_err();
        assert!(matches!(err, CleanupError::RuleFileTooLarge { .. }));
    }

    #[test]
    fn test_missing_rule_file() {
        let err = ConversionRuleList::load(Path::new("/nonexistent/rules.yaml")).unwrap_err();
        assert!(matches!(err, CleanupError::File { .. }));
    }
}
