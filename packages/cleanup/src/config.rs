//! Configuration constants and validation functions for the cleanup engine.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{CleanupError, Result};

/// Element name of the synthetic root wrapped around every parsed fragment.
pub const FRAGMENT_ROOT: &str = "root";

/// Local name of the tag whose attributes carry character formatting.
///
/// Tag pairs with this name get their attributes materialized as
/// formatting items when rebuilt from a fragment.
pub const FORMATTING_CARRIER: &str = "cf";

/// Maximum rule file size in bytes (1 MB).
///
/// Rule files are short lists of find/replace items; anything larger is
/// almost certainly the wrong file.
pub const MAX_RULE_FILE_SIZE: u64 = 1_000_000;

/// Locale used for kana conversions when no source locale is known.
pub const KANA_FALLBACK_LOCALE: &str = "ja-JP";

/// Default settings file name used by the CLI.
pub const DEFAULT_SETTINGS_FILE: &str = "cleanup-settings.yaml";

/// BCP-47 style locale tag: language plus optional subtags.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static LOCALE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("valid regex")
});

/// Validate a locale tag.
///
/// Underscores are accepted as separators (`ja_JP`) and normalized by
/// [`crate::rules::SourceLocale::parse`].
///
/// # Examples
/// ```
/// use markup_cleanup::config::validate_locale;
///
/// assert!(validate_locale("ja-JP").is_ok());
/// assert!(validate_locale("tr").is_ok());
/// assert!(validate_locale("not a locale").is_err());
/// ```
pub fn validate_locale(tag: &str) -> Result<()> {
    let normalized = tag.replace('_', "-");
    if LOCALE_PATTERN.is_match(&normalized) {
        Ok(())
    } else {
        Err(CleanupError::InvalidLocale(tag.to_string()))
    }
}
