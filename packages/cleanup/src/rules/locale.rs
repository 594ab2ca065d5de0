//! Source locale and locale-aware case mapping.
//!
//! Case mapping follows Unicode default rules except for Turkish and
//! Azeri, where `i`/`İ` and `ı`/`I` form separate case pairs.

use std::fmt;

use crate::config::validate_locale;
use crate::error::Result;

/// Validated source-language locale tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocale {
    tag: String,
    language: String,
}

impl SourceLocale {
    /// Parse and normalize a locale tag (`ja_JP` becomes `ja-JP`).
    ///
    /// # Errors
    /// Returns `InvalidLocale` if the tag is not BCP-47 shaped.
    ///
    /// # Examples
    /// ```
    /// use markup_cleanup::rules::SourceLocale;
    ///
    /// let locale = SourceLocale::parse("ja_JP").unwrap();
    /// assert_eq!(locale.tag(), "ja-JP");
    /// assert!(locale.is_japanese());
    /// ```
    pub fn parse(tag: &str) -> Result<Self> {
        validate_locale(tag)?;
        let tag = tag.replace('_', "-");
        let language = tag
            .split('-')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        Ok(Self { tag, language })
    }

    /// Normalized tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Lower-case primary language subtag.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Turkish and Azeri use dotted/dotless i casing.
    #[must_use]
    pub fn is_turkic(&self) -> bool {
        matches!(self.language.as_str(), "tr" | "az")
    }

    #[must_use]
    pub fn is_japanese(&self) -> bool {
        self.language == "ja"
    }

    /// Japanese, Korean or Chinese.
    #[must_use]
    pub fn is_east_asian(&self) -> bool {
        matches!(self.language.as_str(), "ja" | "ko" | "zh")
    }
}

impl fmt::Display for SourceLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

fn turkic(locale: Option<&SourceLocale>) -> bool {
    locale.is_some_and(SourceLocale::is_turkic)
}

/// Upper-case one character into `out`.
pub(crate) fn push_upper(c: char, locale: Option<&SourceLocale>, out: &mut String) {
    match c {
        'i' if turkic(locale) => out.push('\u{130}'),
        'ı' if turkic(locale) => out.push('I'),
        _ => out.extend(c.to_uppercase()),
    }
}

/// Lower-case one character into `out`.
pub(crate) fn push_lower(c: char, locale: Option<&SourceLocale>, out: &mut String) {
    match c {
        'I' if turkic(locale) => out.push('ı'),
        '\u{130}' if turkic(locale) => out.push('i'),
        _ => out.extend(c.to_lowercase()),
    }
}

/// Locale-aware upper case.
#[must_use]
pub fn to_upper(text: &str, locale: Option<&SourceLocale>) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        push_upper(c, locale, &mut out);
    }
    out
}

/// Locale-aware lower case.
#[must_use]
pub fn to_lower(text: &str, locale: Option<&SourceLocale>) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        push_lower(c, locale, &mut out);
    }
    out
}

/// Capitalize the first letter of each word and lower-case the rest.
#[must_use]
pub fn to_proper(text: &str, locale: Option<&SourceLocale>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                push_upper(c, locale, &mut out);
            } else {
                push_lower(c, locale, &mut out);
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = !matches!(c, '\'' | '\u{2019}');
        }
    }
    out
}

/// Carry the case of a matched text over to its replacement.
///
/// An all-caps match (two or more cased letters) upper-cases the whole
/// replacement, a match starting with a capital capitalizes the
/// replacement's first character. Otherwise the replacement is kept.
#[must_use]
pub fn match_case(replacement: &str, matched: &str, locale: Option<&SourceLocale>) -> String {
    let cased: Vec<char> = matched
        .chars()
        .filter(|c| c.is_uppercase() || c.is_lowercase())
        .collect();
    if cased.len() >= 2 && cased.iter().all(|c| c.is_uppercase()) {
        return to_upper(replacement, locale);
    }
    if !matched.chars().next().is_some_and(char::is_uppercase) {
        return replacement.to_string();
    }

    let mut chars = replacement.chars();
    let mut out = String::with_capacity(replacement.len());
    if let Some(first) = chars.next() {
        push_upper(first, locale, &mut out);
    }
    out.extend(chars);
    out
}

/// Case-fold a character for case-insensitive comparison.
pub(crate) fn fold_char(c: char, locale: Option<&SourceLocale>, out: &mut Vec<char>) {
    match c {
        'I' if turkic(locale) => out.push('ı'),
        '\u{130}' if turkic(locale) => out.push('i'),
        _ => out.extend(c.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turkish() -> SourceLocale {
        SourceLocale::parse("tr-TR").unwrap()
    }

    #[test]
    fn test_parse_normalizes_tag() {
        let locale = SourceLocale::parse("ZH_tw").unwrap();
        assert_eq!(locale.tag(), "ZH-tw");
        assert_eq!(locale.language(), "zh");
        assert!(locale.is_east_asian());
        assert!(!locale.is_japanese());
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(SourceLocale::parse("x").is_err());
    }

    #[test]
    fn test_turkish_casing() {
        let tr = turkish();
        assert_eq!(to_upper("istanbul", Some(&tr)), "İSTANBUL");
        assert_eq!(to_lower("ISPARTA", Some(&tr)), "ısparta");
        assert_eq!(to_upper("istanbul", None), "ISTANBUL");
        assert_eq!(to_lower("ISPARTA", None), "isparta");
    }

    #[test]
    fn test_proper_case() {
        assert_eq!(to_proper("hello WORLD-wide", None), "Hello World-Wide");
        assert_eq!(to_proper("don't stop", None), "Don't Stop");
    }

    #[test]
    fn test_match_case() {
        assert_eq!(match_case("colour", "Color", None), "Colour");
        assert_eq!(match_case("colour", "COLOR", None), "COLOUR");
        assert_eq!(match_case("colour", "color", None), "colour");
        assert_eq!(match_case("colour", "cOLOR", None), "colour");
        assert_eq!(match_case("x", "I", None), "X");
        assert_eq!(match_case("ızmir", "Izmir", Some(&turkish())), "Izmir");
        assert_eq!(match_case("istanbul", "İSTANBUL", Some(&turkish())), "İSTANBUL");
        assert_eq!(match_case("", "Color", None), "");
    }

    #[test]
    fn test_fold_char_turkic() {
        let tr = turkish();
        let mut folded = Vec::new();
        fold_char('I', Some(&tr), &mut folded);
        fold_char('I', None, &mut folded);
        assert_eq!(folded, vec!['ı', 'i']);
    }
}
