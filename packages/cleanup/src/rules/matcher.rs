//! Match primitives: locale-aware literal search and regex replacement.

use std::borrow::Cow;
use std::ops::Range;

use regex::{Captures, Regex, RegexBuilder};

use super::locale::{fold_char, SourceLocale};
use crate::error::RuleError;
use crate::types::SearchSpec;

/// Regex source for a search: the pattern itself, `\b`-wrapped escaped
/// text for whole-word searches, or escaped text.
#[must_use]
pub fn pattern_for(search: &SearchSpec) -> String {
    if search.use_regex {
        search.text.clone()
    } else if search.whole_word {
        format!(r"\b{}\b", regex::escape(&search.text))
    } else {
        regex::escape(&search.text)
    }
}

/// Compile a search pattern.
///
/// # Errors
/// Returns `InvalidPattern` if the pattern does not compile.
pub fn compile(pattern: &str, case_sensitive: bool) -> Result<Regex, RuleError> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|source| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            source: Box::new(source),
        })
}

fn fold(text: &str, locale: Option<&SourceLocale>) -> Vec<char> {
    let mut folded = Vec::with_capacity(text.len());
    for c in text.chars() {
        fold_char(c, locale, &mut folded);
    }
    folded
}

/// Find non-overlapping occurrences of `needle` in `haystack`.
///
/// Case-insensitive comparison folds both sides character by character
/// with the locale's case rules, so a match always spans whole
/// characters of the haystack.
///
/// # Examples
/// ```
/// use markup_cleanup::rules::matcher::find_literal;
///
/// assert_eq!(find_literal("Select a Color", "color", false, None), vec![9..14]);
/// assert!(find_literal("Select a Color", "color", true, None).is_empty());
/// ```
#[must_use]
pub fn find_literal(
    haystack: &str,
    needle: &str,
    case_sensitive: bool,
    locale: Option<&SourceLocale>,
) -> Vec<Range<usize>> {
    if needle.is_empty() {
        return Vec::new();
    }
    if case_sensitive {
        return haystack
            .match_indices(needle)
            .map(|(start, m)| start..start + m.len())
            .collect();
    }

    let target = fold(needle, locale);
    let mut ranges = Vec::new();
    let mut buffer = Vec::with_capacity(target.len());
    let mut start = 0;

    while start < haystack.len() {
        buffer.clear();
        let mut end = None;
        for (offset, c) in haystack[start..].char_indices() {
            fold_char(c, locale, &mut buffer);
            if buffer.len() >= target.len() {
                if buffer == target {
                    end = Some(start + offset + c.len_utf8());
                }
                break;
            }
            if !target.starts_with(&buffer) {
                break;
            }
        }

        match end {
            Some(end) => {
                ranges.push(start..end);
                start = end;
            }
            None => {
                start += haystack[start..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
            }
        }
    }
    ranges
}

/// Rebuild `text` with each range replaced by `replace(matched)`.
///
/// # Errors
/// Propagates the first error returned by `replace`.
pub fn replace_ranges<E>(
    text: &str,
    ranges: &[Range<usize>],
    mut replace: impl FnMut(&str) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for range in ranges {
        out.push_str(&text[last..range.start]);
        out.push_str(&replace(&text[range.clone()])?);
        last = range.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Replace every regex match, expanding `$1`/`${name}` in `template`.
///
/// `finish` receives the expanded replacement and the matched text and
/// returns what is inserted. A borrowed result means nothing matched.
pub fn regex_replace<'t>(
    regex: &Regex,
    text: &'t str,
    template: &str,
    finish: impl Fn(String, &str) -> String,
) -> Cow<'t, str> {
    regex.replace_all(text, |caps: &Captures<'_>| {
        let mut expanded = String::new();
        caps.expand(template, &mut expanded);
        let matched = caps.get(0).map_or("", |m| m.as_str());
        finish(expanded, matched)
    })
}
