//! Rule evaluation and the explicit rule fold.
//!
//! [`RuleEngine::evaluate`] applies one rule to one text. [`RuleEngine::fold`]
//! runs an ordered rule list over a text unit, each rule consuming the
//! output of the previous one, and stops when the unit is removed or
//! handed over to the tree as a splice.

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::Range;

use regex::Regex;

use super::locale::{match_case, to_lower, to_upper, SourceLocale};
use super::matcher::{compile, find_literal, pattern_for, regex_replace, replace_ranges};
use super::strconv;
use crate::error::RuleError;
use crate::types::{ConversionRule, ReplacementSpec};
use crate::xml::{contains_tags, match_tag_pair, split_placeholders};

/// Result of applying one rule in a fold.
#[derive(Debug)]
pub enum StepOutcome {
    /// The rule did not match.
    NoMatch,
    /// The text was updated in place.
    Updated(String),
    /// A placeholder rule produced markup to splice into the tree.
    Splice(String),
    /// A placeholder rule matched but its result holds no markup.
    PlaceholderNotFound(String),
    /// The rule could not be evaluated.
    Failed(RuleError),
}

/// One rule application recorded by a fold.
#[derive(Debug)]
pub struct FoldStep {
    /// Index of the rule in the folded slice.
    pub rule: usize,
    /// Text the rule was applied to.
    pub before: String,
    pub outcome: StepOutcome,
}

/// Final state of a fold.
#[derive(Debug, Default)]
pub struct Fold {
    /// Text after the last applied rule. Empty when the unit was removed.
    pub text: String,
    pub steps: Vec<FoldStep>,
    /// Splice payload of the placeholder rule that ended the fold.
    pub splice: Option<String>,
}

impl Fold {
    /// Whether the unit was emptied by a rule.
    #[must_use]
    pub fn removed(&self) -> bool {
        self.splice.is_none() && self.text.is_empty()
    }
}

/// Check whether text can be spliced into the tree as markup.
#[must_use]
pub fn is_markup_payload(text: &str) -> bool {
    !split_placeholders(text).is_empty() || match_tag_pair(text).is_some()
}

/// Evaluates conversion rules, caching compiled patterns for the pass.
#[derive(Debug, Default)]
pub struct RuleEngine {
    locale: Option<SourceLocale>,
    cache: HashMap<(String, bool), Regex>,
}

impl RuleEngine {
    /// Create an engine for a source locale.
    #[must_use]
    pub fn new(locale: Option<SourceLocale>) -> Self {
        Self {
            locale,
            cache: HashMap::new(),
        }
    }

    #[must_use]
    pub fn locale(&self) -> Option<&SourceLocale> {
        self.locale.as_ref()
    }

    fn regex(&mut self, pattern: String, case_sensitive: bool) -> Result<&Regex, RuleError> {
        match self.cache.entry((pattern, case_sensitive)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let regex = compile(&entry.key().0, case_sensitive)?;
                Ok(entry.insert(regex))
            }
        }
    }

    /// Apply one rule to a text.
    ///
    /// Returns `Ok(None)` when the rule does not match. A match may still
    /// produce text equal to the input, except for string conversions,
    /// which only count when the text actually changes.
    ///
    /// # Errors
    /// - `EmptySearchText` for empty or whitespace-only search text
    /// - `InvalidPattern` for a pattern that does not compile
    /// - `Conversion` for an invalid string conversion
    ///
    /// # Examples
    /// ```
    /// use markup_cleanup::rules::RuleEngine;
    /// use markup_cleanup::types::{ConversionRule, ReplacementSpec, SearchSpec};
    ///
    /// let mut engine = RuleEngine::new(None);
    /// let rule = ConversionRule::new(SearchSpec::new("color"), ReplacementSpec::new("colour"));
    /// let updated = engine.evaluate(&rule, "Select a Color").unwrap();
    /// assert_eq!(updated.as_deref(), Some("Select a Colour"));
    /// ```
    pub fn evaluate(
        &mut self,
        rule: &ConversionRule,
        text: &str,
    ) -> Result<Option<String>, RuleError> {
        let search = &rule.search;
        if search.text.trim().is_empty() {
            return Err(RuleError::EmptySearchText);
        }

        if search.is_str_conv() {
            return self.evaluate_str_conv(rule, text);
        }

        let adapt_case = adapts_case(rule);
        if search.use_regex || search.whole_word {
            let locale = self.locale.clone();
            let replacement = &rule.replacement;
            let regex = self.regex(pattern_for(search), search.case_sensitive)?;
            let updated = regex_replace(regex, text, &replacement.text, |expanded, matched| {
                finish_replacement(replacement, expanded, matched, adapt_case, locale.as_ref())
            });
            return Ok(match updated {
                Cow::Borrowed(_) => None,
                Cow::Owned(updated) => Some(updated),
            });
        }

        let locale = self.locale.as_ref();
        let ranges = find_literal(text, &search.text, search.case_sensitive, locale);
        if ranges.is_empty() {
            return Ok(None);
        }
        let updated: Result<String, RuleError> = replace_ranges(text, &ranges, |matched| {
            let expanded = rule.replacement.text.clone();
            Ok(finish_replacement(
                &rule.replacement,
                expanded,
                matched,
                adapt_case,
                locale,
            ))
        });
        updated.map(Some)
    }

    fn evaluate_str_conv(
        &mut self,
        rule: &ConversionRule,
        text: &str,
    ) -> Result<Option<String>, RuleError> {
        let search = &rule.search;
        strconv::validate(&search.str_conv, self.locale.as_ref())?;

        let ranges: Vec<Range<usize>> = if search.use_regex || search.whole_word {
            let regex = self.regex(pattern_for(search), search.case_sensitive)?;
            regex.find_iter(text).map(|m| m.range()).collect()
        } else {
            find_literal(text, &search.text, search.case_sensitive, self.locale.as_ref())
        };

        let locale = self.locale.as_ref();
        let updated = replace_ranges(text, &ranges, |matched| {
            strconv::convert(matched, &search.str_conv, locale)
        })?;

        Ok((updated != text).then_some(updated))
    }

    /// Apply one rule to the full markup of a tag pair.
    ///
    /// Rules with a case change or string conversion are evaluated twice,
    /// with and without the conversion, so that only the inner content is
    /// converted and the tags keep their original spelling.
    ///
    /// # Errors
    /// Same conditions as [`RuleEngine::evaluate`].
    pub fn evaluate_tag_pair(
        &mut self,
        rule: &ConversionRule,
        full_text: &str,
    ) -> Result<Option<String>, RuleError> {
        if !rule.has_conversion() {
            return self.evaluate(rule, full_text);
        }

        let Some(converted) = self.evaluate(rule, full_text)? else {
            return Ok(None);
        };
        // Conversions applied to the matched text itself leave nothing to
        // replace once they are stripped.
        let unconverted = if rule.search.is_str_conv() || rule.replacement.text.is_empty() {
            full_text.to_string()
        } else {
            self.evaluate(&rule.without_conversion(), full_text)?
                .unwrap_or_else(|| full_text.to_string())
        };

        if !contains_tags(&converted) {
            return Ok(Some(converted));
        }

        let merged = match (match_tag_pair(&unconverted), match_tag_pair(&converted)) {
            (Some(plain), Some(conv)) => {
                format!("{}{}{}", plain.start_tag, conv.inner, plain.end_tag)
            }
            _ => unconverted.clone(),
        };
        Ok(Some(merged))
    }

    /// Run text rules over one unit in order.
    ///
    /// Each rule sees the output of the previous one. The fold ends early
    /// when a rule empties the text or when a placeholder rule yields
    /// markup to splice. Rules addressed to tag pairs are skipped.
    pub fn fold(&mut self, rules: &[ConversionRule], text: &str) -> Fold {
        let mut fold = Fold {
            text: text.to_string(),
            ..Fold::default()
        };

        for (index, rule) in rules.iter().enumerate() {
            if rule.search.tag_pair {
                continue;
            }

            let before = fold.text.clone();
            let outcome = match self.evaluate(rule, &before) {
                Err(err) => StepOutcome::Failed(err),
                Ok(None) => StepOutcome::NoMatch,
                Ok(Some(updated)) if rule.replacement.placeholder => {
                    if is_markup_payload(&updated) {
                        StepOutcome::Splice(updated)
                    } else {
                        StepOutcome::PlaceholderNotFound(updated)
                    }
                }
                Ok(Some(updated)) => StepOutcome::Updated(updated),
            };

            let stop = match &outcome {
                StepOutcome::Updated(updated) => {
                    fold.text.clone_from(updated);
                    updated.is_empty()
                }
                StepOutcome::Splice(payload) => {
                    fold.splice = Some(payload.clone());
                    true
                }
                _ => false,
            };

            fold.steps.push(FoldStep {
                rule: index,
                before,
                outcome,
            });
            if stop {
                break;
            }
        }

        fold
    }
}

/// Whether a rule's replacement takes over the case of each match.
///
/// Only case-insensitive literal and whole-word text rules without an
/// explicit case change do; markup replacements are inserted verbatim.
fn adapts_case(rule: &ConversionRule) -> bool {
    let search = &rule.search;
    let replacement = &rule.replacement;
    !search.case_sensitive
        && !search.use_regex
        && !search.tag_pair
        && !replacement.placeholder
        && !replacement.to_upper
        && !replacement.to_lower
}

/// Apply `to_upper`/`to_lower`, or the case of the match, to an inserted
/// replacement.
///
/// With an empty replacement template the matched text is converted
/// instead, so a case-only rule needs no replacement text.
fn finish_replacement(
    replacement: &ReplacementSpec,
    expanded: String,
    matched: &str,
    adapt_case: bool,
    locale: Option<&SourceLocale>,
) -> String {
    let case_change = replacement.to_upper || replacement.to_lower;
    let base = if case_change && replacement.text.is_empty() {
        matched.to_string()
    } else {
        expanded
    };

    if replacement.to_upper {
        to_upper(&base, locale)
    } else if replacement.to_lower {
        to_lower(&base, locale)
    } else if adapt_case {
        match_case(&base, matched, locale)
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SearchSpec, StrConv};
    use pretty_assertions::assert_eq;

    fn rule(search: SearchSpec, replacement: ReplacementSpec) -> ConversionRule {
        ConversionRule::new(search, replacement)
    }

    #[test]
    fn test_literal_case_insensitive() {
        let mut engine = RuleEngine::new(None);
        let r = rule(SearchSpec::new("color"), ReplacementSpec::new("colour"));
        assert_eq!(
            engine.evaluate(&r, "Color and COLOR and color").unwrap(),
            Some("Colour and COLOUR and colour".to_string())
        );
        assert_eq!(engine.evaluate(&r, "nothing").unwrap(), None);
    }

    #[test]
    fn test_literal_case_sensitive() {
        let mut engine = RuleEngine::new(None);
        let r = rule(
            SearchSpec::new("Color").case_sensitive(),
            ReplacementSpec::new("Colour"),
        );
        assert_eq!(
            engine.evaluate(&r, "Color color").unwrap(),
            Some("Colour color".to_string())
        );
    }

    #[test]
    fn test_replacement_case_follows_literal_match_only() {
        let mut engine = RuleEngine::new(None);
        let regex = rule(SearchSpec::new("colou?r").regex(), ReplacementSpec::new("hue"));
        assert_eq!(engine.evaluate(&regex, "Color").unwrap(), Some("hue".to_string()));

        let placeholder = rule(
            SearchSpec::new("todo"),
            ReplacementSpec::new("<ph/>").placeholder(),
        );
        assert_eq!(engine.evaluate(&placeholder, "TODO").unwrap(), Some("<ph/>".to_string()));

        let tag_pair = rule(SearchSpec::new("bold").tag_pair(), ReplacementSpec::new("strong"));
        assert_eq!(
            engine.evaluate_tag_pair(&tag_pair, "<b>Bold</b>").unwrap(),
            Some("<b>strong</b>".to_string())
        );
    }

    #[test]
    fn test_literal_idempotent_once_no_match() {
        let mut engine = RuleEngine::new(None);
        let r = rule(SearchSpec::new("  "), ReplacementSpec::new(" "));
        assert!(matches!(
            engine.evaluate(&r, "a  b"),
            Err(RuleError::EmptySearchText)
        ));

        let r = rule(SearchSpec::new("colour"), ReplacementSpec::new("color"));
        let once = engine.evaluate(&r, "colour").unwrap().unwrap();
        assert_eq!(engine.evaluate(&r, &once).unwrap(), None);
    }

    #[test]
    fn test_regex_with_groups() {
        let mut engine = RuleEngine::new(None);
        let r = rule(
            SearchSpec::new(r"(\d+)\s*px").regex(),
            ReplacementSpec::new("${1}px"),
        );
        assert_eq!(
            engine.evaluate(&r, "10 px, 20  PX").unwrap(),
            Some("10px, 20px".to_string())
        );
    }

    #[test]
    fn test_regex_no_match_vs_identity_match() {
        let mut engine = RuleEngine::new(None);
        let identity = rule(SearchSpec::new("a").regex(), ReplacementSpec::new("a"));
        assert_eq!(engine.evaluate(&identity, "abc").unwrap(), Some("abc".to_string()));
        assert_eq!(engine.evaluate(&identity, "xyz").unwrap(), None);
    }

    #[test]
    fn test_invalid_regex() {
        let mut engine = RuleEngine::new(None);
        let r = rule(SearchSpec::new("([").regex(), ReplacementSpec::new("x"));
        assert!(matches!(
            engine.evaluate(&r, "abc"),
            Err(RuleError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_whole_word() {
        let mut engine = RuleEngine::new(None);
        let r = rule(SearchSpec::new("cat").whole_word(), ReplacementSpec::new("dog"));
        assert_eq!(
            engine.evaluate(&r, "cat concat Cat.").unwrap(),
            Some("dog concat Dog.".to_string())
        );
    }

    #[test]
    fn test_to_upper_with_empty_replacement_converts_match() {
        let mut engine = RuleEngine::new(None);
        let r = rule(
            SearchSpec::new(r"\bnasa\b").regex(),
            ReplacementSpec::default().to_upper(),
        );
        assert_eq!(
            engine.evaluate(&r, "the nasa team").unwrap(),
            Some("the NASA team".to_string())
        );
    }

    #[test]
    fn test_to_lower_applies_to_replacement() {
        let mut engine = RuleEngine::new(None);
        let r = rule(SearchSpec::new("X"), ReplacementSpec::new("ABC").to_lower());
        assert_eq!(engine.evaluate(&r, "1X2").unwrap(), Some("1abc2".to_string()));
    }

    #[test]
    fn test_str_conv_changes_only_when_different() {
        let mut engine = RuleEngine::new(None);
        let r = rule(
            SearchSpec::new("[a-z]+").regex().case_sensitive().with_str_conv(StrConv::Uppercase),
            ReplacementSpec::default(),
        );
        assert_eq!(engine.evaluate(&r, "abc DEF").unwrap(), Some("ABC DEF".to_string()));
        assert_eq!(engine.evaluate(&r, "ABC DEF").unwrap(), None);
    }

    #[test]
    fn test_str_conv_error() {
        let mut engine = RuleEngine::new(Some(SourceLocale::parse("en-US").unwrap()));
        let r = rule(
            SearchSpec::new("x").with_str_conv(StrConv::Katakana),
            ReplacementSpec::default(),
        );
        assert!(matches!(engine.evaluate(&r, "x"), Err(RuleError::Conversion(_))));
    }

    #[test]
    fn test_regex_cache_reuses_compiled_pattern() {
        let mut engine = RuleEngine::new(None);
        let r = rule(SearchSpec::new("a+").regex(), ReplacementSpec::new("b"));
        engine.evaluate(&r, "aa").unwrap();
        engine.evaluate(&r, "aaa").unwrap();
        assert_eq!(engine.cache.len(), 1);
    }

    #[test]
    fn test_tag_pair_conversion_keeps_tags() {
        let mut engine = RuleEngine::new(None);
        let r = rule(
            SearchSpec::new(".+").regex().tag_pair(),
            ReplacementSpec::default().to_upper(),
        );
        let updated = engine
            .evaluate_tag_pair(&r, r#"<cf bold="True">hello</cf>"#)
            .unwrap();
        assert_eq!(updated, Some(r#"<cf bold="True">HELLO</cf>"#.to_string()));
    }

    #[test]
    fn test_tag_pair_without_conversion() {
        let mut engine = RuleEngine::new(None);
        let r = rule(
            SearchSpec::new("<b>").tag_pair(),
            ReplacementSpec::new("<i>"),
        );
        let r2 = rule(SearchSpec::new("</b>"), ReplacementSpec::new("</i>"));
        let step = engine.evaluate_tag_pair(&r, "<b>hello</b>").unwrap().unwrap();
        let done = engine.evaluate_tag_pair(&r2, &step).unwrap().unwrap();
        assert_eq!(done, "<i>hello</i>");
    }

    #[test]
    fn test_fold_compounds_rules() {
        let mut engine = RuleEngine::new(None);
        let rules = vec![
            rule(SearchSpec::new("a"), ReplacementSpec::new("b")),
            rule(SearchSpec::new("b"), ReplacementSpec::new("c")),
        ];
        let fold = engine.fold(&rules, "a");
        assert_eq!(fold.text, "c");
        assert_eq!(fold.steps.len(), 2);
        assert_eq!(fold.steps[1].before, "b");
        assert!(fold.splice.is_none());
    }

    #[test]
    fn test_fold_stops_on_removal() {
        let mut engine = RuleEngine::new(None);
        let rules = vec![
            rule(SearchSpec::new("gone"), ReplacementSpec::default()),
            rule(SearchSpec::new("x"), ReplacementSpec::new("y")),
        ];
        let fold = engine.fold(&rules, "gone");
        assert!(fold.removed());
        assert_eq!(fold.steps.len(), 1);
    }

    #[test]
    fn test_fold_stops_on_splice() {
        let mut engine = RuleEngine::new(None);
        let rules = vec![
            rule(SearchSpec::new("TODO"), ReplacementSpec::new("<ph/>").placeholder()),
            rule(SearchSpec::new("now"), ReplacementSpec::new("later")),
        ];
        let fold = engine.fold(&rules, "Fix TODO now");
        assert_eq!(fold.splice.as_deref(), Some("Fix <ph/> now"));
        assert_eq!(fold.text, "Fix TODO now");
        assert_eq!(fold.steps.len(), 1);
    }

    #[test]
    fn test_fold_placeholder_not_found_continues() {
        let mut engine = RuleEngine::new(None);
        let rules = vec![
            rule(SearchSpec::new("TODO"), ReplacementSpec::new("DONE").placeholder()),
            rule(SearchSpec::new("now"), ReplacementSpec::new("later")),
        ];
        let fold = engine.fold(&rules, "Fix TODO now");
        assert!(matches!(
            fold.steps[0].outcome,
            StepOutcome::PlaceholderNotFound(_)
        ));
        assert_eq!(fold.text, "Fix TODO later");
    }

    #[test]
    fn test_fold_reports_failures_and_continues() {
        let mut engine = RuleEngine::new(None);
        let rules = vec![
            rule(SearchSpec::new(""), ReplacementSpec::new("x")),
            rule(SearchSpec::new("a"), ReplacementSpec::new("b")),
        ];
        let fold = engine.fold(&rules, "a");
        assert!(matches!(
            fold.steps[0].outcome,
            StepOutcome::Failed(RuleError::EmptySearchText)
        ));
        assert_eq!(fold.text, "b");
    }

    #[test]
    fn test_is_markup_payload() {
        assert!(is_markup_payload("a <ph/> b"));
        assert!(is_markup_payload("<b>x</b>"));
        assert!(!is_markup_payload("plain"));
    }
}
