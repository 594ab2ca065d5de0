//! Segment processing: applies a rule set to one segment tree.
//!
//! All text runs (document order) and tag pairs (leaf-first) are
//! collected before the first rule runs. Rules then execute in order:
//! runs of consecutive text rules are folded per text unit, tag-pair rules
//! run at their position between them. Units detached by an earlier step
//! are skipped.

use std::collections::HashSet;

use crate::error::{FragmentError, ReconcileError, RuleError};
use crate::markup::{NodeId, Segment};
use crate::placeholders::PlaceholderRegistry;
use crate::reconcile::{reconcile_tag_pair, splice_text_run, Reconciliation};
use crate::report::{messages, ChangeLog, Level, MessageReporter};
use crate::rules::{RuleEngine, SourceLocale, StepOutcome};
use crate::xml::escape_outside_tags;
use crate::types::{ConversionRule, ConversionRuleSet};

/// Applies a conversion rule set to segments, one at a time.
///
/// # Examples
/// ```
/// use markup_cleanup::markup::Segment;
/// use markup_cleanup::processor::SegmentProcessor;
/// use markup_cleanup::report::{ChangeReport, MessageLog};
/// use markup_cleanup::types::{ConversionRule, ReplacementSpec, SearchSpec};
///
/// let rules = vec![ConversionRule::new(
///     SearchSpec::new("color"),
///     ReplacementSpec::new("colour"),
/// )];
/// let mut processor = SegmentProcessor::new(rules.into(), None);
///
/// let mut segment = Segment::from_markup("1", "Select a Color").unwrap();
/// let mut log = MessageLog::new();
/// let mut changes = ChangeReport::new();
/// processor.process(&mut segment, &mut log, &mut changes);
///
/// assert_eq!(segment.to_markup(), "Select a Colour");
/// assert_eq!(changes.len(), 1);
/// ```
#[derive(Debug)]
pub struct SegmentProcessor {
    rules: ConversionRuleSet,
    engine: RuleEngine,
    registry: PlaceholderRegistry,
}

/// Per-segment processing state.
struct Pass<'a> {
    segment: &'a mut Segment,
    reporter: &'a mut dyn MessageReporter,
    changes: &'a mut dyn ChangeLog,
    reported_empty: HashSet<usize>,
}

impl Pass<'_> {
    fn report(&mut self, level: Level, message: &str, context: &str) {
        let location = self.segment.id().to_string();
        self.reporter.report(&location, level, message, context);
    }

    fn record(&mut self, original: &str, updated: &str, rule: &ConversionRule) {
        let unit = self.segment.id().to_string();
        self.changes.record_change(
            &unit,
            original,
            updated,
            &rule.search.text,
            &rule.replacement.text,
        );
    }

    fn report_rule_error(&mut self, index: usize, rule: &ConversionRule, err: &RuleError) {
        match err {
            RuleError::EmptySearchText => {
                if self.reported_empty.insert(index) {
                    self.report(Level::Warning, messages::SEARCH_TEXT_EMPTY, &rule.search.text);
                }
            }
            RuleError::InvalidPattern { pattern, .. } => {
                self.report(Level::Warning, messages::REGEX_ERROR, pattern);
            }
            RuleError::Conversion(err) => {
                self.report(
                    Level::Warning,
                    messages::STRING_CONVERSION_ERROR,
                    &err.to_string(),
                );
            }
        }
    }

    fn report_reconcile_error(&mut self, err: &ReconcileError) {
        match err {
            ReconcileError::Fragment(FragmentError::NestedTags { text }) => {
                self.report(Level::Warning, messages::NESTED_TAGS, text);
            }
            ReconcileError::Fragment(FragmentError::Malformed { text, .. })
            | ReconcileError::Parse { text, .. } => {
                self.report(Level::Error, messages::XML_INVALID, text);
            }
            ReconcileError::ContentUnavailable { text } => {
                self.report(Level::Error, messages::TAG_CONTENT, text);
            }
            ReconcileError::NoMarkup { text } => {
                self.report(Level::Warning, messages::PLACEHOLDER_NOT_FOUND, text);
            }
            ReconcileError::Tree(err) => {
                self.report(Level::Error, messages::TREE_ERROR, &err.to_string());
            }
        }
    }
}

impl SegmentProcessor {
    /// Create a processor for a rule set and optional source locale.
    #[must_use]
    pub fn new(rules: ConversionRuleSet, locale: Option<SourceLocale>) -> Self {
        Self {
            rules,
            engine: RuleEngine::new(locale),
            registry: PlaceholderRegistry::new(),
        }
    }

    #[must_use]
    pub fn rules(&self) -> &ConversionRuleSet {
        &self.rules
    }

    /// Placeholders recorded so far in this pass.
    #[must_use]
    pub fn registry(&self) -> &PlaceholderRegistry {
        &self.registry
    }

    /// Process one segment in place.
    ///
    /// Failures are reported and never abort the segment; change records
    /// go to `changes`.
    pub fn process(
        &mut self,
        segment: &mut Segment,
        reporter: &mut dyn MessageReporter,
        changes: &mut dyn ChangeLog,
    ) {
        let text_runs = segment.text_runs();
        let tag_pairs = segment.tag_pairs();
        if text_runs.is_empty() && tag_pairs.is_empty() {
            return;
        }

        let mut pass = Pass {
            segment,
            reporter,
            changes,
            reported_empty: HashSet::new(),
        };

        let mut units = Vec::with_capacity(text_runs.len());
        for run in text_runs {
            if pass.segment.text(run).is_some_and(str::is_empty) {
                pass.report(Level::Warning, messages::SOURCE_EMPTY, "");
            } else {
                units.push(run);
            }
        }

        let Self {
            rules,
            engine,
            registry,
        } = self;
        let mut offset = 0;
        for group in rules
            .rules()
            .chunk_by(|a, b| a.search.tag_pair == b.search.tag_pair)
        {
            if group.first().is_some_and(|rule| rule.search.tag_pair) {
                for (index, rule) in group.iter().enumerate() {
                    let index = offset + index;
                    apply_tag_pair_rule(engine, registry, &mut pass, index, rule, &tag_pairs);
                }
            } else {
                for &unit in &units {
                    fold_unit(engine, registry, &mut pass, offset, group, unit);
                }
            }
            offset += group.len();
        }
    }
}

fn fold_unit(
    engine: &mut RuleEngine,
    registry: &mut PlaceholderRegistry,
    pass: &mut Pass<'_>,
    offset: usize,
    rules: &[ConversionRule],
    unit: NodeId,
) {
    if !pass.segment.is_attached(unit) {
        return;
    }
    let Some(text) = pass.segment.text(unit).map(str::to_string) else {
        return;
    };

    let fold = engine.fold(rules, &text);
    for step in &fold.steps {
        let rule = &rules[step.rule];
        match &step.outcome {
            StepOutcome::NoMatch => {}
            StepOutcome::Updated(updated) => pass.record(&step.before, updated, rule),
            StepOutcome::PlaceholderNotFound(updated) => {
                pass.report(Level::Warning, messages::PLACEHOLDER_NOT_FOUND, updated);
            }
            StepOutcome::Failed(err) => pass.report_rule_error(offset + step.rule, rule, err),
            StepOutcome::Splice(payload) => {
                if fold.text != text {
                    pass.segment.set_text(unit, fold.text.as_str());
                }
                match splice_text_run(pass.segment, unit, payload, registry) {
                    Ok(_) => pass.record(&step.before, payload, rule),
                    Err(err) => pass.report_reconcile_error(&err),
                }
                return;
            }
        }
    }

    if fold.removed() {
        pass.segment.remove_from_parent(unit);
    } else if fold.text != text {
        pass.segment.set_text(unit, fold.text);
    }
}

fn apply_tag_pair_rule(
    engine: &mut RuleEngine,
    registry: &mut PlaceholderRegistry,
    pass: &mut Pass<'_>,
    index: usize,
    rule: &ConversionRule,
    tag_pairs: &[NodeId],
) {
    for &tag_pair in tag_pairs {
        if !pass.segment.is_attached(tag_pair) {
            continue;
        }

        let original = pass.segment.full_text(tag_pair);
        let updated = match engine.evaluate_tag_pair(rule, &original) {
            Ok(Some(updated)) => updated,
            Ok(None) => continue,
            Err(err) => {
                let stop = matches!(err, RuleError::EmptySearchText);
                pass.report_rule_error(index, rule, &err);
                if stop {
                    return;
                }
                continue;
            }
        };

        let original_markup = pass.segment.markup(tag_pair);
        let updated_markup = escape_outside_tags(&updated);
        let reconciled = reconcile_tag_pair(
            pass.segment,
            tag_pair,
            &original_markup,
            &updated_markup,
            registry,
        );
        match reconciled {
            // Structural changes are not text changes; only a collapse
            // to plain text is logged.
            Ok(Reconciliation::Collapsed) => pass.record(&original, &updated, rule),
            Ok(_) => {}
            Err(err) => pass.report_reconcile_error(&err),
        }
    }
}
