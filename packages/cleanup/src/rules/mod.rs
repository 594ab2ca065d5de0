//! Rule engine: evaluation of conversion rules against text units.
//!
//! - [`locale`]: source locale and locale-aware case mapping
//! - [`matcher`]: literal and regex match primitives
//! - [`strconv`]: case, width and kana conversions
//! - [`engine`]: rule evaluation, tag-pair evaluation and the rule fold

pub mod engine;
pub mod locale;
pub mod matcher;
pub mod strconv;

pub use engine::{is_markup_payload, Fold, FoldStep, RuleEngine, StepOutcome};
pub use locale::SourceLocale;
