//! Command-line interface for markup cleanup.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::DEFAULT_SETTINGS_FILE;
use crate::document::Document;
use crate::error::{CleanupError, Result};
use crate::processor::SegmentProcessor;
use crate::report::ChangeReport;
use crate::rules::matcher::{compile, pattern_for};
use crate::rules::{strconv, SourceLocale};
use crate::settings::Settings;
use crate::types::{ConversionRuleList, ConversionRuleSet};

/// Markup cleanup - apply find/replace rules to inline-markup segments.
#[derive(Parser)]
#[command(name = "markup-cleanup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert every segment of a YAML document.
    Convert {
        /// Input document (YAML with a `segments` list)
        input: PathBuf,

        /// Settings file (default: cleanup-settings.yaml)
        #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
        settings: PathBuf,

        /// Additional rule file, applied after the settings' rule files
        #[arg(short, long = "rules")]
        rules: Vec<PathBuf>,

        /// Source locale, overriding the settings (e.g., ja-JP)
        #[arg(short, long)]
        locale: Option<String>,

        /// Output document (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a change report to this file
        #[arg(short, long)]
        changes: Option<PathBuf>,

        /// Do not write new placeholders back to the settings file
        #[arg(long)]
        no_save_settings: bool,
    },

    /// Validate rule files.
    CheckRules {
        /// Rule files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Options of the convert command.
#[derive(Debug)]
pub struct ConvertOptions<'a> {
    pub input: &'a Path,
    pub settings: &'a Path,
    pub rules: &'a [PathBuf],
    pub locale: Option<&'a str>,
    pub output: Option<&'a Path>,
    pub changes: Option<&'a Path>,
    pub save_settings: bool,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            settings,
            rules,
            locale,
            output,
            changes,
            no_save_settings,
        } => convert_command(&ConvertOptions {
            input: &input,
            settings: &settings,
            rules: &rules,
            locale: locale.as_deref(),
            output: output.as_deref(),
            changes: changes.as_deref(),
            save_settings: !no_save_settings,
        }),
        Commands::CheckRules { files } => check_rules_command(&files),
    }
}

/// Execute the convert command.
fn convert_command(options: &ConvertOptions<'_>) -> Result<()> {
    let mut settings = Settings::load(options.settings)?;
    let locale = match options.locale {
        Some(tag) => Some(SourceLocale::parse(tag)?),
        None => settings.source_locale()?,
    };

    let base_dir = options
        .settings
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut rule_set = settings.load_rules(base_dir)?;
    rule_set.append(ConversionRuleSet::load(options.rules)?);

    let document = Document::load(options.input)?;

    eprintln!(
        "{} {} ({} segments, {} rules)",
        style("Converting").bold(),
        style(options.input.display()).cyan(),
        document.segments.len(),
        rule_set.len()
    );

    let pb = ProgressBar::new(document.segments.len() as u64);
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.green} {pos}/{len} {msg}")
            .expect("valid template"),
    );

    let mut processor = SegmentProcessor::new(rule_set, locale);
    let mut changes = ChangeReport::new();
    let (converted, summary) = document.convert(&mut processor, &mut changes, |entry| {
        pb.set_message(entry.id.clone());
        pb.inc(1);
    });
    pb.finish_and_clear();

    let yaml = converted.to_yaml()?;
    match options.output {
        Some(path) => fs::write(path, yaml).map_err(|source| CleanupError::File {
            path: path.to_path_buf(),
            source,
        })?,
        None => print!("{yaml}"),
    }

    if let Some(path) = options.changes {
        changes.write(path)?;
    }

    let added = settings.merge_placeholders(processor.registry());
    if options.save_settings && added > 0 {
        settings.save(options.settings)?;
    }

    eprintln!("  Segments: {}", summary.segments);
    eprintln!("  Changed: {}", style(summary.changed).green());
    eprintln!("  Changes logged: {}", changes.len());
    if summary.warnings > 0 {
        eprintln!("  Warnings: {}", style(summary.warnings).yellow().bold());
    }
    if summary.errors > 0 {
        eprintln!("  Errors: {}", style(summary.errors).red().bold());
    }
    if added > 0 {
        eprintln!("  New placeholders: {added}");
    }
    if let Some(path) = options.output {
        eprintln!("{} {}", style("Saved to:").green().bold(), path.display());
    }

    Ok(())
}

/// Problems found in one rule list.
fn check_rule_list(list: &ConversionRuleList) -> Vec<String> {
    let mut problems = Vec::new();
    for (index, rule) in list.items.iter().enumerate() {
        let search = &rule.search;
        let number = index + 1;
        if search.text.trim().is_empty() {
            problems.push(format!("item {number}: search text is empty"));
            continue;
        }
        if search.use_regex || search.whole_word {
            if let Err(err) = compile(&pattern_for(search), search.case_sensitive) {
                problems.push(format!("item {number}: {err}"));
            }
        }
        if let Err(err) = strconv::validate(&search.str_conv, None) {
            problems.push(format!("item {number}: {err}"));
        }
    }
    problems
}

/// Execute the check-rules command.
fn check_rules_command(files: &[PathBuf]) -> Result<()> {
    let mut failed = 0;

    for path in files {
        let problems = match ConversionRuleList::load(path) {
            Ok(list) => {
                let problems = check_rule_list(&list);
                if problems.is_empty() {
                    println!(
                        "{} {} ({} rules)",
                        style("ok").green().bold(),
                        path.display(),
                        list.items.len()
                    );
                }
                problems
            }
            Err(err) => vec![err.to_string()],
        };

        if !problems.is_empty() {
            failed += 1;
            println!("{} {}", style("failed").red().bold(), path.display());
            for problem in problems {
                println!("  {problem}");
            }
        }
    }

    println!();
    if failed > 0 {
        return Err(CleanupError::RuleCheckFailed(failed));
    }
    println!("{} {} file(s)", style("Checked").green().bold(), files.len());
    Ok(())
}
