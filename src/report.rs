//! Human-readable and JSON reporting of patch results.

use crate::config::Discovery;
use crate::patcher::{Outcome, PatchResult};
use crate::rule::{module_declaration, RuleKind};
use colored::Colorize;
use regex::Regex;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::path::Path;

/// Minimum similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// One log line for a rule result, without color.
pub fn describe(result: &PatchResult) -> String {
    match (&result.kind, result.outcome) {
        (kind, Outcome::Applied) if kind.is_disable() => format!("Disabled: {}", result.label),
        (RuleKind::Insert { property, .. }, Outcome::Applied) => {
            format!("Inserted {property}: {}", result.label)
        }
        (RuleKind::Insert { property, .. }, Outcome::AlreadyPresent) => {
            format!("Already has {property}: {}", result.label)
        }
        (RuleKind::Replace { old, new }, Outcome::Applied) if &result.label == old => {
            format!("Replaced: {old} -> {new}")
        }
        (RuleKind::Replace { .. }, Outcome::Applied) => format!("Replaced: {}", result.label),
        (RuleKind::Replace { old, new }, Outcome::AlreadyPresent) if &result.label == old => {
            format!("Already replaced: {old} -> {new}")
        }
        (RuleKind::Replace { .. }, Outcome::AlreadyPresent) => {
            format!("Already replaced: {}", result.label)
        }
        (_, Outcome::NotFound) => format!("Not found: {}", result.label),
    }
}

/// Log line for a rule that would apply on a dry run or check.
pub fn describe_pending(result: &PatchResult) -> String {
    match &result.kind {
        kind if kind.is_disable() => format!("Would disable: {}", result.label),
        RuleKind::Insert { property, .. } => format!("Would insert {property}: {}", result.label),
        RuleKind::Replace { old, new } if &result.label == old => {
            format!("Would replace: {old} -> {new}")
        }
        RuleKind::Replace { .. } => format!("Would replace: {}", result.label),
    }
}

/// Closest module name declared in `content`, if any is similar enough to `name`.
pub fn closest_module(name: &str, content: &str) -> Option<String> {
    let declared = Regex::new(&module_declaration(r#"[^"]+"#)).ok()?;
    declared
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .filter(|candidate| candidate != name)
        .map(|candidate| {
            let score = strsim::normalized_damerau_levenshtein(name, &candidate);
            (candidate, score)
        })
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate)
}

/// Print one line per result; `content` is used for not-found suggestions.
/// With `dry_run`, applied results are worded as pending.
pub fn print_results(results: &[PatchResult], content: &str, dry_run: bool) {
    for result in results {
        let line = if dry_run && result.outcome == Outcome::Applied {
            describe_pending(result)
        } else {
            describe(result)
        };
        match result.outcome {
            Outcome::Applied => println!("{} {}", "✓".green(), line),
            Outcome::AlreadyPresent => println!("{} {}", "⊙".yellow(), line),
            Outcome::NotFound => {
                println!("{} {}", "✗".red(), line);
                if matches!(result.kind, RuleKind::Insert { .. }) {
                    if let Some(candidate) = closest_module(&result.label, content) {
                        println!("  {}", format!("did you mean \"{candidate}\"?").dimmed());
                    }
                }
            }
        }
    }
}

pub fn print_discoveries(discoveries: &[Discovery]) {
    for discovery in discoveries {
        println!(
            "Found {} modules matching {}",
            discovery.modules.len(),
            discovery.pattern.cyan()
        );
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub applied: usize,
    pub already_present: usize,
    pub not_found: usize,
    pub disabled: usize,
}

impl Summary {
    pub fn from_results(results: &[PatchResult]) -> Self {
        let mut summary = Summary::default();
        for result in results {
            match result.outcome {
                Outcome::Applied => {
                    summary.applied += 1;
                    if result.kind.is_disable() {
                        summary.disabled += 1;
                    }
                }
                Outcome::AlreadyPresent => summary.already_present += 1,
                Outcome::NotFound => summary.not_found += 1,
            }
        }
        summary
    }
}

pub fn print_summary(summary: &Summary, dry_run: bool) {
    let (applied, disabled) = if dry_run {
        ("would apply", "Would disable")
    } else {
        ("applied", "Total disabled")
    };
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} {applied}", format!("{}", summary.applied).green());
    println!(
        "  {} already present",
        format!("{}", summary.already_present).yellow()
    );
    println!("  {} not found", format!("{}", summary.not_found).red());
    println!("{disabled}: {}", summary.disabled);
}

/// Show a unified diff between original and patched content
pub fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

/// Machine-readable report printed with `--json`.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub rule_set: &'a str,
    pub target: &'a Path,
    pub written: bool,
    pub changed: bool,
    pub results: &'a [PatchResult],
    pub summary: Summary,
}

impl JsonReport<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
