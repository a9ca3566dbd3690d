//! The config patcher: applies an ordered list of [`PatchRule`]s to text.
//!
//! Application is sequential. Each rule sees the output of the rules before
//! it, and a missing anchor is a reportable outcome rather than an error.

use crate::rule::{line_end, Action, PatchRule, ReplaceScope, RuleKind};
use serde::Serialize;
use std::fmt;

/// Per-rule outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    #[serde(rename = "applied")]
    Applied,
    #[serde(rename = "skipped-already-present")]
    AlreadyPresent,
    #[serde(rename = "not-found")]
    NotFound,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied => write!(f, "applied"),
            Outcome::AlreadyPresent => write!(f, "skipped-already-present"),
            Outcome::NotFound => write!(f, "not-found"),
        }
    }
}

/// Result of applying a single rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchResult {
    pub label: String,
    #[serde(flatten)]
    pub kind: RuleKind,
    pub outcome: Outcome,
}

/// Final content plus one result per rule, in rule order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchOutcome holds the patched content; persist it or inspect the results"]
pub struct PatchOutcome {
    pub content: String,
    pub results: Vec<PatchResult>,
}

impl PatchOutcome {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Number of modules that received `enabled: false,` in this run.
    pub fn disabled(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == Outcome::Applied && r.kind.is_disable())
            .count()
    }
}

/// Apply `rules` to `content` in order.
pub fn patch(content: &str, rules: &[PatchRule]) -> PatchOutcome {
    let mut current = content.to_string();
    let mut results = Vec::with_capacity(rules.len());

    for rule in rules {
        let (next, outcome) = apply_rule(&current, rule);
        if let Some(next) = next {
            current = next;
        }
        results.push(PatchResult {
            label: rule.label.clone(),
            kind: rule.kind(),
            outcome,
        });
    }

    PatchOutcome {
        content: current,
        results,
    }
}

/// Apply one rule. Returns the new content only when the rule changed it.
pub fn apply_rule(content: &str, rule: &PatchRule) -> (Option<String>, Outcome) {
    if rule.is_satisfied(content) {
        return (None, Outcome::AlreadyPresent);
    }

    let Some((start, end)) = rule.matcher.find(content) else {
        return (None, Outcome::NotFound);
    };

    match &rule.action {
        Action::InsertAfterAnchor { text, indent } => {
            let indent = match indent {
                Some(indent) => indent.as_str(),
                None => leading_whitespace(line_at(content, start)),
            };
            (
                Some(insert_after_line(content, start, end, text, indent)),
                Outcome::Applied,
            )
        }
        Action::ReplaceLiteral { old, new, scope } => {
            if !content.contains(old.as_str()) {
                return (None, Outcome::NotFound);
            }
            let replaced = match scope {
                ReplaceScope::First => content.replacen(old.as_str(), new, 1),
                ReplaceScope::All => content.replace(old.as_str(), new),
            };
            (Some(replaced), Outcome::Applied)
        }
    }
}

/// Leading spaces and tabs of `line`.
pub fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// The full line containing byte offset `pos`, without its newline.
fn line_at(content: &str, pos: usize) -> &str {
    let start = content[..pos].rfind('\n').map_or(0, |i| i + 1);
    let end = content[start..].find('\n').map_or(content.len(), |i| start + i);
    &content[start..end]
}

fn insert_after_line(content: &str, start: usize, end: usize, text: &str, indent: &str) -> String {
    let anchor_end = line_end(content, start, end);
    let eol = match anchor_end {
        Some(at) if content[..at].ends_with("\r\n") => "\r\n",
        Some(_) => "\n",
        None if content.contains("\r\n") => "\r\n",
        None => "\n",
    };
    let block = indent_block(text, indent, eol);
    let mut out = String::with_capacity(content.len() + block.len() + eol.len());

    match anchor_end {
        Some(at) => {
            out.push_str(&content[..at]);
            out.push_str(&block);
            out.push_str(eol);
            out.push_str(&content[at..]);
        }
        None => {
            out.push_str(content);
            out.push_str(eol);
            out.push_str(&block);
        }
    }
    out
}

/// Prefix every non-empty line of `text` with `indent`, joining lines with
/// `eol`. Relative indentation inside the block is kept.
fn indent_block(text: &str, indent: &str, eol: &str) -> String {
    text.trim_end_matches(['\r', '\n'])
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join(eol)
}
