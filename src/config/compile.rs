//! Turns rule-set definitions into concrete [`PatchRule`]s.
//!
//! Most definitions map one-to-one. `disable-matching` is the exception: it is
//! expanded against the target's current content into one disable rule per
//! discovered module, so compilation takes the content as input.

use crate::config::schema::{discovery_pattern, Anchor, RuleDefinition, RuleSetConfig};
use crate::rule::{IdempotenceCheck, Matcher, PatchRule};
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Modules found by one `disable-matching` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub pattern: String,
    pub modules: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub rules: Vec<PatchRule>,
    pub discoveries: Vec<Discovery>,
}

pub fn compile(config: &RuleSetConfig, content: &str) -> Result<CompiledRules, CompileError> {
    let mut rules = Vec::new();
    let mut discoveries = Vec::new();

    for definition in &config.rules {
        match definition {
            RuleDefinition::DisableModules { modules } => {
                rules.extend(modules.iter().map(|m| PatchRule::disable_module(m)));
            }
            RuleDefinition::DisableMatching { pattern } => {
                let modules = discover_modules(content, pattern)?;
                rules.extend(modules.iter().map(|m| PatchRule::disable_module(m)));
                discoveries.push(Discovery {
                    pattern: pattern.clone(),
                    modules,
                });
            }
            RuleDefinition::InsertAfter {
                label,
                anchor,
                text,
                indent,
                already_present,
            } => {
                let matcher = match anchor {
                    Anchor::Module(name) => Matcher::module(name),
                    Anchor::Text(text) => Matcher::Literal(text.clone()),
                    Anchor::Regex(pattern) => Matcher::Pattern(regex(pattern)?),
                };
                let label = label.clone().unwrap_or_else(|| anchor.value().to_string());
                let mut rule = PatchRule::insert_after(label, matcher, text.clone());
                if let Some(indent) = indent {
                    rule = rule.with_indent(indent.clone());
                }
                if let Some(pattern) = already_present {
                    rule = rule.with_check(IdempotenceCheck::PatternPresent(regex(pattern)?));
                }
                rules.push(rule);
            }
            RuleDefinition::Replace {
                label,
                old,
                new,
                scope,
                already_present,
            } => {
                let mut rule = PatchRule::replace(old.clone(), new.clone(), *scope);
                if let Some(label) = label {
                    rule = rule.with_label(label.clone());
                }
                if let Some(pattern) = already_present {
                    rule = rule.with_check(IdempotenceCheck::PatternPresent(regex(pattern)?));
                }
                rules.push(rule);
            }
        }
    }

    Ok(CompiledRules { rules, discoveries })
}

/// Distinct module names matching `pattern`, in file order.
pub fn discover_modules(content: &str, pattern: &str) -> Result<Vec<String>, CompileError> {
    let regex = regex(&discovery_pattern(pattern))?;
    let mut modules: Vec<String> = Vec::new();
    for caps in regex.captures_iter(content) {
        let name = &caps[1];
        if !modules.iter().any(|m| m == name) {
            modules.push(name.to_string());
        }
    }
    Ok(modules)
}

fn regex(pattern: &str) -> Result<Regex, CompileError> {
    Regex::new(pattern).map_err(|source| CompileError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
