use crate::rule::{module_declaration, ReplaceScope};
use regex::Regex;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RuleSetConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleSetConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        for (idx, rule) in self.rules.iter().enumerate() {
            let id = rule.id(idx);

            match rule {
                RuleDefinition::DisableModules { modules } => {
                    if modules.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule: id.clone(),
                            field: "modules",
                        });
                    }
                    if modules.iter().any(|m| m.trim().is_empty()) {
                        issues.push(ValidationIssue::InvalidCombo {
                            rule: id,
                            message: "module names cannot be blank".to_string(),
                        });
                    }
                }
                RuleDefinition::DisableMatching { pattern } => {
                    if pattern.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule: id,
                            field: "pattern",
                        });
                    } else if let Err(err) = Regex::new(&discovery_pattern(pattern)) {
                        issues.push(ValidationIssue::InvalidPattern {
                            rule: id,
                            pattern: pattern.clone(),
                            message: err.to_string(),
                        });
                    }
                }
                RuleDefinition::InsertAfter {
                    anchor,
                    text,
                    already_present,
                    ..
                } => {
                    if anchor.value().trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule: id.clone(),
                            field: "anchor",
                        });
                    } else if let Anchor::Regex(pattern) = anchor {
                        if let Err(err) = Regex::new(pattern) {
                            issues.push(ValidationIssue::InvalidPattern {
                                rule: id.clone(),
                                pattern: pattern.clone(),
                                message: err.to_string(),
                            });
                        }
                    }
                    if text.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule: id.clone(),
                            field: "text",
                        });
                    }
                    if let Some(pattern) = already_present {
                        if let Err(err) = Regex::new(pattern) {
                            issues.push(ValidationIssue::InvalidPattern {
                                rule: id,
                                pattern: pattern.clone(),
                                message: err.to_string(),
                            });
                        }
                    }
                }
                RuleDefinition::Replace {
                    old,
                    new,
                    scope,
                    already_present,
                    ..
                } => {
                    if old.is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            rule: id.clone(),
                            field: "old",
                        });
                    } else if new.contains(old.as_str()) {
                        // Replacing `a` with `xa` would grow on every run
                        issues.push(ValidationIssue::InvalidCombo {
                            rule: id.clone(),
                            message: "replacement text contains the text it replaces".to_string(),
                        });
                    }
                    if *scope == ReplaceScope::First && new.is_empty() && already_present.is_none() {
                        // A first-only replacement is done once `new` shows up
                        issues.push(ValidationIssue::InvalidCombo {
                            rule: id.clone(),
                            message: "scope = \"first\" needs a non-empty `new` or an `already_present` pattern"
                                .to_string(),
                        });
                    }
                    if let Some(pattern) = already_present {
                        if let Err(err) = Regex::new(pattern) {
                            issues.push(ValidationIssue::InvalidPattern {
                                rule: id,
                                pattern: pattern.clone(),
                                message: err.to_string(),
                            });
                        }
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Blueprint file the rules target, absolute or relative to the source tree
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RuleDefinition {
    /// Add `enabled: false,` after each module's `name:` line
    DisableModules { modules: Vec<String> },
    /// Disable every module whose name matches `pattern`
    DisableMatching { pattern: String },
    InsertAfter {
        #[serde(default)]
        label: Option<String>,
        anchor: Anchor,
        text: String,
        #[serde(default)]
        indent: Option<String>,
        /// Regex that, when it matches, marks the rule as already applied
        #[serde(default)]
        already_present: Option<String>,
    },
    Replace {
        #[serde(default)]
        label: Option<String>,
        old: String,
        new: String,
        #[serde(default)]
        scope: ReplaceScope,
        /// Regex that, when it matches, marks the rule as already applied
        #[serde(default)]
        already_present: Option<String>,
    },
}

impl RuleDefinition {
    /// Human-readable identifier used in validation messages.
    pub fn id(&self, idx: usize) -> String {
        let label = match self {
            RuleDefinition::InsertAfter { label, .. } | RuleDefinition::Replace { label, .. } => {
                label.as_deref()
            }
            _ => None,
        };
        match label {
            Some(label) => format!("rule #{} ({label})", idx + 1),
            None => format!("rule #{}", idx + 1),
        }
    }
}

/// Where an `insert-after` rule anchors.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// The module declared with this name
    Module(String),
    /// An exact piece of text
    Text(String),
    Regex(String),
}

impl Anchor {
    pub fn value(&self) -> &str {
        match self {
            Anchor::Module(s) | Anchor::Text(s) | Anchor::Regex(s) => s,
        }
    }
}

/// Full regex used by `disable-matching` to find module names; group 1 is the name.
pub fn discovery_pattern(pattern: &str) -> String {
    module_declaration(pattern)
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule: String,
        field: &'static str,
    },
    InvalidPattern {
        rule: String,
        pattern: String,
        message: String,
    },
    InvalidCombo {
        rule: String,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule set contains no rules"),
            ValidationIssue::MissingField { rule, field } => {
                write!(f, "{rule} missing required field '{field}'")
            }
            ValidationIssue::InvalidPattern {
                rule,
                pattern,
                message,
            } => write!(f, "{rule} has invalid pattern '{pattern}': {message}"),
            ValidationIssue::InvalidCombo { rule, message } => {
                write!(f, "{rule} has invalid configuration: {message}")
            }
        }
    }
}
