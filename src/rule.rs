//! Declarative patch rules.
//!
//! A [`PatchRule`] pairs a [`Matcher`] that locates an anchor in the file with
//! an [`IdempotenceCheck`] that detects an already-applied fix and an
//! [`Action`] that performs the edit. Rules are plain data: rule-set files and
//! built-in presets compile down to a `Vec<PatchRule>` (see
//! [`crate::config::compile()`]).

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Property inserted by module-disabling rules.
pub const DISABLE_PROPERTY: &str = "enabled: false,";

/// Locates the anchor a rule operates on.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact substring, first occurrence wins
    Literal(String),
    /// Regular expression, first match wins
    Pattern(Regex),
    /// The `name: "<module>",` declaration of a blueprint module.
    ///
    /// `name:` must start a property, so `filename: "<module>",` is not an anchor.
    Module(String),
}

impl Matcher {
    /// Anchor on a module's `name: "<module>",` declaration.
    pub fn module(name: impl Into<String>) -> Self {
        Matcher::Module(name.into())
    }

    /// Byte span `[start, end)` of the first match in `content`.
    pub fn find(&self, content: &str) -> Option<(usize, usize)> {
        match self {
            Matcher::Literal(text) => content
                .find(text.as_str())
                .map(|start| (start, start + text.len())),
            Matcher::Pattern(regex) => regex.find(content).map(|m| (m.start(), m.end())),
            Matcher::Module(name) => find_declaration(content, name),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Matcher::Literal(text) | Matcher::Module(text) => text,
            Matcher::Pattern(regex) => regex.as_str(),
        }
    }
}

/// Regex matching a `name: "...",` property whose value matches `name_pattern`.
/// Capture group 1 is the module name.
pub fn module_declaration(name_pattern: &str) -> String {
    format!(r#"(?m)(?:^|[ \t{{,])name:[ \t]*"({name_pattern})","#)
}

/// First `name: "<name>",` that starts a property. The span begins at `name:`.
fn find_declaration(content: &str, name: &str) -> Option<(usize, usize)> {
    const KEY: &str = "name:";
    let mut from = 0;
    while let Some(offset) = content[from..].find(KEY) {
        let at = from + offset;
        from = at + KEY.len();

        let starts_property = content[..at]
            .chars()
            .next_back()
            .map_or(true, |c| matches!(c, '\n' | ' ' | '\t' | '{' | ','));
        if !starts_property {
            continue;
        }
        let rest = content[from..]
            .trim_start_matches([' ', '\t'])
            .strip_prefix('"')
            .and_then(|value| value.strip_prefix(name))
            .and_then(|value| value.strip_prefix("\","));
        if let Some(rest) = rest {
            return Some((at, content.len() - rest.len()));
        }
    }
    None
}

/// Predicate deciding whether a rule's effect is already present.
#[derive(Debug, Clone)]
pub enum IdempotenceCheck {
    /// Always attempt the rule. Replacements of every occurrence use this:
    /// once `old` is gone the rule stops matching on its own.
    Never,
    /// A property with this key already sits in the block the anchor's line
    /// belongs to, at or after the anchor (e.g. `enabled`).
    HasProperty { key: String },
    /// The pattern matches anywhere in the content
    PatternPresent(Regex),
    /// The literal occurs anywhere in the content
    LiteralPresent(String),
}

/// How many occurrences a literal replacement touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaceScope {
    First,
    #[default]
    All,
}

/// The edit a rule performs once its anchor is found.
#[derive(Debug, Clone)]
pub enum Action {
    /// Insert `text` as new line(s) right after the anchor's line. Each line is
    /// prefixed with `indent`, or with the anchor line's own indentation when
    /// `indent` is `None`.
    InsertAfterAnchor { text: String, indent: Option<String> },
    /// Replace `old` with `new`.
    ReplaceLiteral {
        old: String,
        new: String,
        scope: ReplaceScope,
    },
}

/// What a rule does, in reporting terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuleKind {
    Insert { property: String, text: String },
    Replace { old: String, new: String },
}

impl RuleKind {
    /// True for rules inserting `enabled: false,`.
    pub fn is_disable(&self) -> bool {
        matches!(self, RuleKind::Insert { text, .. } if text.trim() == DISABLE_PROPERTY)
    }
}

/// One named transformation.
#[derive(Debug, Clone)]
pub struct PatchRule {
    pub label: String,
    pub matcher: Matcher,
    pub check: IdempotenceCheck,
    pub action: Action,
}

impl PatchRule {
    /// Insert `text` after the line matched by `matcher`.
    ///
    /// The default idempotence check looks for the inserted property's key
    /// among the properties following the anchor, so an existing
    /// `enabled: true,` also counts as present.
    pub fn insert_after(label: impl Into<String>, matcher: Matcher, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            label: label.into(),
            matcher,
            check: IdempotenceCheck::HasProperty {
                key: property_key(&text),
            },
            action: Action::InsertAfterAnchor { text, indent: None },
        }
    }

    /// Add `enabled: false,` to the module declared as `name`.
    pub fn disable_module(name: &str) -> Self {
        Self::insert_after(name, Matcher::module(name), DISABLE_PROPERTY)
    }

    /// Replace the literal `old` with `new`.
    ///
    /// Replacing every occurrence needs no check: a second run finds no `old`
    /// and reports not-found. Replacing only the first occurrence counts as
    /// done once `new` is present, otherwise each run would consume one more.
    pub fn replace(old: impl Into<String>, new: impl Into<String>, scope: ReplaceScope) -> Self {
        let old = old.into();
        let new = new.into();
        let check = match scope {
            ReplaceScope::All => IdempotenceCheck::Never,
            ReplaceScope::First => IdempotenceCheck::LiteralPresent(new.clone()),
        };
        Self {
            label: old.clone(),
            matcher: Matcher::Literal(old.clone()),
            check,
            action: Action::ReplaceLiteral { old, new, scope },
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_check(mut self, check: IdempotenceCheck) -> Self {
        self.check = check;
        self
    }

    /// Use a fixed indentation for inserted lines instead of the anchor's.
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        if let Action::InsertAfterAnchor { indent: slot, .. } = &mut self.action {
            *slot = Some(indent.into());
        }
        self
    }

    pub fn kind(&self) -> RuleKind {
        match &self.action {
            Action::InsertAfterAnchor { text, .. } => RuleKind::Insert {
                property: property_key(text),
                text: text.clone(),
            },
            Action::ReplaceLiteral { old, new, .. } => RuleKind::Replace {
                old: old.clone(),
                new: new.clone(),
            },
        }
    }

    /// Evaluate the idempotence check against `content`.
    pub fn is_satisfied(&self, content: &str) -> bool {
        match &self.check {
            IdempotenceCheck::Never => false,
            IdempotenceCheck::HasProperty { key } => match self.matcher.find(content) {
                Some((start, end)) => sibling_lines(content, start, end)
                    .any(|line| property_key(line) == *key),
                None => false,
            },
            IdempotenceCheck::PatternPresent(regex) => regex.is_match(content),
            IdempotenceCheck::LiteralPresent(text) => content.contains(text.as_str()),
        }
    }
}

/// Key of a `key: value` property, or the trimmed first line if there is none.
///
/// Whitespace around the key is ignored, so `enabled : false,` has key `enabled`.
pub fn property_key(text: &str) -> String {
    let first = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    match first.split_once(':') {
        Some((key, _)) if is_identifier(key.trim()) => key.trim().to_string(),
        _ => first.to_string(),
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Non-blank lines after the anchor's line that sit at the anchor's nesting
/// level, up to the bracket closing the enclosing block.
fn sibling_lines<'a>(content: &'a str, start: usize, end: usize) -> impl Iterator<Item = &'a str> {
    let rest = line_end(content, start, end).map_or("", |after| &content[after..]);
    let mut depth = 0i32;
    rest.lines()
        .map_while(move |line| {
            let level = depth;
            depth += bracket_delta(line);
            (level >= 0 && (level > 0 || !closes_block(line))).then_some((level, line))
        })
        .filter(|(level, line)| *level == 0 && !line.trim().is_empty())
        .map(|(_, line)| line)
}

fn closes_block(line: &str) -> bool {
    line.trim_start().starts_with(['}', ']', ')'])
}

/// Opening minus closing brackets on `line`, outside strings and `//` comments.
fn bracket_delta(line: &str) -> i32 {
    let mut delta = 0;
    let mut in_string = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if in_string => {
                chars.next();
            }
            '"' => in_string = !in_string,
            '/' if !in_string && chars.peek() == Some(&'/') => break,
            '{' | '[' | '(' if !in_string => delta += 1,
            '}' | ']' | ')' if !in_string => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Byte offset just past the newline ending the anchor's line, or `None` when
/// the anchor sits on the last, unterminated line.
pub(crate) fn line_end(content: &str, start: usize, end: usize) -> Option<usize> {
    if end > start && content[..end].ends_with('\n') {
        return Some(end);
    }
    content[end..].find('\n').map(|i| end + i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_matcher_does_not_match_longer_names() {
        let content = "name: \"microdroid_kernel_16k\",\n";
        assert!(Matcher::module("microdroid_kernel").find(content).is_none());
        assert_eq!(
            Matcher::module("microdroid_kernel_16k").find(content),
            Some((0, content.len() - 1))
        );
    }

    #[test]
    fn module_matcher_ignores_filename_property() {
        let content = "    filename: \"microdroid_kernel\",\n    name: \"microdroid_kernel\",\n";
        let (start, end) = Matcher::module("microdroid_kernel").find(content).unwrap();
        assert_eq!(&content[start..end], "name: \"microdroid_kernel\",");
        assert!(start > content.find('\n').unwrap());
    }

    #[test]
    fn module_names_match_literally() {
        let content = "{ name: \"gki-6.6_kernel\", }\n";
        assert!(Matcher::module("gki-6.6_kernel").find(content).is_some());
        assert!(Matcher::module("gki.6.6_kernel").find(content).is_none());
        assert!(Matcher::module("a(").find("name: \"a(\",").is_some());
    }

    #[test]
    fn property_key_of_simple_and_block_text() {
        assert_eq!(property_key("enabled: false,"), "enabled");
        assert_eq!(property_key("enabled : false,"), "enabled");
        assert_eq!(
            property_key("enabled: select(release_flag(\"X\"), {\n    true: true,\n}),"),
            "enabled"
        );
        assert_eq!(property_key("// comment"), "// comment");
    }

    #[test]
    fn has_property_check_skips_blank_lines() {
        let rule = PatchRule::disable_module("x");
        assert!(rule.is_satisfied("name: \"x\",\n\n    enabled: true,\n"));
        assert!(!rule.is_satisfied("name: \"x\",\n    srcs: [],\n"));
        assert!(!rule.is_satisfied("name: \"y\",\n    enabled: false,\n"));
    }

    #[test]
    fn has_property_check_ignores_spacing_around_colon() {
        let rule = PatchRule::insert_after("x", Matcher::module("x"), "enabled : false,");
        assert!(rule.is_satisfied("    name: \"x\",\n    enabled : false,\n"));
        assert!(rule.is_satisfied("    name: \"x\",\n    enabled: true,\n"));
    }

    #[test]
    fn has_property_check_stays_inside_the_block() {
        let rule = PatchRule::disable_module("x");
        let content = "a {\n    name: \"x\",\n    srcs: [\n        \"enabled: x\",\n    ],\n    host_supported: true,\n    enabled: false,\n}\nb {\n    enabled: false,\n}\n";
        assert!(rule.is_satisfied(content));

        let next_module = "a {\n    name: \"x\",\n    arch: {\n        enabled: false,\n    },\n}\nb {\n    enabled: false,\n}\n";
        assert!(!rule.is_satisfied(next_module));
    }

    #[test]
    fn bracket_delta_ignores_strings_and_comments() {
        assert_eq!(bracket_delta("enabled: select(x, {"), 2);
        assert_eq!(bracket_delta("}),"), -2);
        assert_eq!(bracket_delta("cmd: \"echo } \\\" {\","), 0);
        assert_eq!(bracket_delta("srcs: [], // }"), 0);
    }

    #[test]
    fn replace_all_has_no_presence_check() {
        let rule = PatchRule::replace("\":a\"", "\":empty_file\"", ReplaceScope::All);
        assert!(matches!(rule.check, IdempotenceCheck::Never));
        assert!(!rule.is_satisfied("srcs: [\":empty_file\"],"));
    }

    #[test]
    fn replace_first_is_done_once_new_is_present() {
        let rule = PatchRule::replace("\":a\"", "\":empty_file\"", ReplaceScope::First);
        assert!(rule.is_satisfied("srcs: [\":a\", \":empty_file\"],"));
        assert!(!rule.is_satisfied("srcs: [\":a\", \":a\"],"));
    }

    #[test]
    fn disable_kind() {
        assert!(PatchRule::disable_module("x").kind().is_disable());
        let other = PatchRule::insert_after("x", Matcher::module("x"), "enabled: true,");
        assert!(!other.kind().is_disable());
    }

    #[test]
    fn with_indent_only_touches_insertions() {
        let rule = PatchRule::disable_module("x").with_indent("\t");
        assert!(matches!(
            rule.action,
            Action::InsertAfterAnchor { indent: Some(ref i), .. } if i == "\t"
        ));
        let replace = PatchRule::replace("a", "b", ReplaceScope::First).with_indent("\t");
        assert!(matches!(replace.action, Action::ReplaceLiteral { .. }));
    }
}
