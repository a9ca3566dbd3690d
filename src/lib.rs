//! bp-patcher: idempotent text patching of Android.bp build blueprints
//!
//! Fixes that unblock a platform build (disabling modules whose prebuilts are
//! missing, guarding a module behind a release flag, pointing dead references
//! at a placeholder) are expressed as declarative rule sets and applied as
//! plain text edits. There is no blueprint parser: rules locate anchors by
//! literal text or regex.
//!
//! # Architecture
//!
//! A rule set (TOML file or built-in [`presets`]) is loaded and validated by
//! [`config`], compiled against the target's content into [`PatchRule`]s, and
//! applied in order by [`patch`]. The [`TargetFile`] is read once and, if
//! anything changed, written back once atomically.
//!
//! # Guarantees
//!
//! - Every rule checks whether its effect is already present before editing
//! - Re-running a rule set on its own output changes nothing
//! - A missing anchor is a reported outcome, never an error
//! - I/O failures abort before any write
//!
//! # Example
//!
//! ```
//! use bp_patcher::{patch, Outcome, PatchRule};
//!
//! let content = "filegroup {\n    name: \"x\",\n}\n";
//! let outcome = patch(content, &[PatchRule::disable_module("x")]);
//!
//! assert_eq!(outcome.content, "filegroup {\n    name: \"x\",\n    enabled: false,\n}\n");
//! assert_eq!(outcome.results[0].outcome, Outcome::Applied);
//! ```

pub mod config;
pub mod patcher;
pub mod presets;
pub mod report;
pub mod rule;
pub mod target;

// Re-exports
pub use config::{compile, load_from_path, load_from_str, CompiledRules, ConfigError, RuleSetConfig};
pub use patcher::{patch, Outcome, PatchOutcome, PatchResult};
pub use rule::{Action, IdempotenceCheck, Matcher, PatchRule, ReplaceScope, RuleKind};
pub use target::{TargetError, TargetFile};
