pub mod compile;
pub mod loader;
pub mod schema;

pub use compile::{compile, discover_modules, CompileError, CompiledRules, Discovery};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    Anchor, Metadata, RuleDefinition, RuleSetConfig, ValidationError, ValidationIssue,
};
