//! Built-in rule sets.
//!
//! Each preset is an ordinary TOML rule set compiled into the binary, so it
//! goes through the same parsing and validation as a file passed with
//! `--rules`.

use crate::config::{load_from_str, ConfigError, RuleSetConfig};

#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub source: &'static str,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "profiling-sdk",
        source: include_str!("../presets/profiling-sdk.toml"),
    },
    Preset {
        name: "microdroid-kernels",
        source: include_str!("../presets/microdroid-kernels.toml"),
    },
    Preset {
        name: "microdroid-all",
        source: include_str!("../presets/microdroid-all.toml"),
    },
    Preset {
        name: "microdroid-prebuilts",
        source: include_str!("../presets/microdroid-prebuilts.toml"),
    },
];

pub fn names() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.name).collect()
}

pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name)
}

/// Parse and validate the preset called `name`.
pub fn load(name: &str) -> Result<RuleSetConfig, ConfigError> {
    let preset = find(name).ok_or_else(|| ConfigError::UnknownPreset {
        name: name.to_string(),
        available: names(),
    })?;
    load_from_str(preset.source).map_err(|e| e.with_origin(format!("preset {name}")))
}
