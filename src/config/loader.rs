use crate::config::schema::{RuleSetConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        origin: Option<String>,
        source: toml_edit::de::Error,
    },
    Validation {
        origin: Option<String>,
        source: ValidationError,
    },
    UnknownPreset {
        name: String,
        available: Vec<&'static str>,
    },
}

impl ConfigError {
    /// Attach the file path or preset name the rule set came from.
    pub(crate) fn with_origin(self, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        match self {
            ConfigError::Toml {
                origin: None,
                source,
            } => ConfigError::Toml {
                origin: Some(origin),
                source,
            },
            ConfigError::Validation {
                origin: None,
                source,
            } => ConfigError::Validation {
                origin: Some(origin),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read rule set from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { origin, source } => match origin {
                Some(origin) => write!(f, "failed to parse rule set TOML ({origin}): {source}"),
                None => write!(f, "failed to parse rule set TOML: {source}"),
            },
            ConfigError::Validation { origin, source } => match origin {
                Some(origin) => write!(f, "invalid rule set ({origin}):\n{source}"),
                None => write!(f, "invalid rule set:\n{source}"),
            },
            ConfigError::UnknownPreset { name, available } => write!(
                f,
                "unknown preset '{name}' (available: {})",
                available.join(", ")
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
            ConfigError::UnknownPreset { .. } => None,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<RuleSetConfig, ConfigError> {
    let config: RuleSetConfig = toml_edit::de::from_str(input).map_err(|source| {
        ConfigError::Toml {
            origin: None,
            source,
        }
    })?;
    config.validate().map_err(|source| ConfigError::Validation {
        origin: None,
        source,
    })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RuleSetConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_origin(path.display().to_string()))
}
