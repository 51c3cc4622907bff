//! Config loading and persistence.
//!
//! Layered: built-in defaults, then an optional TOML file, then env
//! overrides. The two branch names are configuration, not a naming
//! convention baked into the store.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Effect, Transience};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("failed to write {path}: {reason}")]
    Write { path: String, reason: String },
}

impl ConfigError {
    pub fn transience(&self) -> Transience {
        match self {
            // filesystem trouble may clear up; a broken file will not
            Self::Read { .. } | Self::Write { .. } => Transience::Unknown,
            Self::Parse { .. } => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Self::Write { .. } => Effect::Unknown,
            _ => Effect::None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub branches: BranchConfig,
    pub logging: LoggingConfig,
}

/// Names of the two store partitions the overlay is built over.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchConfig {
    pub upstream: String,
    pub edited: String,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            upstream: "upstream".to_string(),
            edited: "edited".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub stdout: bool,
    pub format: LogFormat,
    /// Extra filter directives, same syntax as the `TIDEMARK_LOG` env var.
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stdout: true,
            format: LogFormat::Compact,
            filter: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Defaults, overlaid with the file when present, then env overrides.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let mut config = match read_file(path)? {
        Some(config) => config,
        None => Config::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

pub fn load_or_default(path: &Path) -> Config {
    match load(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("config load failed, using defaults: {e}");
            let mut config = Config::default();
            apply_env_overrides(&mut config);
            config
        }
    }
}

fn read_file(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    toml::from_str(&contents)
        .map(Some)
        .map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(upstream) = std::env::var("TIDEMARK_UPSTREAM_BRANCH") {
        if !upstream.is_empty() {
            config.branches.upstream = upstream;
        }
    }
    if let Ok(edited) = std::env::var("TIDEMARK_EDITED_BRANCH") {
        if !edited.is_empty() {
            config.branches.edited = edited;
        }
    }
    if let Ok(format) = std::env::var("TIDEMARK_LOG_FORMAT") {
        match format.as_str() {
            "compact" => config.logging.format = LogFormat::Compact,
            "pretty" => config.logging.format = LogFormat::Pretty,
            "json" => config.logging.format = LogFormat::Json,
            other => tracing::warn!("unknown TIDEMARK_LOG_FORMAT `{other}`, keeping default"),
        }
    }
    if let Ok(filter) = std::env::var("TIDEMARK_LOG_FILTER") {
        if !filter.is_empty() {
            config.logging.filter = Some(filter);
        }
    }
}

pub fn write_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let write_error = |reason: String| ConfigError::Write {
        path: path.display().to_string(),
        reason,
    };
    let dir = path
        .parent()
        .ok_or_else(|| write_error("config path has no parent directory".to_string()))?;
    fs::create_dir_all(dir).map_err(|e| write_error(e.to_string()))?;
    let contents = toml::to_string_pretty(config).map_err(|e| write_error(e.to_string()))?;
    let temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| write_error(e.to_string()))?;
    fs::write(temp.path(), contents.as_bytes()).map_err(|e| write_error(e.to_string()))?;
    temp.persist(path).map_err(|e| write_error(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_name_the_two_branches() {
        let config = Config::default();
        assert_eq!(config.branches.upstream, "upstream");
        assert_eq!(config.branches.edited, "edited");
        assert!(config.logging.stdout);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidemark.toml");
        let mut config = Config::default();
        config.branches.upstream = "feed".to_string();
        config.logging.format = LogFormat::Json;
        write_config(&path, &config).unwrap();

        let loaded = read_file(&path).unwrap().unwrap();
        assert_eq!(loaded.branches.upstream, "feed");
        assert_eq!(loaded.logging.format, LogFormat::Json);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidemark.toml");
        fs::write(&path, "[branches]\nupstream = \"feed\"\n").unwrap();
        let loaded = read_file(&path).unwrap().unwrap();
        assert_eq!(loaded.branches.upstream, "feed");
        assert_eq!(loaded.branches.edited, "edited");
    }

    #[test]
    fn broken_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidemark.toml");
        fs::write(&path, "branches = 3").unwrap();
        assert!(matches!(
            read_file(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }
}
