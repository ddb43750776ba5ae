//! Config loader (A1): layer an optional TOML file and environment
//! variables over [`MiningConfig`]'s documented defaults (§6 Config
//! enumeration).
//!
//! Precedence, lowest to highest: `MiningConfig::default()` → TOML file
//! (`--config`) → environment variables (`MPM_GENERALIZE_THRESHOLD`,
//! `MPM_GENERALIZE_FS_THRESHOLD`, `MPM_GENERALIZE_PROC`).

use std::path::Path;

use mpm_core::MiningConfig;
use thiserror::Error;

/// Failure loading or overlaying mining configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("reading config file: {0}")]
    Io(#[from] std::io::Error),
    /// The config file wasn't valid TOML, or didn't match [`MiningConfig`]'s shape.
    #[error("parsing config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// An environment-variable override couldn't be parsed as the
    /// expected type.
    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv {
        /// Name of the offending environment variable.
        var: &'static str,
        /// The value that failed to parse.
        value: String,
    },
}

/// Load the mining configuration: defaults, optionally overridden by a
/// TOML file, then by environment variables.
pub fn load(config_path: Option<&Path>) -> Result<MiningConfig, ConfigError> {
    let mut config = match config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            toml::from_str(&text)?
        }
        None => MiningConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut MiningConfig) -> Result<(), ConfigError> {
    if let Ok(value) = std::env::var("MPM_GENERALIZE_THRESHOLD") {
        config.generalize_threshold = parse_env("MPM_GENERALIZE_THRESHOLD", &value)?;
    }
    if let Ok(value) = std::env::var("MPM_GENERALIZE_FS_THRESHOLD") {
        config.generalize_fs_threshold = parse_env("MPM_GENERALIZE_FS_THRESHOLD", &value)?;
    }
    if let Ok(value) = std::env::var("MPM_GENERALIZE_PROC") {
        config.generalize_proc = parse_env("MPM_GENERALIZE_PROC", &value)?;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_no_file_or_env() {
        let config = load(None).unwrap();
        assert_eq!(config, MiningConfig::default());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "generalize_threshold = 0.8").unwrap();
        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.generalize_threshold, 0.8);
        assert_eq!(config.generalize_fs_threshold, MiningConfig::default().generalize_fs_threshold);
    }
}
