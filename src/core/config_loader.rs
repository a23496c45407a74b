//! # Config Loader
//!
//! Reads `config.toml` into an [`AppConfig`]. A missing default file is not an
//! error; an explicitly requested file must exist.

use crate::{core::paths, models::AppConfig};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine the configuration path: {0}")]
    Path(#[from] paths::PathError),
    #[error("Could not read configuration file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Loads the configuration from `explicit`, or from the default location.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path: PathBuf = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default_path = paths::get_config_path()?;
            if !default_path.exists() {
                log::debug!(
                    "No config file at '{}', using defaults",
                    default_path.display()
                );
                return Ok(AppConfig::default());
            }
            default_path
        }
    };
    load_config_file(&path)
}

/// Loads and parses one config file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let config = parse_config(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;
    log::debug!(
        "Loaded config '{}' ({} commands)",
        path.display(),
        config.commands.len()
    );
    Ok(config)
}

/// Parses config text.
pub fn parse_config(content: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(content)
}
