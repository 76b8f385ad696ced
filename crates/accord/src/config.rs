//! Configuration loading for the launcher.
//!
//! Missing file means defaults; `ACCORD_DRIVE_TOKEN` overrides the configured
//! access token.

use crate::error::ConfigError;
use accord_protocol::defaults::DRIVE_TOKEN_ENV;
use accord_protocol::AccordConfig;
use std::fs;
use std::path::Path;
use tracing::debug;

pub use accord_protocol::paths::{accord_home, default_config_path, default_records_dir};

/// Load the config at `path` and apply environment overrides.
pub fn load_config(path: &Path) -> Result<AccordConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// [`load_config`] with an injectable environment lookup.
pub fn load_config_with_env<F>(path: &Path, env: F) -> Result<AccordConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = if path.exists() {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        AccordConfig::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?
    } else {
        debug!("No config at {}; using defaults", path.display());
        AccordConfig::default()
    };

    if let Some(token) = env(DRIVE_TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
        debug!("Using access token from {}", DRIVE_TOKEN_ENV);
        config.store.access_token = Some(token.trim().to_string());
    }

    Ok(config)
}
