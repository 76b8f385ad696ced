//! Pipeline configuration shared by the launcher and the library crates.

use crate::defaults::{
    DEFAULT_DRIVE_API_BASE, DEFAULT_DRIVE_SCOPE, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_TEMPLATES_DIR,
};
use crate::types::LifecycleState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Canonical configuration, usually read from `~/.accord/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccordConfig {
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub folders: FoldersConfig,
}

impl AccordConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory listed on every render to find candidate templates
    #[serde(default = "default_templates_dir")]
    pub dir: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_templates_dir(),
        }
    }
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TEMPLATES_DIR)
}

/// Which remote store implementation the launcher wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Google Drive v3 REST API
    #[default]
    Drive,
    /// In-process store (dry runs)
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Drive => "drive",
            StoreBackend::Memory => "memory",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drive" => Ok(StoreBackend::Drive),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: '{}'. Expected: drive or memory", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Service-account key file (JSON) used to mint access tokens
    #[serde(default)]
    pub credentials: Option<PathBuf>,
    /// Pre-minted bearer token; never written back out
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Ask the store to convert uploads to its native document format
    #[serde(default = "default_true")]
    pub prefer_native_conversion: bool,
    /// Identity that should own new submission folders when the caller names none
    #[serde(default)]
    pub default_owner: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            api_base: default_api_base(),
            credentials: None,
            access_token: None,
            scope: default_scope(),
            prefer_native_conversion: true,
            default_owner: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_DRIVE_API_BASE.to_string()
}

fn default_scope() -> String {
    DEFAULT_DRIVE_SCOPE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// Remote folder ids of the four lifecycle containers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldersConfig {
    #[serde(default)]
    pub pending: Option<String>,
    #[serde(default)]
    pub approved: Option<String>,
    #[serde(default)]
    pub rejected: Option<String>,
    #[serde(default)]
    pub archived: Option<String>,
}

impl FoldersConfig {
    pub fn get(&self, state: LifecycleState) -> Option<&str> {
        match state {
            LifecycleState::Pending => self.pending.as_deref(),
            LifecycleState::Approved => self.approved.as_deref(),
            LifecycleState::Rejected => self.rejected.as_deref(),
            LifecycleState::Archived => self.archived.as_deref(),
        }
    }

    /// States whose folder id is not configured.
    pub fn missing(&self) -> Vec<LifecycleState> {
        LifecycleState::ALL
            .into_iter()
            .filter(|state| self.get(*state).map_or(true, |id| id.trim().is_empty()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = AccordConfig::from_toml_str("").unwrap();
        assert_eq!(config.templates.dir, PathBuf::from(DEFAULT_TEMPLATES_DIR));
        assert_eq!(config.store.backend, StoreBackend::Drive);
        assert!(config.store.prefer_native_conversion);
        assert_eq!(config.folders.missing().len(), 4);
    }

    #[test]
    fn full_config_parses() {
        let raw = r#"
            [templates]
            dir = "/srv/plantillas"

            [store]
            backend = "memory"
            prefer_native_conversion = false
            default_owner = "convenios@example.edu"

            [folders]
            pending = "F-PEND"
            approved = "F-APPR"
            rejected = "F-REJ"
            archived = "F-ARCH"
        "#;
        let config = AccordConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.templates.dir, PathBuf::from("/srv/plantillas"));
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(!config.store.prefer_native_conversion);
        assert_eq!(config.store.default_owner.as_deref(), Some("convenios@example.edu"));
        assert_eq!(config.folders.get(LifecycleState::Rejected), Some("F-REJ"));
        assert!(config.folders.missing().is_empty());
    }

    #[test]
    fn access_token_is_not_serialized() {
        let mut config = AccordConfig::default();
        config.store.access_token = Some("secret".to_string());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("secret"));
    }
}
