//! Canonical default values shared across the pipeline crates.

pub const DEFAULT_TEMPLATES_DIR: &str = "templates";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DRIVE_TOKEN_ENV: &str = "ACCORD_DRIVE_TOKEN";
/// Longest display name sent to the store for files and folders.
pub const MAX_DISPLAY_NAME_CHARS: usize = 120;
