//! Shared identifier wrappers for Accord.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix carried by ids of artifacts that never reached the remote store.
pub const LOCAL_FALLBACK_PREFIX: &str = "local-";
/// Link scheme of local fallback artifacts.
pub const LOCAL_FALLBACK_SCHEME: &str = "local-fallback://";

/// Error returned when parsing an identifier fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

macro_rules! define_uuid_id {
    ($name:ident, $label:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                Uuid::parse_str(value)
                    .map_err(|e| IdParseError::new(format!("Invalid {}: {}", $label, e)))?;
                Ok(Self(value.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

/// Ids minted by the remote store are opaque; we only require them to be
/// non-empty and free of path/query separators.
macro_rules! define_remote_id {
    ($name:ident, $label:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(IdParseError::new(format!("Invalid {}: empty", $label)));
                }
                if trimmed
                    .chars()
                    .any(|c| matches!(c, '/' | '?' | '&' | '#') || c.is_whitespace())
                {
                    return Err(IdParseError::new(format!(
                        "Invalid {}: '{}' contains separator characters",
                        $label, trimmed
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True for placeholder ids handed out when every remote attempt failed.
            pub fn is_local_fallback(&self) -> bool {
                self.0.starts_with(LOCAL_FALLBACK_PREFIX)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_uuid_id!(SubmissionId, "submission ID");
define_remote_id!(FileId, "file ID");
define_remote_id!(FolderId, "folder ID");

impl FileId {
    /// Mint a placeholder id for a local fallback artifact.
    pub fn local_fallback() -> Self {
        Self(format!("{}{}", LOCAL_FALLBACK_PREFIX, Uuid::new_v4().simple()))
    }

    /// Link under which a local fallback artifact is reported.
    pub fn local_fallback_link(&self) -> String {
        format!("{}{}", LOCAL_FALLBACK_SCHEME, self.0)
    }

    /// Reduce a stored document locator to a file id.
    ///
    /// Accepts bare ids and the link shapes the store hands out:
    /// `.../d/<id>/edit`, `...?id=<id>&...`, `local-fallback://<id>`.
    pub fn from_locator(locator: &str) -> Result<Self, IdParseError> {
        let locator = locator.trim();
        if let Some(rest) = locator.strip_prefix(LOCAL_FALLBACK_SCHEME) {
            return Self::parse(rest.trim_end_matches('/'));
        }
        if let Some(idx) = locator.find("/d/") {
            let rest = &locator[idx + 3..];
            let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
            return Self::parse(&rest[..end]);
        }
        if let Some(idx) = locator.find("id=") {
            let preceded_ok = idx == 0 || matches!(locator.as_bytes()[idx - 1], b'?' | b'&');
            if preceded_ok {
                let rest = &locator[idx + 3..];
                let end = rest.find(['&', '#']).unwrap_or(rest.len());
                return Self::parse(&rest[..end]);
            }
        }
        if locator.contains("://") {
            return Err(IdParseError::new(format!(
                "Invalid file ID: no id found in locator '{}'",
                locator
            )));
        }
        Self::parse(locator)
    }
}

impl FolderId {
    /// Reduce a folder link (`.../folders/<id>`) or bare id to a folder id.
    pub fn from_locator(locator: &str) -> Result<Self, IdParseError> {
        let locator = locator.trim();
        if let Some(idx) = locator.find("/folders/") {
            let rest = &locator[idx + "/folders/".len()..];
            let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
            return Self::parse(&rest[..end]);
        }
        Self::parse(locator)
    }
}
