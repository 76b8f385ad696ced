//! Error types for the remote store boundary and the orchestrator.
//!
//! Remote failures are classified once, in [`classify_remote_error`]. Nothing
//! else in the workspace inspects error strings.

use accord_ids::FolderId;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Coarse category of a remote store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// The identity has no storage quota (typical for service accounts)
    QuotaExceeded,
    Unauthorized,
    NotFound,
    RateLimited,
    /// The request never produced an HTTP response
    Transport,
    Other,
}

impl RemoteErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteErrorKind::QuotaExceeded => "quota_exceeded",
            RemoteErrorKind::Unauthorized => "unauthorized",
            RemoteErrorKind::NotFound => "not_found",
            RemoteErrorKind::RateLimited => "rate_limited",
            RemoteErrorKind::Transport => "transport",
            RemoteErrorKind::Other => "other",
        }
    }

    /// Failures after which an upload is retried without format conversion.
    pub fn allows_raw_retry(&self) -> bool {
        matches!(self, RemoteErrorKind::QuotaExceeded | RemoteErrorKind::Unauthorized)
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified remote store failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
    /// HTTP status, when the store answered
    pub status: Option<u16>,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Build from a store response, classifying it.
    pub fn from_response(status: u16, reason: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: classify_remote_error(Some(status), reason, &message),
            message,
            status: Some(status),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transport, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }
}

const QUOTA_SIGNATURES: &[&str] = &[
    "storagequotaexceeded",
    "service accounts do not have storage quota",
    "storage quota has been exceeded",
];

const RATE_LIMIT_REASONS: &[&str] = &["ratelimitexceeded", "userratelimitexceeded"];

const AUTH_REASONS: &[&str] = &["autherror", "insufficientpermissions", "forbidden", "unauthorized"];

/// Translate a remote failure into its kind.
///
/// `status` is `None` when no response arrived. `reason` is the store's
/// machine-readable reason, when it sent one. Signatures are matched
/// case-insensitively against both the reason and the message; quota
/// signatures take precedence because stores report them as 403.
pub fn classify_remote_error(status: Option<u16>, reason: Option<&str>, message: &str) -> RemoteErrorKind {
    let reason = reason.unwrap_or("").to_ascii_lowercase();
    let message = message.to_ascii_lowercase();
    let mentions = |needle: &str| reason.contains(needle) || message.contains(needle);

    if QUOTA_SIGNATURES.iter().any(|sig| mentions(sig)) {
        return RemoteErrorKind::QuotaExceeded;
    }
    if status == Some(429) || RATE_LIMIT_REASONS.contains(&reason.as_str()) {
        return RemoteErrorKind::RateLimited;
    }
    if matches!(status, Some(401) | Some(403)) || AUTH_REASONS.contains(&reason.as_str()) {
        return RemoteErrorKind::Unauthorized;
    }
    if status == Some(404) || reason == "notfound" {
        return RemoteErrorKind::NotFound;
    }
    match status {
        None => RemoteErrorKind::Transport,
        Some(_) => RemoteErrorKind::Other,
    }
}

/// Orchestrator error type
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Native conversion refused for lack of quota; triggers the raw retry
    #[error("Remote quota exceeded while uploading '{name}': {source}")]
    RemoteQuotaExceeded { name: String, source: RemoteError },

    /// An upload attempt failed; the next tier takes over
    #[error("Remote upload of '{name}' failed: {source}")]
    RemoteUploadFailure { name: String, source: RemoteError },

    #[error("Failed to delete {id}: {source}")]
    RemoteDeleteFailure { id: String, source: RemoteError },

    #[error("Failed to move {id} to {target}: {source}")]
    RemoteMoveFailure {
        id: String,
        target: FolderId,
        source: RemoteError,
    },

    #[error("Failed to create folder '{name}': {source}")]
    FolderCreate { name: String, source: RemoteError },

    #[error("Failed to transfer ownership of {folder} to {owner}: {source}")]
    OwnershipTransfer {
        folder: FolderId,
        owner: String,
        source: RemoteError,
    },
}

impl StorageError {
    /// Classify a failed upload attempt.
    pub fn upload(name: impl Into<String>, source: RemoteError) -> Self {
        let name = name.into();
        if source.kind == RemoteErrorKind::QuotaExceeded {
            Self::RemoteQuotaExceeded { name, source }
        } else {
            Self::RemoteUploadFailure { name, source }
        }
    }

    /// The underlying remote failure.
    pub fn remote(&self) -> &RemoteError {
        match self {
            StorageError::RemoteQuotaExceeded { source, .. }
            | StorageError::RemoteUploadFailure { source, .. }
            | StorageError::RemoteDeleteFailure { source, .. }
            | StorageError::RemoteMoveFailure { source, .. }
            | StorageError::FolderCreate { source, .. }
            | StorageError::OwnershipTransfer { source, .. } => source,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_account_quota_signatures() {
        assert_eq!(
            classify_remote_error(Some(403), Some("storageQuotaExceeded"), "The user's Drive storage quota has been exceeded."),
            RemoteErrorKind::QuotaExceeded
        );
        assert_eq!(
            classify_remote_error(
                Some(403),
                Some("forbidden"),
                "Service Accounts do not have storage quota. Leverage shared drives instead."
            ),
            RemoteErrorKind::QuotaExceeded
        );
        assert_eq!(
            classify_remote_error(Some(400), None, "STORAGEQUOTAEXCEEDED"),
            RemoteErrorKind::QuotaExceeded
        );
    }

    #[test]
    fn rate_limits() {
        assert_eq!(classify_remote_error(Some(429), None, "Too Many Requests"), RemoteErrorKind::RateLimited);
        assert_eq!(
            classify_remote_error(Some(403), Some("userRateLimitExceeded"), "User rate limit exceeded."),
            RemoteErrorKind::RateLimited
        );
    }

    #[test]
    fn authorization_failures() {
        assert_eq!(classify_remote_error(Some(401), Some("authError"), "Invalid Credentials"), RemoteErrorKind::Unauthorized);
        assert_eq!(
            classify_remote_error(Some(403), Some("insufficientPermissions"), "Insufficient Permission"),
            RemoteErrorKind::Unauthorized
        );
    }

    #[test]
    fn not_found_transport_and_other() {
        assert_eq!(classify_remote_error(Some(404), Some("notFound"), "File not found: X."), RemoteErrorKind::NotFound);
        assert_eq!(classify_remote_error(None, None, "connection refused"), RemoteErrorKind::Transport);
        assert_eq!(classify_remote_error(Some(500), Some("backendError"), "Backend Error"), RemoteErrorKind::Other);
        assert_eq!(classify_remote_error(Some(400), Some("badRequest"), "Bad Request"), RemoteErrorKind::Other);
    }

    #[test]
    fn only_quota_and_auth_allow_raw_retry() {
        assert!(RemoteErrorKind::QuotaExceeded.allows_raw_retry());
        assert!(RemoteErrorKind::Unauthorized.allows_raw_retry());
        assert!(!RemoteErrorKind::Transport.allows_raw_retry());
        assert!(!RemoteErrorKind::RateLimited.allows_raw_retry());
    }

    #[test]
    fn upload_errors_split_on_quota() {
        let quota = RemoteError::from_response(403, Some("storageQuotaExceeded"), "quota");
        assert!(matches!(StorageError::upload("doc", quota), StorageError::RemoteQuotaExceeded { .. }));
        let other = RemoteError::transport("reset");
        let err = StorageError::upload("doc", other.clone());
        assert!(matches!(err, StorageError::RemoteUploadFailure { .. }));
        assert_eq!(err.remote(), &other);
    }
}
