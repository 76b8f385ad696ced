//! Payload types shared by the resolver, renderer, store and pipeline crates.

use accord_ids::{FileId, FolderId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Lifecycle
// ============================================================================

/// Storage state of a submission. Each state maps to exactly one lifecycle
/// folder in the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Awaiting review (initial state, and the target of every resubmission)
    #[default]
    Pending,
    Approved,
    Rejected,
    /// Superseded artifacts
    Archived,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 4] = [
        LifecycleState::Pending,
        LifecycleState::Approved,
        LifecycleState::Rejected,
        LifecycleState::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Pending => "pending",
            LifecycleState::Approved => "approved",
            LifecycleState::Rejected => "rejected",
            LifecycleState::Archived => "archived",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(LifecycleState::Pending),
            "approved" => Ok(LifecycleState::Approved),
            "rejected" => Ok(LifecycleState::Rejected),
            "archived" => Ok(LifecycleState::Archived),
            _ => Err(format!(
                "Invalid lifecycle state: '{}'. Expected: pending, approved, rejected, or archived",
                s
            )),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Ordered field map. Entries keep the order in which they were supplied
/// (JSON object order on deserialization); inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap {
    #[serde(deserialize_with = "scalar_values")]
    entries: IndexMap<String, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Field values arrive as JSON scalars; numbers and booleans are kept in
/// their textual form and `null` becomes the empty string.
fn scalar_values<'de, D: Deserializer<'de>>(deserializer: D) -> Result<IndexMap<String, String>, D::Error> {
    IndexMap::<String, serde_json::Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::Null => String::new(),
                serde_json::Value::String(s) => s,
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                other => {
                    return Err(de::Error::custom(format!(
                        "field '{}' must be a scalar, got {}",
                        key, other
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}

/// Structure used by the programmatic renderer when no template applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralFallback {
    pub title: String,
    #[serde(default)]
    pub clauses: Vec<String>,
}

/// Everything the renderer needs for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub type_name: String,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub structural_fallback: StructuralFallback,
}

impl RenderRequest {
    pub fn new(type_name: impl Into<String>, fields: FieldMap) -> Self {
        let type_name = type_name.into();
        Self {
            structural_fallback: StructuralFallback {
                title: type_name.clone(),
                clauses: Vec::new(),
            },
            type_name,
            fields,
        }
    }

    pub fn with_fallback(mut self, title: impl Into<String>, clauses: Vec<String>) -> Self {
        self.structural_fallback = StructuralFallback {
            title: title.into(),
            clauses,
        };
        self
    }
}

/// Which renderer strategy produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducedBy {
    Template,
    Programmatic,
}

impl ProducedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProducedBy::Template => "template",
            ProducedBy::Programmatic => "programmatic",
        }
    }
}

impl fmt::Display for ProducedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rendered word-processing package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub binary: Vec<u8>,
    pub produced_by: ProducedBy,
    /// Template file used, when `produced_by == Template`
    pub template_file: Option<String>,
}

/// A supplementary file uploaded next to the main document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annex {
    pub display_name: String,
    pub mime_type: String,
    pub binary: Vec<u8>,
}

// ============================================================================
// Storage
// ============================================================================

/// Folder in the remote store. The pipeline only references ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageFolder {
    pub id: FolderId,
    pub parent_id: Option<FolderId>,
    pub display_name: String,
    pub owner_identity: Option<String>,
}

/// How far down the upload chain a document had to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadTier {
    /// Converted to the store's native editable format
    Native,
    /// Uploaded as the unmodified binary
    Raw,
    /// Nothing reached the store
    LocalFallback,
}

impl UploadTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadTier::Native => "native",
            UploadTier::Raw => "raw",
            UploadTier::LocalFallback => "local_fallback",
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, UploadTier::Native)
    }
}

impl fmt::Display for UploadTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A document as stored (or as a placeholder when storing failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArtifact {
    pub file_id: FileId,
    pub view_link: String,
    pub download_link: String,
    pub is_native_format: bool,
    pub is_local_fallback: bool,
}

impl StoredArtifact {
    pub fn tier(&self) -> UploadTier {
        if self.is_local_fallback {
            UploadTier::LocalFallback
        } else if self.is_native_format {
            UploadTier::Native
        } else {
            UploadTier::Raw
        }
    }
}

/// What the Record Store persists as the record's document pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPointer {
    pub document_url: String,
    pub is_native_format: bool,
    pub is_local_fallback: bool,
}

impl From<&StoredArtifact> for DocumentPointer {
    fn from(artifact: &StoredArtifact) -> Self {
        Self {
            document_url: artifact.view_link.clone(),
            is_native_format: artifact.is_native_format,
            is_local_fallback: artifact.is_local_fallback,
        }
    }
}

/// The pipeline's view of a record owned by the Record Store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    /// View link or bare id of the active artifact
    pub artifact_locator: String,
    /// Per-submission folder, when the submission was stored as a bundle
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    #[serde(default)]
    pub state: LifecycleState,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_map_keeps_json_order() {
        let json = r#"{"zeta": "1", "alpha": 2, "mid": null, "flag": true}"#;
        let map: FieldMap = serde_json::from_str(json).unwrap();
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid", "flag"]);
        assert_eq!(map.get("alpha"), Some("2"));
        assert_eq!(map.get("mid"), Some(""));
        assert_eq!(map.get("flag"), Some("true"));

        let back = serde_json::to_string(&map).unwrap();
        assert!(back.starts_with(r#"{"zeta":"1","alpha":"2""#));
    }

    #[test]
    fn field_map_rejects_nested_values() {
        let err = serde_json::from_str::<FieldMap>(r#"{"a": {"b": 1}}"#).unwrap_err();
        assert!(err.to_string().contains("must be a scalar"));
    }

    #[test]
    fn field_map_insert_replaces_in_place() {
        let mut map: FieldMap = [("a", "1"), ("b", "2")].into_iter().collect();
        map.insert("a", "3");
        let pairs: Vec<(&str, &str)> = map.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn field_map_later_duplicates_win() {
        let map: FieldMap = [("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some("3"));
        assert_eq!(map.iter().next(), Some(("a", "3")));
    }

    #[test]
    fn lifecycle_state_parses_case_insensitively() {
        assert_eq!("Approved".parse::<LifecycleState>(), Ok(LifecycleState::Approved));
        assert!("done".parse::<LifecycleState>().is_err());
        assert_eq!(LifecycleState::default(), LifecycleState::Pending);
    }

    #[test]
    fn artifact_tier_reflects_flags() {
        let mut artifact = StoredArtifact {
            file_id: FileId::parse("abc").unwrap(),
            view_link: "https://example.org/d/abc/view".to_string(),
            download_link: "https://example.org/uc?id=abc".to_string(),
            is_native_format: true,
            is_local_fallback: false,
        };
        assert_eq!(artifact.tier(), UploadTier::Native);
        artifact.is_native_format = false;
        assert_eq!(artifact.tier(), UploadTier::Raw);
        artifact.is_local_fallback = true;
        assert_eq!(artifact.tier(), UploadTier::LocalFallback);
        assert!(artifact.tier().is_degraded());

        let pointer = DocumentPointer::from(&artifact);
        assert_eq!(pointer.document_url, artifact.view_link);
        assert!(pointer.is_local_fallback);
    }
}
