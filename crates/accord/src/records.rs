//! JSON-file record store used by the CLI: one file per submission under
//! `$ACCORD_HOME/records/<id>.json`.

use crate::error::RecordError;
use crate::submission::RecordStore;
use accord_ids::SubmissionId;
use accord_protocol::{Annex, DocumentPointer, FieldMap, RenderRequest, StructuralFallback, SubmissionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Draft,
    Submitted,
}

/// A persisted submission row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSubmission {
    pub id: SubmissionId,
    pub type_name: String,
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub structural_fallback: StructuralFallback,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub record: Option<SubmissionRecord>,
    #[serde(default)]
    pub pointer: Option<DocumentPointer>,
    /// Why the last creation attempt was reverted
    #[serde(default)]
    pub draft_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredSubmission {
    pub fn new(id: SubmissionId, request: &RenderRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            type_name: request.type_name.clone(),
            fields: request.fields.clone(),
            structural_fallback: request.structural_fallback.clone(),
            status: SubmissionStatus::Draft,
            record: None,
            pointer: None,
            draft_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn render_request(&self) -> RenderRequest {
        RenderRequest {
            type_name: self.type_name.clone(),
            fields: self.fields.clone(),
            structural_fallback: self.structural_fallback.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    dir: PathBuf,
}

impl JsonRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &SubmissionId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn load(&self, id: &SubmissionId) -> Result<StoredSubmission, RecordError> {
        let raw = match fs::read_to_string(self.path_for(id)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RecordError::NotFound(id.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write through a sibling temp file so readers never see half a record.
    pub fn save(&self, submission: &StoredSubmission) -> Result<(), RecordError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&submission.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(submission)?)?;
        fs::rename(&tmp, &path)?;
        debug!("Saved record {}", path.display());
        Ok(())
    }

    fn update<F>(&self, id: &SubmissionId, apply: F) -> Result<(), RecordError>
    where
        F: FnOnce(&mut StoredSubmission),
    {
        let mut submission = self.load(id)?;
        apply(&mut submission);
        submission.updated_at = Utc::now();
        self.save(&submission)
    }
}

impl RecordStore for JsonRecordStore {
    fn update_document_pointer(
        &self,
        submission: &SubmissionId,
        pointer: &DocumentPointer,
        record: &SubmissionRecord,
    ) -> Result<(), RecordError> {
        self.update(submission, |s| {
            s.status = SubmissionStatus::Submitted;
            s.pointer = Some(pointer.clone());
            s.record = Some(record.clone());
            s.draft_reason = None;
        })
    }

    fn revert_to_draft(&self, submission: &SubmissionId, reason: &str) -> Result<(), RecordError> {
        self.update(submission, |s| {
            s.status = SubmissionStatus::Draft;
            s.draft_reason = Some(reason.to_string());
        })
    }
}

/// Load an annex from disk; the display name is the file name.
pub fn annex_from_path(path: &Path) -> io::Result<Annex> {
    let binary = fs::read(path)?;
    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(Annex {
        mime_type: accord_protocol::mime::guess_from_name(&display_name).to_string(),
        display_name,
        binary,
    })
}
