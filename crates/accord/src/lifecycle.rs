//! Lifecycle states of stored submissions and the moves between them.
//!
//! Each state owns one folder in the store. Allowed transitions:
//!
//! | from | to |
//! |---|---|
//! | (new) | Pending |
//! | any | Pending (resubmission) |
//! | Pending | Approved, Rejected |
//! | Approved, Rejected | Archived |
//!
//! Pending is only entered by storing a new document, which the submission
//! pipeline does on create and resubmit. [`LifecycleManager`] performs the
//! other moves. Who may approve or reject is decided outside the pipeline;
//! this module only checks that the move makes sense and performs it.

use crate::error::LifecycleError;
use accord_ids::{FileId, FolderId};
use accord_protocol::{FoldersConfig, LifecycleState, SubmissionRecord};
use accord_store::StorageOrchestrator;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Folder ids of the four lifecycle containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleFolders {
    pub pending: FolderId,
    pub approved: FolderId,
    pub rejected: FolderId,
    pub archived: FolderId,
}

impl LifecycleFolders {
    /// Every state must be configured; values may be bare ids or folder links.
    pub fn from_config(config: &FoldersConfig) -> Result<Self, LifecycleError> {
        let folder = |state: LifecycleState| -> Result<FolderId, LifecycleError> {
            let raw = config
                .get(state)
                .filter(|v| !v.trim().is_empty())
                .ok_or(LifecycleError::MissingFolder(state))?;
            FolderId::from_locator(raw).map_err(|source| LifecycleError::InvalidLocator {
                locator: raw.to_string(),
                source,
            })
        };
        Ok(Self {
            pending: folder(LifecycleState::Pending)?,
            approved: folder(LifecycleState::Approved)?,
            rejected: folder(LifecycleState::Rejected)?,
            archived: folder(LifecycleState::Archived)?,
        })
    }

    pub fn folder(&self, state: LifecycleState) -> &FolderId {
        match state {
            LifecycleState::Pending => &self.pending,
            LifecycleState::Approved => &self.approved,
            LifecycleState::Rejected => &self.rejected,
            LifecycleState::Archived => &self.archived,
        }
    }

    /// State whose container is `folder`, if any.
    pub fn state_of(&self, folder: &FolderId) -> Option<LifecycleState> {
        LifecycleState::ALL
            .into_iter()
            .find(|state| self.folder(*state) == folder)
    }
}

/// Whether a record in `from` (`None` for a new record) may move to `to`.
pub fn is_allowed_transition(from: Option<LifecycleState>, to: LifecycleState) -> bool {
    use LifecycleState::*;
    match (from, to) {
        (_, Pending) => true,
        (Some(Pending), Approved | Rejected) => true,
        (Some(Approved | Rejected), Archived) => true,
        _ => false,
    }
}

/// Whether an already stored record may be moved from `from` to `to`.
/// Re-entering Pending needs a new document, so it is never a plain move.
pub fn is_allowed_move(from: LifecycleState, to: LifecycleState) -> bool {
    to != LifecycleState::Pending && is_allowed_transition(Some(from), to)
}

/// Result of a transition. The record's state always follows the request;
/// `error` carries a failed move, which nothing reconciles later.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub record: SubmissionRecord,
    pub from: LifecycleState,
    /// The remote item now sits in the target folder
    pub moved: bool,
    pub error: Option<String>,
}

pub struct LifecycleManager {
    orchestrator: Arc<StorageOrchestrator>,
    folders: LifecycleFolders,
}

impl LifecycleManager {
    pub fn new(orchestrator: Arc<StorageOrchestrator>, folders: LifecycleFolders) -> Self {
        Self {
            orchestrator,
            folders,
        }
    }

    pub fn folders(&self) -> &LifecycleFolders {
        &self.folders
    }

    /// Move the record's submission folder (or, without one, its artifact)
    /// into the folder of `target`.
    ///
    /// A disallowed move (including any move to Pending) makes no remote call. A failed move is logged
    /// and reported in the outcome; the returned record is in `target` either
    /// way.
    pub fn transition(
        &self,
        record: &SubmissionRecord,
        target: LifecycleState,
    ) -> Result<TransitionOutcome, LifecycleError> {
        let from = record.state;
        if !is_allowed_move(from, target) {
            return Err(LifecycleError::InvalidTransition { from, to: target });
        }
        let destination = self.folders.folder(target);

        let (moved, result) = match &record.folder_id {
            Some(folder_id) => (true, self.orchestrator.move_folder(folder_id, destination)),
            None => {
                let file_id = FileId::from_locator(&record.artifact_locator).map_err(|source| {
                    LifecycleError::InvalidLocator {
                        locator: record.artifact_locator.clone(),
                        source,
                    }
                })?;
                (
                    !file_id.is_local_fallback(),
                    self.orchestrator.move_artifact(&file_id, destination),
                )
            }
        };

        let error = match result {
            Ok(()) => {
                info!("Submission moved {} -> {}", from, target);
                None
            }
            Err(e) => {
                warn!("Submission state {} -> {} recorded without move: {}", from, target, e);
                Some(e.to_string())
            }
        };

        let mut updated = record.clone();
        updated.state = target;
        updated.updated_at = Some(Utc::now());
        Ok(TransitionOutcome {
            record: updated,
            from,
            moved: moved && error.is_none(),
            error,
        })
    }

    pub fn approve(&self, record: &SubmissionRecord) -> Result<TransitionOutcome, LifecycleError> {
        self.transition(record, LifecycleState::Approved)
    }

    pub fn reject(&self, record: &SubmissionRecord) -> Result<TransitionOutcome, LifecycleError> {
        self.transition(record, LifecycleState::Rejected)
    }

    /// Mark a decided submission as superseded.
    pub fn archive(&self, record: &SubmissionRecord) -> Result<TransitionOutcome, LifecycleError> {
        self.transition(record, LifecycleState::Archived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_store::{FaultPoint, MemoryStore, OrchestratorOptions, RemoteError, RemoteStore};

    fn folders() -> LifecycleFolders {
        LifecycleFolders::from_config(&FoldersConfig {
            pending: Some("PENDING".to_string()),
            approved: Some("https://drive.google.com/drive/folders/APPROVED?usp=sharing".to_string()),
            rejected: Some("REJECTED".to_string()),
            archived: Some("ARCHIVED".to_string()),
        })
        .unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, LifecycleManager) {
        let store = Arc::new(MemoryStore::new());
        let folders = folders();
        for state in LifecycleState::ALL {
            store.add_folder(folders.folder(state), state.as_str(), None, "convenios@example.edu");
        }
        let orchestrator = Arc::new(StorageOrchestrator::new(store.clone(), OrchestratorOptions::default()));
        (store, LifecycleManager::new(orchestrator, folders))
    }

    fn record_for(store: &MemoryStore, id: &str, state: LifecycleState, folders: &LifecycleFolders) -> SubmissionRecord {
        store.add_file(&FileId::parse(id).unwrap(), "doc", folders.folder(state));
        SubmissionRecord {
            artifact_locator: format!("https://docs.google.com/document/d/{}/edit", id),
            folder_id: None,
            state,
            updated_at: None,
        }
    }

    #[test]
    fn transition_table() {
        use LifecycleState::*;
        assert!(is_allowed_transition(None, Pending));
        assert!(!is_allowed_transition(None, Approved));
        assert!(is_allowed_transition(Some(Pending), Approved));
        assert!(is_allowed_transition(Some(Pending), Rejected));
        assert!(is_allowed_transition(Some(Rejected), Pending));
        assert!(is_allowed_transition(Some(Approved), Archived));
        assert!(is_allowed_transition(Some(Rejected), Archived));
        assert!(!is_allowed_transition(Some(Pending), Archived));
        assert!(!is_allowed_transition(Some(Approved), Rejected));
        assert!(!is_allowed_transition(Some(Archived), Approved));
    }

    #[test]
    fn decided_submission_cannot_be_moved_back_to_pending() {
        let (store, manager) = setup();
        let record = record_for(&store, "DOC4", LifecycleState::Rejected, manager.folders());

        let err = manager.transition(&record, LifecycleState::Pending).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                from: LifecycleState::Rejected,
                to: LifecycleState::Pending
            }
        ));
        assert!(store.calls().is_empty());
        assert!(!is_allowed_move(LifecycleState::Pending, LifecycleState::Pending));
        assert!(is_allowed_move(LifecycleState::Pending, LifecycleState::Approved));
    }

    #[test]
    fn missing_folder_config_is_reported() {
        let err = LifecycleFolders::from_config(&FoldersConfig {
            pending: Some("P".to_string()),
            approved: Some("A".to_string()),
            rejected: Some(" ".to_string()),
            archived: None,
        })
        .unwrap_err();
        assert!(matches!(err, LifecycleError::MissingFolder(LifecycleState::Rejected)));
    }

    #[test]
    fn approve_moves_artifact_to_approved_only() {
        let (store, manager) = setup();
        let record = record_for(&store, "DOC1", LifecycleState::Pending, manager.folders());

        let outcome = manager.approve(&record).unwrap();
        assert!(outcome.moved);
        assert_eq!(outcome.record.state, LifecycleState::Approved);
        assert!(outcome.record.updated_at.is_some());
        assert_eq!(
            store.get_metadata("DOC1").unwrap().parents,
            vec![FolderId::parse("APPROVED").unwrap()]
        );
    }

    #[test]
    fn invalid_transition_makes_no_remote_call() {
        let (store, manager) = setup();
        let record = record_for(&store, "DOC2", LifecycleState::Approved, manager.folders());

        let err = manager.reject(&record).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                from: LifecycleState::Approved,
                to: LifecycleState::Rejected
            }
        ));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn failed_move_still_changes_state() {
        let (store, manager) = setup();
        let record = record_for(&store, "DOC3", LifecycleState::Pending, manager.folders());
        store.fail(FaultPoint::UpdateParents, RemoteError::transport("timeout"));

        let outcome = manager.reject(&record).unwrap();
        assert_eq!(outcome.record.state, LifecycleState::Rejected);
        assert!(!outcome.moved);
        assert!(outcome.error.is_some());
        assert_eq!(store.parents_of("DOC3"), Some(vec![FolderId::parse("PENDING").unwrap()]));
    }

    #[test]
    fn bundled_submission_moves_its_folder() {
        let (store, manager) = setup();
        let folder = store.create_folder("2024-03-09 Convenio Marco 1a2b3c4d", manager.folders().folder(LifecycleState::Pending)).unwrap();
        let record = SubmissionRecord {
            artifact_locator: "memory://files/d/x/view".to_string(),
            folder_id: Some(folder.clone()),
            state: LifecycleState::Pending,
            updated_at: None,
        };

        let outcome = manager.approve(&record).unwrap();
        assert!(outcome.moved);
        assert_eq!(store.parents_of(folder.as_str()), Some(vec![FolderId::parse("APPROVED").unwrap()]));
        assert_eq!(manager.folders().state_of(&FolderId::parse("APPROVED").unwrap()), Some(LifecycleState::Approved));
    }
}
