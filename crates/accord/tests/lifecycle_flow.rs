//! A submission travelling through its lifecycle folders.

use accord::{
    is_allowed_move, JsonRecordStore, LifecycleError, LifecycleFolders, LifecycleManager,
    PipelineOptions, StoredSubmission, SubmissionPipeline, SubmissionRequest, SubmissionStatus,
};
use accord_ids::{FileId, FolderId, SubmissionId};
use accord_protocol::{Annex, FieldMap, FoldersConfig, LifecycleState, RenderRequest, SubmissionRecord};
use accord_store::{MemoryStore, OrchestratorOptions, StorageOrchestrator};
use accord_templates::{DocumentRenderer, TemplateSource};
use proptest::prelude::*;
use std::sync::Arc;

fn folders() -> LifecycleFolders {
    LifecycleFolders::from_config(&FoldersConfig {
        pending: Some("PENDING".to_string()),
        approved: Some("APPROVED".to_string()),
        rejected: Some("REJECTED".to_string()),
        archived: Some("ARCHIVED".to_string()),
    })
    .unwrap()
}

fn setup() -> (Arc<MemoryStore>, Arc<StorageOrchestrator>) {
    let store = Arc::new(MemoryStore::new());
    let folders = folders();
    for state in LifecycleState::ALL {
        store.add_folder(folders.folder(state), state.as_str(), None, "convenios@example.edu");
    }
    let orchestrator = Arc::new(StorageOrchestrator::new(store.clone(), OrchestratorOptions::default()));
    (store, orchestrator)
}

fn parent_of(store: &MemoryStore, record: &SubmissionRecord) -> Vec<FolderId> {
    let id = match &record.folder_id {
        Some(folder) => folder.as_str().to_string(),
        None => FileId::from_locator(&record.artifact_locator)
            .unwrap()
            .as_str()
            .to_string(),
    };
    store.parents_of(&id).unwrap()
}

#[test]
fn submit_approve_archive() {
    let (store, orchestrator) = setup();
    let dir = tempfile::tempdir().unwrap();
    let records = JsonRecordStore::new(dir.path().join("records"));
    let pipeline = SubmissionPipeline::new(
        DocumentRenderer::new(),
        TemplateSource::new(dir.path().join("no-templates")),
        orchestrator.clone(),
        folders(),
        PipelineOptions::default(),
    );
    let manager = LifecycleManager::new(orchestrator, folders());

    let fields: FieldMap = [("contraparte", "Municipalidad")].into_iter().collect();
    let render = RenderRequest::new("Convenio de Práctica", fields);
    let stored = StoredSubmission::new(SubmissionId::new(), &render);
    records.save(&stored).unwrap();

    let request = SubmissionRequest::new(stored.id.clone(), render).with_annexes(vec![Annex {
        display_name: "carta.docx".to_string(),
        mime_type: accord_protocol::mime::DOCX.to_string(),
        binary: b"PK".to_vec(),
    }]);
    pipeline.create(&request, &records).unwrap();

    let loaded = records.load(&stored.id).unwrap();
    assert_eq!(loaded.status, SubmissionStatus::Submitted);
    let record = loaded.record.unwrap();
    assert!(record.folder_id.is_some());
    assert_eq!(parent_of(&store, &record), vec![FolderId::parse("PENDING").unwrap()]);

    let approved = manager.approve(&record).unwrap();
    assert!(approved.moved);
    assert_eq!(parent_of(&store, &approved.record), vec![FolderId::parse("APPROVED").unwrap()]);

    assert!(matches!(
        manager.reject(&approved.record),
        Err(LifecycleError::InvalidTransition { .. })
    ));

    let archived = manager.archive(&approved.record).unwrap();
    assert_eq!(archived.record.state, LifecycleState::Archived);
    assert_eq!(parent_of(&store, &archived.record), vec![FolderId::parse("ARCHIVED").unwrap()]);
}

#[test]
fn local_fallback_records_change_state_without_remote_calls() {
    let (store, orchestrator) = setup();
    let manager = LifecycleManager::new(orchestrator, folders());
    let local = FileId::local_fallback();
    let record = SubmissionRecord {
        artifact_locator: local.local_fallback_link(),
        folder_id: None,
        state: LifecycleState::Pending,
        updated_at: None,
    };

    let outcome = manager.approve(&record).unwrap();
    assert_eq!(outcome.record.state, LifecycleState::Approved);
    assert!(!outcome.moved);
    assert!(outcome.error.is_none());
    assert!(store.calls().is_empty());
}

fn state() -> impl Strategy<Value = LifecycleState> {
    prop::sample::select(LifecycleState::ALL.to_vec())
}

proptest! {
    #[test]
    fn disallowed_moves_never_touch_the_store(from in state(), to in state()) {
        let (store, orchestrator) = setup();
        let manager = LifecycleManager::new(orchestrator, folders());
        store.add_file(&FileId::parse("DOC").unwrap(), "doc", manager.folders().folder(from));
        let record = SubmissionRecord {
            artifact_locator: "DOC".to_string(),
            folder_id: None,
            state: from,
            updated_at: None,
        };

        let result = manager.transition(&record, to);
        if is_allowed_move(from, to) {
            let outcome = result.unwrap();
            prop_assert_eq!(outcome.record.state, to);
            prop_assert_eq!(store.parents_of("DOC").unwrap(), vec![manager.folders().folder(to).clone()]);
        } else {
            prop_assert!(result.is_err());
            prop_assert!(store.calls().is_empty());
        }
    }
}
