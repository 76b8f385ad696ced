//! Create and resubmit runs against the in-memory store.

use accord::{
    LifecycleFolders, PipelineError, PipelineOptions, RecordError, RecordStore, Step,
    SubmissionPipeline, SubmissionRequest,
};
use accord_ids::{FileId, FolderId, SubmissionId};
use accord_protocol::{
    mime, Annex, DocumentPointer, FieldMap, FoldersConfig, LifecycleState, ProducedBy,
    RenderRequest, SubmissionRecord, UploadTier,
};
use accord_store::{
    FaultPoint, MemoryStore, OrchestratorOptions, RemoteError, StorageOrchestrator, StoreCall,
};
use accord_templates::{DocumentRenderer, TemplateSource};
use accord_test_utils::{DocxFixture, TemplateDirGuard};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum RecordEvent {
    Pointer {
        pointer: DocumentPointer,
        record: SubmissionRecord,
        /// Store calls made before the pointer was written
        store_calls: Vec<StoreCall>,
    },
    Reverted(String),
}

/// Record store that remembers every call and can be told to refuse updates.
struct RecordingRecords {
    store: Arc<MemoryStore>,
    events: Mutex<Vec<RecordEvent>>,
    refuse_pointer: bool,
}

impl RecordingRecords {
    fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            events: Mutex::new(Vec::new()),
            refuse_pointer: false,
        }
    }

    fn refusing(store: Arc<MemoryStore>) -> Self {
        Self {
            refuse_pointer: true,
            ..Self::new(store)
        }
    }

    fn events(&self) -> Vec<RecordEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl RecordStore for RecordingRecords {
    fn update_document_pointer(
        &self,
        submission: &SubmissionId,
        pointer: &DocumentPointer,
        record: &SubmissionRecord,
    ) -> Result<(), RecordError> {
        if self.refuse_pointer {
            return Err(RecordError::NotFound(submission.clone()));
        }
        self.events.lock().unwrap().push(RecordEvent::Pointer {
            pointer: pointer.clone(),
            record: record.clone(),
            store_calls: self.store.calls(),
        });
        Ok(())
    }

    fn revert_to_draft(&self, _submission: &SubmissionId, reason: &str) -> Result<(), RecordError> {
        self.events
            .lock()
            .unwrap()
            .push(RecordEvent::Reverted(reason.to_string()));
        Ok(())
    }
}

fn folder(id: &str) -> FolderId {
    FolderId::parse(id).unwrap()
}

struct Harness {
    store: Arc<MemoryStore>,
    templates: TemplateDirGuard,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        for (id, state) in [
            ("PENDING", LifecycleState::Pending),
            ("APPROVED", LifecycleState::Approved),
            ("REJECTED", LifecycleState::Rejected),
            ("ARCHIVED", LifecycleState::Archived),
        ] {
            store.add_folder(&folder(id), state.as_str(), None, "convenios@example.edu");
        }
        Self {
            store,
            templates: TemplateDirGuard::new().unwrap(),
        }
    }

    fn pipeline(&self) -> SubmissionPipeline {
        let folders = LifecycleFolders::from_config(&FoldersConfig {
            pending: Some("PENDING".to_string()),
            approved: Some("APPROVED".to_string()),
            rejected: Some("REJECTED".to_string()),
            archived: Some("ARCHIVED".to_string()),
        })
        .unwrap();
        SubmissionPipeline::new(
            DocumentRenderer::new(),
            TemplateSource::new(self.templates.path()),
            Arc::new(StorageOrchestrator::new(
                self.store.clone(),
                OrchestratorOptions::default(),
            )),
            folders,
            PipelineOptions::default(),
        )
    }

    fn records(&self) -> RecordingRecords {
        RecordingRecords::new(self.store.clone())
    }
}

fn request(type_name: &str) -> SubmissionRequest {
    let fields: FieldMap = [("contraparte", "ACME S.A."), ("vigencia", "2 años")]
        .into_iter()
        .collect();
    SubmissionRequest::new(SubmissionId::new(), RenderRequest::new(type_name, fields))
}

fn pointer_event(records: &RecordingRecords) -> (DocumentPointer, SubmissionRecord, Vec<StoreCall>) {
    records
        .events()
        .into_iter()
        .find_map(|event| match event {
            RecordEvent::Pointer {
                pointer,
                record,
                store_calls,
            } => Some((pointer, record, store_calls)),
            RecordEvent::Reverted(_) => None,
        })
        .expect("pointer was updated")
}

#[test]
fn create_without_templates_renders_programmatically_into_pending() {
    let harness = Harness::new();
    let records = harness.records();

    let report = harness
        .pipeline()
        .create(&request("Acuerdo de Colaboración"), &records)
        .unwrap();

    assert_eq!(report.produced_by, Some(ProducedBy::Programmatic));
    assert_eq!(report.upload_tier(), Some(UploadTier::Native));
    assert!(report.steps.iter().all(|s| s.ok));

    let (pointer, record, _) = pointer_event(&records);
    assert!(pointer.is_native_format);
    assert!(!pointer.is_local_fallback);
    assert_eq!(record.state, LifecycleState::Pending);
    assert_eq!(record.folder_id, None);

    let file_id = FileId::from_locator(&record.artifact_locator).unwrap();
    assert_eq!(harness.store.parents_of(file_id.as_str()), Some(vec![folder("PENDING")]));
}

#[test]
fn create_uses_the_resolved_template() {
    let harness = Harness::new();
    let template = DocxFixture::new()
        .paragraph("CONVENIO MARCO con {{contraparte}}")
        .build()
        .unwrap();
    harness.templates.add("marco.docx", &template).unwrap();
    harness
        .templates
        .add("convenio-marco-practica.docx", &template)
        .unwrap();

    let records = harness.records();
    let report = harness
        .pipeline()
        .create(&request("Convenio Marco"), &records)
        .unwrap();

    assert_eq!(report.produced_by, Some(ProducedBy::Template));
    assert_eq!(report.template_file.as_deref(), Some("marco.docx"));
    assert!(harness.store.stored_bytes() > 0);
}

#[test]
fn create_keeps_local_fallback_as_success() {
    let harness = Harness::new();
    harness.store.fail(
        FaultPoint::NativeUpload,
        RemoteError::from_response(403, Some("storageQuotaExceeded"), "quota"),
    );
    harness
        .store
        .fail(FaultPoint::RawUpload, RemoteError::transport("connection reset"));
    let records = harness.records();

    let report = harness
        .pipeline()
        .create(&request("Convenio Marco"), &records)
        .unwrap();

    let (pointer, _, _) = pointer_event(&records);
    assert!(pointer.is_local_fallback);
    assert!(pointer.document_url.starts_with("local-fallback://"));
    let upload = report.step(Step::Upload).unwrap();
    assert!(upload.ok);
    assert_eq!(upload.warnings.len(), 2);
    assert_eq!(harness.store.file_count(), 0);
}

#[test]
fn failed_create_reverts_to_draft() {
    let harness = Harness::new();
    let records = RecordingRecords::refusing(harness.store.clone());

    let err = harness
        .pipeline()
        .create(&request("Convenio Marco"), &records)
        .unwrap_err();

    match &err {
        PipelineError::StepFailed { step, report, .. } => {
            assert_eq!(*step, Step::UpdatePointer);
            assert!(report.step(Step::RevertToDraft).unwrap().ok);
            assert!(report.pointer.is_none());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(records.events().as_slice(), [RecordEvent::Reverted(_)]));
}

#[test]
fn create_with_annexes_stores_a_bundle_folder() {
    let harness = Harness::new();
    harness
        .store
        .fail(FaultPoint::RawUpload, RemoteError::transport("connection reset"));
    let records = harness.records();
    let req = request("Convenio Específico").with_annexes(vec![Annex {
        display_name: "presupuesto.pdf".to_string(),
        mime_type: mime::PDF.to_string(),
        binary: b"%PDF-1.4".to_vec(),
    }]);

    let report = harness.pipeline().create(&req, &records).unwrap();

    let (pointer, record, _) = pointer_event(&records);
    let bundle_folder = record.folder_id.clone().unwrap();
    assert_eq!(
        harness.store.parents_of(bundle_folder.as_str()),
        Some(vec![folder("PENDING")])
    );
    assert!(pointer.is_native_format);
    assert!(report.step(Step::CreateFolder).unwrap().ok);
    assert!(report.step(Step::Upload).unwrap().ok);
    // The PDF only has the raw tier, which is failing.
    assert!(!report.step(Step::UploadAnnexes).unwrap().ok);
    assert_eq!(harness.store.children_of(&bundle_folder).len(), 1);
}

#[test]
fn bundle_folder_failure_fails_the_create() {
    let harness = Harness::new();
    harness
        .store
        .fail(FaultPoint::CreateFolder, RemoteError::transport("timeout"));
    let records = harness.records();
    let req = request("Convenio Específico").with_annexes(vec![Annex {
        display_name: "anexo.docx".to_string(),
        mime_type: mime::DOCX.to_string(),
        binary: b"PK".to_vec(),
    }]);

    let err = harness.pipeline().create(&req, &records).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::StepFailed {
            step: Step::CreateFolder,
            ..
        }
    ));
    assert_eq!(harness.store.file_count(), 0);
    assert!(matches!(records.events().as_slice(), [RecordEvent::Reverted(_)]));
}

fn prior_record(harness: &Harness, id: &str, state: LifecycleState, parent: &str) -> SubmissionRecord {
    harness
        .store
        .add_file(&FileId::parse(id).unwrap(), "Convenio Marco - viejo", &folder(parent));
    SubmissionRecord {
        artifact_locator: format!("https://docs.google.com/document/d/{}/edit", id),
        folder_id: None,
        state,
        updated_at: None,
    }
}

#[test]
fn resubmit_deletes_prior_before_pointer_update() {
    let harness = Harness::new();
    let prior = prior_record(&harness, "OLD123", LifecycleState::Rejected, "REJECTED");
    let records = harness.records();

    let report = harness
        .pipeline()
        .resubmit(&request("Convenio Marco"), &prior, &records)
        .unwrap();

    let (pointer, record, calls_before_pointer) = pointer_event(&records);
    assert!(calls_before_pointer.contains(&StoreCall::Delete {
        id: "OLD123".to_string()
    }));
    assert!(!harness.store.exists("OLD123"));
    assert_ne!(pointer.document_url, prior.artifact_locator);
    assert_ne!(FileId::from_locator(&pointer.document_url).unwrap().as_str(), "OLD123");
    assert_eq!(record.state, LifecycleState::Pending);
    assert_eq!(report.steps[0].step, Step::DeletePrior);
    assert!(report.steps[0].ok);

    let new_id = FileId::from_locator(&record.artifact_locator).unwrap();
    assert_eq!(harness.store.parents_of(new_id.as_str()), Some(vec![folder("PENDING")]));
}

#[test]
fn resubmit_continues_when_prior_delete_fails() {
    let harness = Harness::new();
    let prior = prior_record(&harness, "OLD123", LifecycleState::Approved, "APPROVED");
    harness
        .store
        .fail(FaultPoint::Delete, RemoteError::from_response(403, Some("insufficientFilePermissions"), "forbidden"));
    let records = harness.records();

    let report = harness
        .pipeline()
        .resubmit(&request("Convenio Marco"), &prior, &records)
        .unwrap();

    assert!(!report.step(Step::DeletePrior).unwrap().ok);
    assert!(harness.store.exists("OLD123"));
    let (pointer, _, _) = pointer_event(&records);
    assert_ne!(FileId::from_locator(&pointer.document_url).unwrap().as_str(), "OLD123");
}

#[test]
fn resubmit_of_missing_prior_counts_as_deleted() {
    let harness = Harness::new();
    let prior = SubmissionRecord {
        artifact_locator: "https://drive.google.com/open?id=GONE42".to_string(),
        folder_id: None,
        state: LifecycleState::Rejected,
        updated_at: None,
    };
    let records = harness.records();

    let report = harness
        .pipeline()
        .resubmit(&request("Convenio Marco"), &prior, &records)
        .unwrap();
    assert!(report.step(Step::DeletePrior).unwrap().ok);
}

#[test]
fn failed_resubmit_leaves_pointer_untouched() {
    let harness = Harness::new();
    let prior = prior_record(&harness, "OLD123", LifecycleState::Rejected, "REJECTED");
    let records = RecordingRecords::refusing(harness.store.clone());

    let err = harness
        .pipeline()
        .resubmit(&request("Convenio Marco"), &prior, &records)
        .unwrap_err();

    let report = err.report().unwrap();
    assert!(report.pointer.is_none());
    assert!(report.step(Step::RevertToDraft).is_none());
    assert!(records.events().is_empty());
}

#[test]
fn document_is_named_after_type_and_submission() {
    let harness = Harness::new();
    let records = harness.records();
    harness
        .pipeline()
        .create(&request("Acuerdo de Colaboración"), &records)
        .unwrap();

    let (_, record, _) = pointer_event(&records);
    let id = FileId::from_locator(&record.artifact_locator).unwrap();
    let name = harness.store.name_of(id.as_str()).unwrap();
    assert!(name.starts_with("Acuerdo de Colaboración - "));
    assert_eq!(name.chars().count(), "Acuerdo de Colaboración - ".chars().count() + 8);
}
