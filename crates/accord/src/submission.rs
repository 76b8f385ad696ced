//! The submission handler as an explicit, ordered pipeline of steps.
//!
//! Create:   Render -> [CreateFolder] -> Upload -> [UploadAnnexes] -> UpdatePointer
//! Resubmit: DeletePrior -> Render -> [CreateFolder] -> Upload -> [UploadAnnexes] -> UpdatePointer
//!
//! Each step reports `(ok, error)`. Housekeeping steps are best-effort; a
//! failed must-succeed step ends the run. On a failed create the record is
//! reverted to draft; on a failed resubmit the pointer is left untouched.

use crate::error::{PipelineError, RecordError};
use crate::lifecycle::LifecycleFolders;
use accord_ids::{FileId, FolderId, SubmissionId};
use accord_protocol::naming::{document_display_name, submission_folder_name};
use accord_protocol::{
    Annex, DocumentPointer, LifecycleState, ProducedBy, RenderRequest, RenderedDocument,
    StoredArtifact, SubmissionRecord, UploadTier,
};
use accord_store::{BundleReport, StorageOrchestrator};
use accord_templates::{DocumentRenderer, TemplateSource};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Persistence of the submission row, owned outside the pipeline.
pub trait RecordStore {
    /// Point the record at its new document. Called only after the upload
    /// produced an artifact.
    fn update_document_pointer(
        &self,
        submission: &SubmissionId,
        pointer: &DocumentPointer,
        record: &SubmissionRecord,
    ) -> Result<(), RecordError>;

    /// Return a submission whose creation failed to a draft-like status.
    fn revert_to_draft(&self, submission: &SubmissionId, reason: &str) -> Result<(), RecordError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Render,
    CreateFolder,
    Upload,
    UploadAnnexes,
    UpdatePointer,
    DeletePrior,
    RevertToDraft,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Render => "render",
            Step::CreateFolder => "create_folder",
            Step::Upload => "upload",
            Step::UploadAnnexes => "upload_annexes",
            Step::UpdatePointer => "update_pointer",
            Step::DeletePrior => "delete_prior",
            Step::RevertToDraft => "revert_to_draft",
        }
    }

    pub fn criticality(&self) -> Criticality {
        match self {
            Step::Render | Step::CreateFolder | Step::Upload | Step::UpdatePointer => {
                Criticality::MustSucceed
            }
            Step::UploadAnnexes | Step::DeletePrior | Step::RevertToDraft => Criticality::BestEffort,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    MustSucceed,
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub criticality: Criticality,
    pub ok: bool,
    pub error: Option<String>,
    /// Soft degradations met by a step that still succeeded
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub detail: Option<String>,
}

impl StepReport {
    fn ok(step: Step, detail: impl Into<String>) -> Self {
        Self {
            step,
            criticality: step.criticality(),
            ok: true,
            error: None,
            warnings: Vec::new(),
            detail: Some(detail.into()),
        }
    }

    fn failed(step: Step, error: impl Into<String>) -> Self {
        Self {
            step,
            criticality: step.criticality(),
            ok: false,
            error: Some(error.into()),
            warnings: Vec::new(),
            detail: None,
        }
    }

    fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Everything that happened during one create or resubmit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReport {
    pub submission: SubmissionId,
    pub steps: Vec<StepReport>,
    pub produced_by: Option<ProducedBy>,
    pub template_file: Option<String>,
    pub pointer: Option<DocumentPointer>,
    pub record: Option<SubmissionRecord>,
    pub bundle: Option<BundleReport>,
}

impl SubmissionReport {
    fn new(submission: SubmissionId) -> Self {
        Self {
            submission,
            steps: Vec::new(),
            produced_by: None,
            template_file: None,
            pointer: None,
            record: None,
            bundle: None,
        }
    }

    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| !s.ok)
    }

    /// Tier of the main document, once uploaded.
    pub fn upload_tier(&self) -> Option<UploadTier> {
        self.pointer.as_ref().map(|p| {
            if p.is_local_fallback {
                UploadTier::LocalFallback
            } else if p.is_native_format {
                UploadTier::Native
            } else {
                UploadTier::Raw
            }
        })
    }
}

/// Input of a create or resubmit.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub submission_id: SubmissionId,
    pub render: RenderRequest,
    pub annexes: Vec<Annex>,
    /// Identity that should own the submission folder
    pub owner: Option<String>,
}

impl SubmissionRequest {
    pub fn new(submission_id: SubmissionId, render: RenderRequest) -> Self {
        Self {
            submission_id,
            render,
            annexes: Vec::new(),
            owner: None,
        }
    }

    pub fn with_annexes(mut self, annexes: Vec<Annex>) -> Self {
        self.annexes = annexes;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Owner of submission folders when the request names none
    pub default_owner: Option<String>,
}

struct Stored {
    artifact: StoredArtifact,
    folder_id: Option<FolderId>,
}

pub struct SubmissionPipeline {
    renderer: DocumentRenderer,
    templates: TemplateSource,
    orchestrator: Arc<StorageOrchestrator>,
    folders: LifecycleFolders,
    options: PipelineOptions,
}

impl SubmissionPipeline {
    pub fn new(
        renderer: DocumentRenderer,
        templates: TemplateSource,
        orchestrator: Arc<StorageOrchestrator>,
        folders: LifecycleFolders,
        options: PipelineOptions,
    ) -> Self {
        Self {
            renderer,
            templates,
            orchestrator,
            folders,
            options,
        }
    }

    /// First submission: render, store into Pending, point the record at it.
    ///
    /// A failed must-succeed step reverts the record to draft (best-effort)
    /// and returns [`PipelineError::StepFailed`].
    pub fn create(
        &self,
        request: &SubmissionRequest,
        records: &dyn RecordStore,
    ) -> Result<SubmissionReport, PipelineError> {
        let id = &request.submission_id;
        info!("Creating submission {} ('{}')", id, request.render.type_name);
        let mut report = SubmissionReport::new(id.clone());

        match self.render_and_store(request, &mut report, records) {
            Ok(()) => Ok(report),
            Err((step, message)) => {
                match records.revert_to_draft(id, &message) {
                    Ok(()) => report
                        .steps
                        .push(StepReport::ok(Step::RevertToDraft, "record reverted to draft")),
                    Err(e) => {
                        error!("Submission {}: revert to draft failed: {}", id, e);
                        report
                            .steps
                            .push(StepReport::failed(Step::RevertToDraft, e.to_string()));
                    }
                }
                Err(step_failed(report, step, message))
            }
        }
    }

    /// Correction after a review: drop the prior artifact (best-effort), then
    /// render and store again into Pending wherever the old one was.
    ///
    /// The prior deletion runs before the new pointer is written; its failure
    /// never stops the run. On failure the pointer keeps its old value.
    pub fn resubmit(
        &self,
        request: &SubmissionRequest,
        prior: &SubmissionRecord,
        records: &dyn RecordStore,
    ) -> Result<SubmissionReport, PipelineError> {
        let id = &request.submission_id;
        info!(
            "Resubmitting {} ('{}') from {}",
            id, request.render.type_name, prior.state
        );
        let mut report = SubmissionReport::new(id.clone());

        report.steps.push(self.delete_prior(prior));

        match self.render_and_store(request, &mut report, records) {
            Ok(()) => Ok(report),
            Err((step, message)) => Err(step_failed(report, step, message)),
        }
    }

    fn delete_prior(&self, prior: &SubmissionRecord) -> StepReport {
        let result = match &prior.folder_id {
            Some(folder) => self
                .orchestrator
                .delete_folder(folder)
                .map(|()| format!("folder {}", folder))
                .map_err(|e| e.to_string()),
            None => match FileId::from_locator(&prior.artifact_locator) {
                Ok(file_id) => self
                    .orchestrator
                    .delete_artifact(&file_id)
                    .map(|()| format!("file {}", file_id))
                    .map_err(|e| e.to_string()),
                Err(e) => Err(format!(
                    "Cannot resolve prior locator '{}': {}",
                    prior.artifact_locator, e
                )),
            },
        };
        match result {
            Ok(detail) => StepReport::ok(Step::DeletePrior, detail),
            Err(e) => {
                warn!("Prior artifact not deleted: {}", e);
                StepReport::failed(Step::DeletePrior, e)
            }
        }
    }

    /// Render -> store -> pointer. Returns the failed must-succeed step.
    fn render_and_store(
        &self,
        request: &SubmissionRequest,
        report: &mut SubmissionReport,
        records: &dyn RecordStore,
    ) -> Result<(), (Step, String)> {
        let rendered = match self.renderer.render(&request.render, &self.templates) {
            Ok(rendered) => rendered,
            Err(e) => return Err(fail(report, Step::Render, e.to_string())),
        };
        report.produced_by = Some(rendered.produced_by);
        report.template_file = rendered.template_file.clone();
        report.steps.push(StepReport::ok(
            Step::Render,
            match &rendered.template_file {
                Some(file) => format!("{} ({})", rendered.produced_by, file),
                None => rendered.produced_by.to_string(),
            },
        ));

        let stored = self.store(request, &rendered, report)?;

        let record = SubmissionRecord {
            artifact_locator: stored.artifact.view_link.clone(),
            folder_id: stored.folder_id,
            state: LifecycleState::Pending,
            updated_at: Some(Utc::now()),
        };
        let pointer = DocumentPointer::from(&stored.artifact);
        if let Err(e) = records.update_document_pointer(&request.submission_id, &pointer, &record) {
            return Err(fail(report, Step::UpdatePointer, e.to_string()));
        }
        report
            .steps
            .push(StepReport::ok(Step::UpdatePointer, pointer.document_url.clone()));
        info!(
            "Submission {} stored ({}) at {}",
            request.submission_id,
            stored.artifact.tier(),
            pointer.document_url
        );
        report.pointer = Some(pointer);
        report.record = Some(record);
        Ok(())
    }

    fn store(
        &self,
        request: &SubmissionRequest,
        rendered: &RenderedDocument,
        report: &mut SubmissionReport,
    ) -> Result<Stored, (Step, String)> {
        let type_name = &request.render.type_name;
        let id = request.submission_id.as_str();
        let pending = self.folders.folder(LifecycleState::Pending);
        let document_name = document_display_name(type_name, id);

        if request.annexes.is_empty() {
            let outcome = self.orchestrator.upload_document_traced(
                &rendered.binary,
                &document_name,
                pending,
                self.orchestrator.options().prefer_native_conversion,
            );
            report.steps.push(
                StepReport::ok(Step::Upload, outcome.tier().as_str())
                    .with_warnings(outcome.failures.iter().map(|e| e.to_string()).collect()),
            );
            return Ok(Stored {
                artifact: outcome.artifact,
                folder_id: None,
            });
        }

        let folder_name = submission_folder_name(Utc::now().date_naive(), type_name, id);
        let owner = request
            .owner
            .as_deref()
            .or(self.options.default_owner.as_deref());
        let bundle = match self.orchestrator.upload_multi_document_bundle(
            &rendered.binary,
            &document_name,
            &request.annexes,
            &folder_name,
            pending,
            owner,
        ) {
            Ok(bundle) => bundle,
            Err(e) => return Err(fail(report, Step::CreateFolder, e.to_string())),
        };

        report.steps.push(StepReport::ok(
            Step::CreateFolder,
            format!("{} ({})", bundle.folder.display_name, bundle.folder.id),
        ));
        report.steps.push(
            StepReport::ok(Step::Upload, bundle.main.tier.as_str())
                .with_warnings(bundle.main.errors.clone()),
        );
        let unstored: Vec<String> = bundle
            .annexes
            .iter()
            .filter(|a| a.tier == UploadTier::LocalFallback)
            .map(|a| a.display_name.clone())
            .collect();
        report.steps.push(if unstored.is_empty() {
            StepReport::ok(
                Step::UploadAnnexes,
                format!("{} annexes stored", bundle.annexes.len()),
            )
        } else {
            StepReport::failed(
                Step::UploadAnnexes,
                format!("Not stored: {}", unstored.join(", ")),
            )
        });

        let stored = Stored {
            artifact: bundle.main.artifact.clone(),
            folder_id: Some(bundle.folder.id.clone()),
        };
        report.bundle = Some(bundle);
        Ok(stored)
    }
}

fn fail(report: &mut SubmissionReport, step: Step, message: String) -> (Step, String) {
    error!("Submission {}: {} failed: {}", report.submission, step, message);
    report.steps.push(StepReport::failed(step, message.clone()));
    (step, message)
}

fn step_failed(report: SubmissionReport, step: Step, message: String) -> PipelineError {
    PipelineError::StepFailed {
        submission: report.submission.clone(),
        step,
        message,
        report: Box::new(report),
    }
}
