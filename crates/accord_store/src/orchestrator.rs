//! Storage orchestration on top of a [`RemoteStore`].
//!
//! Uploads go through a three-tier chain:
//!
//! 1. native conversion (when requested and the source is convertible)
//! 2. the unmodified binary, after a quota or authorization refusal of tier 1
//! 3. a synthetic local fallback artifact
//!
//! so [`StorageOrchestrator::upload_document`] always yields an artifact.
//! Housekeeping (delete, move, ownership transfer) is logged at this boundary
//! and never panics the caller; the returned errors are informational.

use crate::error::{RemoteErrorKind, Result, StorageError};
use crate::remote::{NewFile, RemoteFile, RemoteStore};
use accord_ids::{FileId, FolderId};
use accord_protocol::naming::safe_display_name;
use accord_protocol::{mime, Annex, StorageFolder, StoredArtifact, UploadTier};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const FALLBACK_DOCUMENT_NAME: &str = "documento";
const FALLBACK_FOLDER_NAME: &str = "carpeta";

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Default for uploads whose caller does not decide
    pub prefer_native_conversion: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            prefer_native_conversion: true,
        }
    }
}

/// An artifact plus every failure met on the way down the chain.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub artifact: StoredArtifact,
    pub failures: Vec<StorageError>,
}

impl UploadOutcome {
    pub fn tier(&self) -> UploadTier {
        self.artifact.tier()
    }
}

/// Per-file status inside a bundle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub display_name: String,
    pub artifact: StoredArtifact,
    pub tier: UploadTier,
    pub errors: Vec<String>,
}

impl BundleEntry {
    fn new(display_name: String, outcome: UploadOutcome) -> Self {
        Self {
            display_name,
            tier: outcome.tier(),
            errors: outcome.failures.iter().map(|e| e.to_string()).collect(),
            artifact: outcome.artifact,
        }
    }
}

/// Aggregated result of a multi-document upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleReport {
    pub folder: StorageFolder,
    pub main: BundleEntry,
    pub annexes: Vec<BundleEntry>,
}

impl BundleReport {
    pub fn entries(&self) -> impl Iterator<Item = &BundleEntry> {
        std::iter::once(&self.main).chain(self.annexes.iter())
    }

    /// Entries that only exist as local fallbacks.
    pub fn unstored(&self) -> Vec<&BundleEntry> {
        self.entries()
            .filter(|e| e.tier == UploadTier::LocalFallback)
            .collect()
    }
}

pub struct StorageOrchestrator {
    store: Arc<dyn RemoteStore>,
    options: OrchestratorOptions,
}

impl StorageOrchestrator {
    pub fn new(store: Arc<dyn RemoteStore>, options: OrchestratorOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Upload a rendered document. Never fails: the worst case is a local
    /// fallback artifact.
    pub fn upload_document(
        &self,
        binary: &[u8],
        display_name: &str,
        target: &FolderId,
        prefer_native_conversion: bool,
    ) -> StoredArtifact {
        self.upload_document_traced(binary, display_name, target, prefer_native_conversion)
            .artifact
    }

    /// [`upload_document`](Self::upload_document), keeping the failures.
    pub fn upload_document_traced(
        &self,
        binary: &[u8],
        display_name: &str,
        target: &FolderId,
        prefer_native_conversion: bool,
    ) -> UploadOutcome {
        let name = safe_display_name(display_name, FALLBACK_DOCUMENT_NAME);
        self.upload_chain(binary, &name, mime::DOCX, target, prefer_native_conversion)
    }

    fn upload_chain(
        &self,
        binary: &[u8],
        name: &str,
        source_mime: &str,
        target: &FolderId,
        native: bool,
    ) -> UploadOutcome {
        let mut failures = Vec::new();

        if native {
            match self.attempt(binary, name, source_mime, mime::NATIVE_DOCUMENT, target) {
                Ok(file) => {
                    info!("Uploaded '{}' as {} ({})", name, file.id, UploadTier::Native);
                    return UploadOutcome {
                        artifact: stored(file, true),
                        failures,
                    };
                }
                Err(error) => {
                    let retry = error.kind.allows_raw_retry();
                    warn!(
                        "Native upload of '{}' failed ({}): {}",
                        name, error.kind, error.message
                    );
                    failures.push(StorageError::upload(name, error));
                    if !retry {
                        return local_fallback(name, failures);
                    }
                }
            }
        }

        match self.attempt(binary, name, source_mime, source_mime, target) {
            Ok(file) => {
                let tier = UploadTier::Raw;
                if native {
                    warn!("Uploaded '{}' as {} without conversion ({})", name, file.id, tier);
                } else {
                    info!("Uploaded '{}' as {} ({})", name, file.id, tier);
                }
                UploadOutcome {
                    artifact: stored(file, false),
                    failures,
                }
            }
            Err(error) => {
                warn!(
                    "Raw upload of '{}' failed ({}): {}",
                    name, error.kind, error.message
                );
                failures.push(StorageError::upload(name, error));
                local_fallback(name, failures)
            }
        }
    }

    fn attempt(
        &self,
        binary: &[u8],
        name: &str,
        source_mime: &str,
        target_mime: &str,
        target: &FolderId,
    ) -> std::result::Result<RemoteFile, crate::error::RemoteError> {
        self.store.create_file(&NewFile {
            name,
            parent: target,
            source_mime,
            target_mime,
            binary,
        })
    }

    pub fn create_folder(&self, name: &str, parent: &FolderId) -> Result<StorageFolder> {
        let display_name = safe_display_name(name, FALLBACK_FOLDER_NAME);
        let id = self
            .store
            .create_folder(&display_name, parent)
            .map_err(|source| StorageError::FolderCreate {
                name: display_name.clone(),
                source,
            })?;
        info!("Created folder '{}' ({}) in {}", display_name, id, parent);
        Ok(StorageFolder {
            id,
            parent_id: Some(parent.clone()),
            display_name,
            owner_identity: None,
        })
    }

    /// Hand `folder` to `explicit_owner`, or to the current owner of
    /// `parent` when none is given. Returns the new owner, or `None` when
    /// the parent has no owner to inherit from.
    pub fn transfer_folder_ownership(
        &self,
        folder: &FolderId,
        parent: &FolderId,
        explicit_owner: Option<&str>,
    ) -> Result<Option<String>> {
        let owner = match explicit_owner.map(str::trim).filter(|o| !o.is_empty()) {
            Some(owner) => owner.to_string(),
            None => {
                let metadata = self.store.get_metadata(parent.as_str()).map_err(|source| {
                    StorageError::OwnershipTransfer {
                        folder: folder.clone(),
                        owner: format!("owner of {}", parent),
                        source,
                    }
                })?;
                match metadata.owners.into_iter().next() {
                    Some(owner) => owner,
                    None => {
                        debug!("Parent {} has no owner; {} keeps its owner", parent, folder);
                        return Ok(None);
                    }
                }
            }
        };

        self.store
            .transfer_ownership(folder.as_str(), &owner)
            .map_err(|source| StorageError::OwnershipTransfer {
                folder: folder.clone(),
                owner: owner.clone(),
                source,
            })?;
        info!("Transferred ownership of {} to {}", folder, owner);
        Ok(Some(owner))
    }

    /// Create a folder, then transfer its ownership. A failed transfer is
    /// logged and the folder is returned anyway.
    pub fn create_folder_and_transfer_ownership(
        &self,
        name: &str,
        parent: &FolderId,
        explicit_owner: Option<&str>,
    ) -> Result<StorageFolder> {
        let mut folder = self.create_folder(name, parent)?;
        match self.transfer_folder_ownership(&folder.id, parent, explicit_owner) {
            Ok(owner) => folder.owner_identity = owner,
            Err(e) => warn!("{}", e),
        }
        Ok(folder)
    }

    /// One folder per submission holding the main document and its annexes.
    ///
    /// Every file goes through the upload chain on its own; an annex that
    /// fails never stops the others. Only the folder creation can fail.
    pub fn upload_multi_document_bundle(
        &self,
        main_document: &[u8],
        main_name: &str,
        annexes: &[Annex],
        folder_name: &str,
        parent: &FolderId,
        explicit_owner: Option<&str>,
    ) -> Result<BundleReport> {
        let folder = self.create_folder_and_transfer_ownership(folder_name, parent, explicit_owner)?;

        let main_display = safe_display_name(main_name, FALLBACK_DOCUMENT_NAME);
        let main_outcome = self.upload_chain(
            main_document,
            &main_display,
            mime::DOCX,
            &folder.id,
            self.options.prefer_native_conversion,
        );
        let main = BundleEntry::new(main_display, main_outcome);

        let annexes: Vec<BundleEntry> = annexes
            .iter()
            .enumerate()
            .map(|(idx, annex)| {
                let fallback = format!("anexo-{}", idx + 1);
                let display = safe_display_name(&annex.display_name, &fallback);
                let convertible = annex.mime_type == mime::DOCX;
                let outcome = self.upload_chain(
                    &annex.binary,
                    &display,
                    &annex.mime_type,
                    &folder.id,
                    convertible && self.options.prefer_native_conversion,
                );
                BundleEntry::new(display, outcome)
            })
            .collect();

        let report = BundleReport { folder, main, annexes };
        let unstored = report.unstored().len();
        if unstored > 0 {
            warn!(
                "Bundle '{}': {} of {} files kept as local fallback",
                report.folder.display_name,
                unstored,
                report.annexes.len() + 1
            );
        }
        Ok(report)
    }

    /// Make `target` the only parent of the file.
    pub fn move_artifact(&self, file_id: &FileId, target: &FolderId) -> Result<()> {
        if file_id.is_local_fallback() {
            debug!("Not moving local fallback artifact {}", file_id);
            return Ok(());
        }
        self.move_item(file_id.as_str(), target)
    }

    /// Make `target` the only parent of the folder.
    pub fn move_folder(&self, folder_id: &FolderId, target: &FolderId) -> Result<()> {
        self.move_item(folder_id.as_str(), target)
    }

    fn move_item(&self, item_id: &str, target: &FolderId) -> Result<()> {
        let result = self
            .store
            .get_metadata(item_id)
            .and_then(|metadata| {
                if metadata.parents.len() == 1 && &metadata.parents[0] == target {
                    debug!("{} already in {}", item_id, target);
                    return Ok(());
                }
                self.store.update_parents(item_id, target, &metadata.parents)
            })
            .map_err(|source| StorageError::RemoteMoveFailure {
                id: item_id.to_string(),
                target: target.clone(),
                source,
            });

        match &result {
            Ok(()) => info!("Moved {} to {}", item_id, target),
            Err(e) => warn!("{}", e),
        }
        result
    }

    /// Best-effort permanent delete. An item that is already gone counts as
    /// deleted.
    pub fn delete_artifact(&self, file_id: &FileId) -> Result<()> {
        if file_id.is_local_fallback() {
            debug!("Not deleting local fallback artifact {}", file_id);
            return Ok(());
        }
        self.delete_item(file_id.as_str())
    }

    /// Best-effort delete of a submission folder and everything in it.
    pub fn delete_folder(&self, folder_id: &FolderId) -> Result<()> {
        self.delete_item(folder_id.as_str())
    }

    fn delete_item(&self, item_id: &str) -> Result<()> {
        match self.store.delete(item_id) {
            Ok(()) => {
                info!("Deleted {}", item_id);
                Ok(())
            }
            Err(source) if source.kind == RemoteErrorKind::NotFound => {
                info!("{} was already gone", item_id);
                Ok(())
            }
            Err(source) => {
                let error = StorageError::RemoteDeleteFailure {
                    id: item_id.to_string(),
                    source,
                };
                warn!("{}", error);
                Err(error)
            }
        }
    }
}

fn stored(file: RemoteFile, is_native_format: bool) -> StoredArtifact {
    StoredArtifact {
        file_id: file.id,
        view_link: file.view_link,
        download_link: file.download_link,
        is_native_format,
        is_local_fallback: false,
    }
}

fn local_fallback(name: &str, failures: Vec<StorageError>) -> UploadOutcome {
    let file_id = FileId::local_fallback();
    let link = file_id.local_fallback_link();
    warn!(
        "'{}' could not be stored remotely; using local fallback {}",
        name, file_id
    );
    UploadOutcome {
        artifact: StoredArtifact {
            file_id,
            view_link: link.clone(),
            download_link: link,
            is_native_format: false,
            is_local_fallback: true,
        },
        failures,
    }
}
