//! Shared types for the Accord document pipeline.
//!
//! Everything that crosses a crate boundary lives here: render requests and
//! results, stored artifacts and folders, lifecycle states, configuration,
//! and naming helpers for display names sent to the store.

pub mod config;
pub mod defaults;
pub mod mime;
pub mod naming;
pub mod paths;
pub mod types;

pub use accord_ids::{FileId, FolderId, IdParseError, SubmissionId};
pub use config::{AccordConfig, FoldersConfig, StoreBackend, StoreConfig, TemplatesConfig};
pub use types::{
    Annex, DocumentPointer, FieldMap, LifecycleState, ProducedBy, RenderRequest, RenderedDocument,
    StorageFolder, StoredArtifact, StructuralFallback, SubmissionRecord, UploadTier,
};
