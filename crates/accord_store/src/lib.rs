//! Remote document store access for Accord.
//!
//! The [`RemoteStore`] trait is the only seam to the outside world. On top of
//! it, [`StorageOrchestrator`] implements the upload fallback chain, folder
//! creation with ownership transfer, bundles, and lifecycle moves.

pub mod drive;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod remote;
pub mod token;

pub use drive::DriveStore;
pub use error::{classify_remote_error, RemoteError, RemoteErrorKind, Result, StorageError};
pub use memory::{FaultPoint, MemoryStore, StoreCall, MEMORY_SERVICE_IDENTITY};
pub use orchestrator::{
    BundleEntry, BundleReport, OrchestratorOptions, StorageOrchestrator, UploadOutcome,
};
pub use remote::{NewFile, RemoteFile, RemoteMetadata, RemoteResult, RemoteStore};
pub use token::{ServiceAccountKey, ServiceAccountTokenSource, StaticToken, TokenSource};
