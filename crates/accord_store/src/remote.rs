//! The remote store seam.
//!
//! The orchestrator only talks to a [`RemoteStore`]. Production wires in
//! [`crate::DriveStore`]; dry runs and tests use [`crate::MemoryStore`].

use crate::error::RemoteError;
use accord_ids::{FileId, FolderId};

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// A file to create in the store.
#[derive(Debug, Clone, Copy)]
pub struct NewFile<'a> {
    pub name: &'a str,
    pub parent: &'a FolderId,
    /// Mime type of `binary`
    pub source_mime: &'a str,
    /// Mime type the store should keep; differs from `source_mime` when
    /// the store converts on upload
    pub target_mime: &'a str,
    pub binary: &'a [u8],
}

impl NewFile<'_> {
    pub fn converts(&self) -> bool {
        self.source_mime != self.target_mime
    }
}

/// A file as created by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: FileId,
    pub view_link: String,
    pub download_link: String,
    pub mime_type: String,
}

/// Metadata of a file or folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parents: Vec<FolderId>,
    /// Owner identities (email addresses)
    pub owners: Vec<String>,
}

/// Blocking client for a folder-organized document store.
///
/// Files and folders share one id space, so item operations take the raw id.
pub trait RemoteStore: Send + Sync {
    fn create_file(&self, file: &NewFile<'_>) -> RemoteResult<RemoteFile>;

    fn create_folder(&self, name: &str, parent: &FolderId) -> RemoteResult<FolderId>;

    fn get_metadata(&self, item_id: &str) -> RemoteResult<RemoteMetadata>;

    /// Add `add` as a parent and remove every folder in `remove`.
    fn update_parents(&self, item_id: &str, add: &FolderId, remove: &[FolderId]) -> RemoteResult<()>;

    /// Permanently delete an item.
    fn delete(&self, item_id: &str) -> RemoteResult<()>;

    fn transfer_ownership(&self, item_id: &str, new_owner: &str) -> RemoteResult<()>;
}
