//! In-process [`RemoteStore`] for dry runs and tests.
//!
//! Keeps folders and files with their parents and owners, records every call
//! in order, and can be told to fail any operation.

use crate::error::{RemoteError, RemoteErrorKind};
use crate::remote::{NewFile, RemoteFile, RemoteMetadata, RemoteResult, RemoteStore};
use accord_ids::{FileId, FolderId};
use accord_protocol::mime;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Identity that owns everything the memory store creates.
pub const MEMORY_SERVICE_IDENTITY: &str = "accord-service@memory.local";

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// File creation with format conversion
    NativeUpload,
    /// File creation without conversion
    RawUpload,
    CreateFolder,
    GetMetadata,
    UpdateParents,
    Delete,
    TransferOwnership,
}

/// One recorded call, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    CreateFile {
        name: String,
        parent: FolderId,
        native: bool,
    },
    CreateFolder {
        name: String,
        parent: FolderId,
    },
    GetMetadata {
        id: String,
    },
    UpdateParents {
        id: String,
        add: FolderId,
        remove: Vec<FolderId>,
    },
    Delete {
        id: String,
    },
    TransferOwnership {
        id: String,
        owner: String,
    },
}

#[derive(Debug, Clone)]
struct Item {
    name: String,
    mime_type: String,
    parents: Vec<FolderId>,
    owners: Vec<String>,
    size: usize,
}

impl Item {
    fn is_folder(&self) -> bool {
        self.mime_type == mime::FOLDER
    }
}

#[derive(Debug, Default)]
struct State {
    items: BTreeMap<String, Item>,
    calls: Vec<StoreCall>,
    faults: HashMap<FaultPoint, RemoteError>,
    next_id: u64,
}

impl State {
    fn mint(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("mem-{}-{}", prefix, self.next_id)
    }

    fn fault(&self, point: FaultPoint) -> RemoteResult<()> {
        match self.faults.get(&point) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn item(&self, id: &str) -> RemoteResult<&Item> {
        self.items
            .get(id)
            .ok_or_else(|| RemoteError::not_found(format!("File not found: {}", id)))
    }

    fn require_folder(&self, id: &FolderId) -> RemoteResult<()> {
        match self.items.get(id.as_str()) {
            Some(item) if item.is_folder() => Ok(()),
            Some(_) => Err(RemoteError::new(
                RemoteErrorKind::Other,
                format!("{} is not a folder", id),
            )),
            None => Err(RemoteError::not_found(format!("Folder not found: {}", id))),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Seed a folder. `parent` must already exist when given.
    pub fn add_folder(&self, id: &FolderId, name: &str, parent: Option<&FolderId>, owner: &str) {
        self.state().items.insert(
            id.as_str().to_string(),
            Item {
                name: name.to_string(),
                mime_type: mime::FOLDER.to_string(),
                parents: parent.cloned().into_iter().collect(),
                owners: vec![owner.to_string()],
                size: 0,
            },
        );
    }

    /// Seed a file inside `parent`.
    pub fn add_file(&self, id: &FileId, name: &str, parent: &FolderId) {
        self.state().items.insert(
            id.as_str().to_string(),
            Item {
                name: name.to_string(),
                mime_type: mime::DOCX.to_string(),
                parents: vec![parent.clone()],
                owners: vec![MEMORY_SERVICE_IDENTITY.to_string()],
                size: 0,
            },
        );
    }

    /// Make every later call at `point` fail with `error`.
    pub fn fail(&self, point: FaultPoint, error: RemoteError) {
        self.state().faults.insert(point, error);
    }

    pub fn clear_fault(&self, point: FaultPoint) {
        self.state().faults.remove(&point);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    pub fn exists(&self, id: &str) -> bool {
        self.state().items.contains_key(id)
    }

    pub fn parents_of(&self, id: &str) -> Option<Vec<FolderId>> {
        self.state().items.get(id).map(|item| item.parents.clone())
    }

    pub fn owners_of(&self, id: &str) -> Option<Vec<String>> {
        self.state().items.get(id).map(|item| item.owners.clone())
    }

    pub fn name_of(&self, id: &str) -> Option<String> {
        self.state().items.get(id).map(|item| item.name.clone())
    }

    pub fn mime_type_of(&self, id: &str) -> Option<String> {
        self.state().items.get(id).map(|item| item.mime_type.clone())
    }

    /// Ids of the items directly inside `folder`, sorted.
    pub fn children_of(&self, folder: &FolderId) -> Vec<String> {
        self.state()
            .items
            .iter()
            .filter(|(_, item)| item.parents.contains(folder))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of stored files (folders excluded).
    pub fn file_count(&self) -> usize {
        self.state().items.values().filter(|i| !i.is_folder()).count()
    }

    /// Total bytes held by stored files.
    pub fn stored_bytes(&self) -> usize {
        self.state().items.values().map(|i| i.size).sum()
    }
}

impl RemoteStore for MemoryStore {
    fn create_file(&self, file: &NewFile<'_>) -> RemoteResult<RemoteFile> {
        let mut state = self.state();
        let native = file.converts();
        state.calls.push(StoreCall::CreateFile {
            name: file.name.to_string(),
            parent: file.parent.clone(),
            native,
        });
        state.fault(if native {
            FaultPoint::NativeUpload
        } else {
            FaultPoint::RawUpload
        })?;
        state.require_folder(file.parent)?;

        let raw_id = state.mint("file");
        let id = FileId::parse(&raw_id).map_err(|e| RemoteError::new(RemoteErrorKind::Other, e.to_string()))?;
        state.items.insert(
            raw_id,
            Item {
                name: file.name.to_string(),
                mime_type: file.target_mime.to_string(),
                parents: vec![file.parent.clone()],
                owners: vec![MEMORY_SERVICE_IDENTITY.to_string()],
                size: file.binary.len(),
            },
        );
        Ok(RemoteFile {
            view_link: format!("memory://files/d/{}/view", id),
            download_link: format!("memory://files/uc?id={}&export=download", id),
            mime_type: file.target_mime.to_string(),
            id,
        })
    }

    fn create_folder(&self, name: &str, parent: &FolderId) -> RemoteResult<FolderId> {
        let mut state = self.state();
        state.calls.push(StoreCall::CreateFolder {
            name: name.to_string(),
            parent: parent.clone(),
        });
        state.fault(FaultPoint::CreateFolder)?;
        state.require_folder(parent)?;

        let raw_id = state.mint("folder");
        let id = FolderId::parse(&raw_id).map_err(|e| RemoteError::new(RemoteErrorKind::Other, e.to_string()))?;
        state.items.insert(
            raw_id,
            Item {
                name: name.to_string(),
                mime_type: mime::FOLDER.to_string(),
                parents: vec![parent.clone()],
                owners: vec![MEMORY_SERVICE_IDENTITY.to_string()],
                size: 0,
            },
        );
        Ok(id)
    }

    fn get_metadata(&self, item_id: &str) -> RemoteResult<RemoteMetadata> {
        let mut state = self.state();
        state.calls.push(StoreCall::GetMetadata {
            id: item_id.to_string(),
        });
        state.fault(FaultPoint::GetMetadata)?;
        let item = state.item(item_id)?;
        Ok(RemoteMetadata {
            id: item_id.to_string(),
            name: item.name.clone(),
            mime_type: item.mime_type.clone(),
            parents: item.parents.clone(),
            owners: item.owners.clone(),
        })
    }

    fn update_parents(&self, item_id: &str, add: &FolderId, remove: &[FolderId]) -> RemoteResult<()> {
        let mut state = self.state();
        state.calls.push(StoreCall::UpdateParents {
            id: item_id.to_string(),
            add: add.clone(),
            remove: remove.to_vec(),
        });
        state.fault(FaultPoint::UpdateParents)?;
        state.item(item_id)?;
        state.require_folder(add)?;

        if let Some(item) = state.items.get_mut(item_id) {
            item.parents.retain(|p| !remove.contains(p));
            if !item.parents.contains(add) {
                item.parents.push(add.clone());
            }
        }
        Ok(())
    }

    fn delete(&self, item_id: &str) -> RemoteResult<()> {
        let mut state = self.state();
        state.calls.push(StoreCall::Delete {
            id: item_id.to_string(),
        });
        state.fault(FaultPoint::Delete)?;
        state.item(item_id)?;

        // Folders take their contents with them.
        let mut doomed = vec![item_id.to_string()];
        let mut idx = 0;
        while idx < doomed.len() {
            let parent = doomed[idx].clone();
            let children: Vec<String> = state
                .items
                .iter()
                .filter(|(_, item)| item.parents.iter().any(|p| p.as_str() == parent))
                .map(|(id, _)| id.clone())
                .collect();
            doomed.extend(children);
            idx += 1;
        }
        for id in doomed {
            state.items.remove(&id);
        }
        Ok(())
    }

    fn transfer_ownership(&self, item_id: &str, new_owner: &str) -> RemoteResult<()> {
        let mut state = self.state();
        state.calls.push(StoreCall::TransferOwnership {
            id: item_id.to_string(),
            owner: new_owner.to_string(),
        });
        state.fault(FaultPoint::TransferOwnership)?;
        state.item(item_id)?;
        if let Some(item) = state.items.get_mut(item_id) {
            item.owners = vec![new_owner.to_string()];
        }
        Ok(())
    }
}
