//! Per-invocation wiring: config, record store, remote store and pipeline.

use accord::config::{default_config_path, default_records_dir, load_config};
use accord::{
    JsonRecordStore, LifecycleFolders, LifecycleManager, PipelineOptions, SubmissionPipeline,
};
use accord_ids::{FileId, FolderId};
use accord_protocol::{AccordConfig, LifecycleState, StoreBackend, SubmissionRecord};
use accord_store::{
    DriveStore, MemoryStore, OrchestratorOptions, RemoteStore, StorageOrchestrator,
    MEMORY_SERVICE_IDENTITY,
};
use accord_templates::{DocumentRenderer, TemplateSource};
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub struct Context {
    pub config: AccordConfig,
    pub config_path: PathBuf,
}

impl Context {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);
        let config = load_config(&config_path)?;
        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn templates(&self, dir_override: Option<&Path>) -> TemplateSource {
        TemplateSource::new(
            dir_override
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.config.templates.dir.clone()),
        )
    }

    pub fn records(&self) -> JsonRecordStore {
        JsonRecordStore::new(default_records_dir())
    }

    pub fn folders(&self) -> Result<LifecycleFolders> {
        LifecycleFolders::from_config(&self.config.folders).with_context(|| {
            format!(
                "Lifecycle folders are not configured in {}",
                self.config_path.display()
            )
        })
    }

    /// Connect the configured store. Created once per process.
    pub fn backend(&self, folders: &LifecycleFolders) -> Result<Backend> {
        match self.config.store.backend {
            StoreBackend::Drive => {
                let drive = DriveStore::from_config(&self.config.store)
                    .context("Failed to set up the Drive client")?;
                info!("Using Drive store at {}", self.config.store.api_base);
                Ok(Backend {
                    store: Arc::new(drive),
                    memory: None,
                })
            }
            StoreBackend::Memory => {
                let memory = Arc::new(MemoryStore::new());
                let owner = self
                    .config
                    .store
                    .default_owner
                    .as_deref()
                    .unwrap_or(MEMORY_SERVICE_IDENTITY);
                for state in LifecycleState::ALL {
                    memory.add_folder(folders.folder(state), state.as_str(), None, owner);
                }
                info!("Using in-memory store; nothing is persisted remotely");
                Ok(Backend {
                    store: memory.clone(),
                    memory: Some(memory),
                })
            }
        }
    }

    pub fn orchestrator(&self, backend: &Backend) -> Arc<StorageOrchestrator> {
        Arc::new(StorageOrchestrator::new(
            backend.store.clone(),
            OrchestratorOptions {
                prefer_native_conversion: self.config.store.prefer_native_conversion,
            },
        ))
    }

    pub fn pipeline(&self, templates: Option<&Path>) -> Result<(SubmissionPipeline, Backend)> {
        let folders = self.folders()?;
        let backend = self.backend(&folders)?;
        let pipeline = SubmissionPipeline::new(
            DocumentRenderer::new(),
            self.templates(templates),
            self.orchestrator(&backend),
            folders,
            PipelineOptions {
                default_owner: self.config.store.default_owner.clone(),
            },
        );
        Ok((pipeline, backend))
    }

    pub fn lifecycle(&self) -> Result<(LifecycleManager, Backend)> {
        let folders = self.folders()?;
        let backend = self.backend(&folders)?;
        let manager = LifecycleManager::new(self.orchestrator(&backend), folders);
        Ok((manager, backend))
    }
}

pub struct Backend {
    pub store: Arc<dyn RemoteStore>,
    /// Set for dry runs against the in-memory store
    pub memory: Option<Arc<MemoryStore>>,
}

impl Backend {
    /// Recreate the item a record points at, so dry runs can move or delete it.
    pub fn seed_record(&self, record: &SubmissionRecord, folders: &LifecycleFolders) {
        let Some(memory) = &self.memory else {
            return;
        };
        let parent: &FolderId = folders.folder(record.state);
        match &record.folder_id {
            Some(folder) => memory.add_folder(folder, folder.as_str(), Some(parent), MEMORY_SERVICE_IDENTITY),
            None => {
                if let Ok(file) = FileId::from_locator(&record.artifact_locator) {
                    if !file.is_local_fallback() {
                        memory.add_file(&file, file.as_str(), parent);
                    }
                }
            }
        }
    }
}
