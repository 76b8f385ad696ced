//! Accord submission pipeline.
//!
//! Ties template resolution, rendering and storage together for one
//! submission at a time:
//!
//! - [`submission`]: the create/resubmit pipeline and its step reports
//! - [`lifecycle`]: lifecycle folders and state transitions
//! - [`records`]: the JSON-file record store used by the CLI
//! - [`config`]: config file loading with environment overrides

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod records;
pub mod submission;

pub use error::{ConfigError, LifecycleError, PipelineError, RecordError};
pub use lifecycle::{
    is_allowed_move, is_allowed_transition, LifecycleFolders, LifecycleManager, TransitionOutcome,
};
pub use records::{JsonRecordStore, StoredSubmission, SubmissionStatus};
pub use submission::{
    Criticality, PipelineOptions, RecordStore, Step, StepReport, SubmissionPipeline,
    SubmissionReport, SubmissionRequest,
};
