//! Error types for the lifecycle manager and the submission pipeline.

use crate::submission::{Step, SubmissionReport};
use accord_ids::{IdParseError, SubmissionId};
use accord_protocol::LifecycleState;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("No folder configured for state '{0}'")]
    MissingFolder(LifecycleState),

    #[error("Invalid locator '{locator}': {source}")]
    InvalidLocator {
        locator: String,
        source: IdParseError,
    },
}

/// Record store error type
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Record not found: {0}")]
    NotFound(SubmissionId),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A must-succeed step failed; the report shows every step that ran
    #[error("Submission {submission} failed at {step}: {message}")]
    StepFailed {
        submission: SubmissionId,
        step: Step,
        message: String,
        report: Box<SubmissionReport>,
    },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl PipelineError {
    pub fn report(&self) -> Option<&SubmissionReport> {
        match self {
            PipelineError::StepFailed { report, .. } => Some(report),
            PipelineError::Lifecycle(_) => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}
