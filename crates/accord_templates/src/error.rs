//! Error types for template resolution and rendering.

use std::io;
use thiserror::Error;

/// Template error type
#[derive(Error, Debug)]
pub enum TemplateError {
    /// No candidate file scored against the type name
    #[error("No template matches type '{type_name}' ({candidates} candidates)")]
    NoTemplateMatch { type_name: String, candidates: usize },

    /// The template could not be filled
    #[error("Render error in {template}: {message}")]
    Render { template: String, message: String },

    /// The document package could not be read or written
    #[error("Package error: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Template source not found: {0}")]
    SourceNotFound(String),
}

impl TemplateError {
    pub fn render(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            template: template.into(),
            message: message.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, TemplateError>;
