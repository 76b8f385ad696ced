//! Accord Test Utilities
//!
//! Builders for `.docx` fixtures and throwaway template directories.
//!
//! # Usage
//!
//! ```rust,ignore
//! use accord_test_utils::{DocxFixture, TemplateDirGuard};
//!
//! let templates = TemplateDirGuard::new().unwrap();
//! templates
//!     .add("marco.docx", &DocxFixture::new().paragraph("Entre {{parte}}").build().unwrap())
//!     .unwrap();
//!
//! // Directory is removed on Drop
//! ```

pub mod docx;
pub mod templates;

pub use docx::DocxFixture;
pub use templates::TemplateDirGuard;
