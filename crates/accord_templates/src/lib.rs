//! Template resolution and document rendering for Accord.
//!
//! - [`resolver`]: picks the template file for a type name (pure)
//! - [`source`]: the template directory, listed fresh on every render
//! - [`substitute`]: fills `{{field}}` placeholders of a template package
//! - [`programmatic`]: builds a document when no template applies
//! - [`renderer`]: the policy tying the two renderers together

pub mod docx;
pub mod error;
pub mod normalize;
pub mod programmatic;
pub mod renderer;
pub mod resolver;
pub mod source;
pub mod substitute;

pub use error::{Result, TemplateError};
pub use programmatic::ProgrammaticRenderer;
pub use renderer::DocumentRenderer;
pub use resolver::{explain, resolve_template, TemplateCandidate};
pub use source::TemplateSource;
pub use substitute::TemplateSubstitutionRenderer;
