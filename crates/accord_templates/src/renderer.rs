//! Render policy: template substitution when a template resolves, the
//! programmatic renderer otherwise.

use crate::error::Result;
use crate::programmatic::ProgrammaticRenderer;
use crate::source::TemplateSource;
use crate::substitute::TemplateSubstitutionRenderer;
use accord_protocol::{ProducedBy, RenderRequest, RenderedDocument};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    substitution: TemplateSubstitutionRenderer,
    programmatic: ProgrammaticRenderer,
}

impl DocumentRenderer {
    pub fn new() -> Self {
        Self {
            substitution: TemplateSubstitutionRenderer::new(),
            programmatic: ProgrammaticRenderer::new(),
        }
    }

    /// Render `request`, trying the best template in `source` first.
    ///
    /// Template failures of any kind (no match, unreadable source, malformed
    /// template) are logged and fall through to the programmatic renderer.
    /// Only a failure to build the programmatic package is returned.
    pub fn render(&self, request: &RenderRequest, source: &TemplateSource) -> Result<RenderedDocument> {
        match self.render_from_template(request, source) {
            Ok(document) => {
                info!(
                    "Rendered '{}' from template {}",
                    request.type_name,
                    document.template_file.as_deref().unwrap_or("?")
                );
                return Ok(document);
            }
            Err(e) => warn!(
                "Template rendering unavailable for '{}', using programmatic renderer: {}",
                request.type_name, e
            ),
        }

        let binary = self.programmatic.render(
            &request.type_name,
            &request.structural_fallback,
            &request.fields,
        )?;
        info!("Rendered '{}' programmatically", request.type_name);
        Ok(RenderedDocument {
            binary,
            produced_by: ProducedBy::Programmatic,
            template_file: None,
        })
    }

    fn render_from_template(&self, request: &RenderRequest, source: &TemplateSource) -> Result<RenderedDocument> {
        let (candidate, template) = source.resolve(&request.type_name)?;
        let binary = self
            .substitution
            .render(&candidate.file_name, &template, &request.fields)?;
        Ok(RenderedDocument {
            binary,
            produced_by: ProducedBy::Template,
            template_file: Some(candidate.file_name),
        })
    }
}
