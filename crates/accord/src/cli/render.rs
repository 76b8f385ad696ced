//! `accord render`: render a document locally without storing it.

use crate::cli::context::Context;
use crate::cli::document::DocumentArgs;
use crate::cli::output::print_json;
use accord_protocol::naming::safe_display_name;
use accord_templates::DocumentRenderer;
use anyhow::{Context as _, Result};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
pub struct RenderArgs {
    /// Agreement type name
    pub type_name: String,

    #[command(flatten)]
    pub document: DocumentArgs,

    /// Output file (defaults to "<type name>.docx" in the current directory)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Template directory (defaults to the configured one)
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: RenderArgs, ctx: &Context) -> Result<()> {
    let request = args.document.request(&args.type_name)?;
    let source = ctx.templates(args.templates.as_deref());
    let rendered = DocumentRenderer::new().render(&request, &source)?;

    let out = args.out.unwrap_or_else(|| {
        PathBuf::from(format!("{}.docx", safe_display_name(&args.type_name, "documento")))
    });
    fs::write(&out, &rendered.binary).with_context(|| format!("Failed to write {}", out.display()))?;

    if args.json {
        return print_json(&serde_json::json!({
            "path": out.to_string_lossy(),
            "producedBy": rendered.produced_by,
            "templateFile": rendered.template_file,
            "bytes": rendered.binary.len(),
        }));
    }
    match &rendered.template_file {
        Some(template) => println!("Rendered {} from {}", out.display(), template),
        None => println!("Rendered {} ({})", out.display(), rendered.produced_by),
    }
    Ok(())
}
