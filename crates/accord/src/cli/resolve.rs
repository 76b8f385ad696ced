//! `accord resolve`: which template a type name would use.

use crate::cli::context::Context;
use crate::cli::output::print_json;
use accord_templates::explain;
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
pub struct ResolveArgs {
    /// Agreement type name, e.g. "Convenio Marco"
    pub type_name: String,

    /// Template directory (defaults to the configured one)
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Show every scored candidate, best first
    #[arg(long)]
    pub explain: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ResolveArgs, ctx: &Context) -> Result<()> {
    let source = ctx.templates(args.templates.as_deref());
    let files = source.list()?;
    let candidates = explain(&args.type_name, &files);

    if args.json {
        let value = if args.explain {
            serde_json::json!({ "typeName": args.type_name, "candidates": candidates })
        } else {
            serde_json::json!({ "typeName": args.type_name, "template": candidates.first() })
        };
        return print_json(&value);
    }

    match candidates.first() {
        Some(best) => println!("{} (score {})", best.file_name, best.score),
        None => println!(
            "No template matches '{}' among {} files; the programmatic renderer will be used",
            args.type_name,
            files.len()
        ),
    }
    if args.explain {
        for candidate in candidates.iter().skip(1) {
            println!(
                "  {:<48} score {}{}",
                candidate.file_name,
                candidate.score,
                if candidate.matched_qualifier { " (without kind)" } else { "" }
            );
        }
    }
    Ok(())
}
