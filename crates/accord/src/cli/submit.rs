//! `accord submit` and `accord resubmit`.

use crate::cli::context::Context;
use crate::cli::document::DocumentArgs;
use crate::cli::output::{print_json, print_report};
use accord::records::annex_from_path;
use accord::{PipelineError, StoredSubmission, SubmissionReport, SubmissionRequest};
use accord_ids::SubmissionId;
use accord_protocol::Annex;
use anyhow::{bail, Context as _, Result};
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
pub struct SubmitArgs {
    /// Agreement type name
    pub type_name: String,

    #[command(flatten)]
    pub document: DocumentArgs,

    /// Supplementary file stored next to the document (repeatable)
    #[arg(long = "annex")]
    pub annexes: Vec<PathBuf>,

    /// Identity that should own the submission folder
    #[arg(long)]
    pub owner: Option<String>,

    /// Template directory (defaults to the configured one)
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct ResubmitArgs {
    /// Submission id printed by `accord submit`
    pub id: SubmissionId,

    /// Field and fallback overrides applied onto the stored submission
    #[command(flatten)]
    pub document: DocumentArgs,

    #[arg(long = "annex")]
    pub annexes: Vec<PathBuf>,

    #[arg(long)]
    pub owner: Option<String>,

    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn load_annexes(paths: &[PathBuf]) -> Result<Vec<Annex>> {
    paths
        .iter()
        .map(|path| annex_from_path(path).with_context(|| format!("Failed to read annex {}", path.display())))
        .collect()
}

fn finish(result: Result<SubmissionReport, PipelineError>, json: bool) -> Result<()> {
    match result {
        Ok(report) => {
            if json {
                print_json(&report)
            } else {
                print_report(&report);
                Ok(())
            }
        }
        Err(err) => {
            if let Some(report) = err.report() {
                if json {
                    print_json(report)?;
                } else {
                    print_report(report);
                }
            }
            Err(err.into())
        }
    }
}

pub fn run_submit(args: SubmitArgs, ctx: &Context) -> Result<()> {
    let render = args.document.request(&args.type_name)?;
    let annexes = load_annexes(&args.annexes)?;
    let (pipeline, _backend) = ctx.pipeline(args.templates.as_deref())?;
    let records = ctx.records();

    let stored = StoredSubmission::new(SubmissionId::new(), &render);
    records.save(&stored)?;

    let mut request = SubmissionRequest::new(stored.id.clone(), render).with_annexes(annexes);
    request.owner = args.owner;
    finish(pipeline.create(&request, &records), args.json)
}

pub fn run_resubmit(args: ResubmitArgs, ctx: &Context) -> Result<()> {
    let records = ctx.records();
    let mut stored = records.load(&args.id)?;
    let Some(prior) = stored.record.clone() else {
        bail!("Submission {} has never been stored; use `accord submit`", args.id);
    };

    let render = args.document.apply(stored.render_request())?;
    if args.document.has_overrides() {
        stored.fields = render.fields.clone();
        stored.structural_fallback = render.structural_fallback.clone();
        records.save(&stored)?;
    }
    let annexes = load_annexes(&args.annexes)?;

    let (pipeline, backend) = ctx.pipeline(args.templates.as_deref())?;
    backend.seed_record(&prior, &ctx.folders()?);

    let mut request = SubmissionRequest::new(stored.id.clone(), render).with_annexes(annexes);
    request.owner = args.owner;
    finish(pipeline.resubmit(&request, &prior, &records), args.json)
}
