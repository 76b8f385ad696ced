//! `accord move`: put a stored submission into another lifecycle state.

use crate::cli::context::Context;
use crate::cli::output::{print_json, print_transition};
use accord_ids::SubmissionId;
use accord_protocol::LifecycleState;
use anyhow::{bail, Result};

#[derive(Debug, clap::Args)]
pub struct MoveArgs {
    /// Submission id
    pub id: SubmissionId,

    /// Target state: approved, rejected or archived
    pub state: LifecycleState,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: MoveArgs, ctx: &Context) -> Result<()> {
    let records = ctx.records();
    let mut stored = records.load(&args.id)?;
    let Some(record) = stored.record.clone() else {
        bail!("Submission {} has never been stored", args.id);
    };

    let (manager, backend) = ctx.lifecycle()?;
    backend.seed_record(&record, manager.folders());

    let outcome = manager.transition(&record, args.state)?;
    stored.record = Some(outcome.record.clone());
    records.save(&stored)?;

    if args.json {
        print_json(&outcome)
    } else {
        print_transition(&outcome);
        Ok(())
    }
}
