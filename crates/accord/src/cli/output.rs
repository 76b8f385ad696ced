//! Text and JSON rendering of command results

use accord::{StepReport, SubmissionReport, TransitionOutcome};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn step_line(step: &StepReport) -> String {
    let mark = if step.ok { "ok  " } else { "FAIL" };
    let mut line = format!("  [{}] {:<16}", mark, step.step.as_str());
    if let Some(detail) = &step.detail {
        line.push_str(&format!(" {}", detail));
    }
    if let Some(error) = &step.error {
        line.push_str(&format!(" {}", error));
    }
    line
}

pub fn print_report(report: &SubmissionReport) {
    println!("Submission {}", report.submission);
    for step in &report.steps {
        println!("{}", step_line(step));
        for warning in &step.warnings {
            println!("         ! {}", warning);
        }
    }
    if let Some(pointer) = &report.pointer {
        println!();
        println!("Document: {}", pointer.document_url);
        if let Some(tier) = report.upload_tier() {
            println!("Stored:   {}", tier);
        }
    }
    if let Some(bundle) = &report.bundle {
        println!("Folder:   {} ({})", bundle.folder.display_name, bundle.folder.id);
        for annex in &bundle.annexes {
            println!("  annex {} -> {} ({})", annex.display_name, annex.artifact.view_link, annex.tier);
        }
    }
}

pub fn print_transition(outcome: &TransitionOutcome) {
    println!("State: {} -> {}", outcome.from, outcome.record.state);
    match &outcome.error {
        None if outcome.moved => println!("Moved: yes"),
        None => println!("Moved: nothing to move"),
        Some(error) => println!("Moved: no ({})", error),
    }
}
