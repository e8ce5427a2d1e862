//! Apply Command

use anyhow::Result;
use lmsprov_common::ApplyReport;

use super::Context;
use crate::output::{print_document, print_error, print_step, print_success, print_warning};

/// Apply the plan; returns the process exit code for the run
pub async fn execute(ctx: &Context) -> Result<i32> {
    let plan = ctx.plan()?;
    let reconciler = ctx.reconciler();

    let live = ctx.format.is_human();
    let report = reconciler
        .apply_with(&plan, |step| {
            if live {
                print_step(step);
            }
        })
        .await;

    print_document(&report, ctx.format, || print_summary(&report))?;
    Ok(report.exit_code())
}

fn print_summary(report: &ApplyReport) {
    println!();
    match report.failed() {
        None => print_success(&format!(
            "Apply complete: {} created, {} already existed",
            report.created(),
            report.already_existing()
        )),
        Some(step) => {
            print_error(&format!(
                "Apply halted at {} ({} created before the failure)",
                step.resource,
                report.created()
            ));
            if let Some(error) = step.error() {
                print_error(&error.to_string());
            }
            if !report.not_attempted.is_empty() {
                let skipped: Vec<String> =
                    report.not_attempted.iter().map(ToString::to_string).collect();
                print_warning(&format!("Not attempted: {}", skipped.join(", ")));
            }
        }
    }
}
