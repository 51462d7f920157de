//! Manual restore.

use cpekeep_core::{DeviceLifecycle, RestoreOutcome, RestoreReport};

use crate::cli::{GlobalOpts, RestoreArgs};
use crate::error::CliError;
use crate::output::{self, short_id};

fn detail(r: &RestoreReport, color: bool) -> String {
    let mut lines = vec![
        format!("Serial:   {}", r.serial),
        format!("Outcome:  {}", output::outcome(r.outcome, color)),
        format!("Attempts: {}", r.attempts),
    ];
    if let Some(id) = r.snapshot_id {
        lines.push(format!("Backup:   {}", short_id(id)));
    }
    if let Some(ref task) = r.task_id {
        lines.push(format!("Task:     {task}"));
    }
    if let Some(ref detail) = r.detail {
        lines.push(format!("Detail:   {detail}"));
    }
    lines.join("\n")
}

pub async fn handle(
    args: RestoreArgs,
    lifecycle: &DeviceLifecycle,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let report = lifecycle
        .orchestrator()
        .restore(&args.serial, args.device.as_deref())
        .await?;

    if report.outcome == RestoreOutcome::Failed {
        return Err(CliError::RestoreFailed {
            serial: report.serial,
            detail: report.detail.unwrap_or_else(|| "no detail".into()),
        });
    }

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| detail(r, color),
        |r| r.outcome.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
