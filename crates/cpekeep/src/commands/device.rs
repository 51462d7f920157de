//! Device command handlers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use cpekeep_core::{
    Band, CommitOutcome, CoreError, DeviceLifecycle, DeviceTree, ProcessReport,
};

use crate::cli::{DeviceArgs, DeviceCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, short_id};

use super::inspect::{Inspection, band_line, rule};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceIdRow {
    #[tabled(rename = "Device ID")]
    id: String,
}

#[derive(Tabled)]
struct ProcessRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Dialect")]
    dialect: String,
    #[tabled(rename = "Reset")]
    reset: String,
    #[tabled(rename = "Restore")]
    restore: String,
    #[tabled(rename = "Backup")]
    backup: String,
}

/// One device of a processing run.
#[derive(Debug, Serialize)]
struct ProcessEntry {
    device_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ProcessReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ProcessRow {
    fn new(entry: &ProcessEntry, color: bool) -> Self {
        let Some(report) = &entry.report else {
            return Self {
                device: entry.device_id.clone(),
                serial: "-".into(),
                dialect: "-".into(),
                reset: "-".into(),
                restore: "-".into(),
                backup: format!("error: {}", entry.error.as_deref().unwrap_or("unknown")),
            };
        };
        Self {
            device: entry.device_id.clone(),
            serial: output::or_dash(report.serial.as_deref()),
            dialect: report.detection.dialect.to_string(),
            reset: report.reset.as_ref().map_or_else(
                || "-".into(),
                |e| {
                    e.signals
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(",")
                },
            ),
            restore: report
                .restore
                .as_ref()
                .map_or_else(|| "-".into(), |r| output::outcome(r.outcome, color)),
            backup: match &report.backup {
                Some(outcome) => commit_label(outcome),
                None if report.backup_suppressed => "held".into(),
                None => "-".into(),
            },
        }
    }
}

fn commit_label(outcome: &CommitOutcome) -> String {
    match outcome {
        CommitOutcome::Unchanged { .. } => "unchanged".into(),
        CommitOutcome::Created { replaced: None, .. } => "created".into(),
        CommitOutcome::Created {
            replaced: Some(_), ..
        } => "updated".into(),
    }
}

/// Active backup as shown next to a live device.
#[derive(Debug, Serialize)]
struct BackupSummary {
    id: String,
    created_at: DateTime<Utc>,
    auto_restore_enabled: bool,
    restore_count: u32,
}

#[derive(Debug, Serialize)]
struct DeviceView {
    #[serde(flatten)]
    inspection: Inspection,
    active_backup: Option<BackupSummary>,
}

fn detail(v: &DeviceView) -> String {
    let i = &v.inspection;
    let mut lines = vec![
        format!("Device:        {}", output::or_dash(i.device_id.as_deref())),
        format!("Serial:        {}", output::or_dash(i.serial.as_deref())),
        format!("Manufacturer:  {}", output::or_dash(i.manufacturer.as_deref())),
        format!(
            "Dialect:       {} ({})",
            i.detection.dialect,
            rule(i.detection.rule)
        ),
        format!("2.4GHz:        {}", band_line(&i.bands, Band::Ghz24)),
        format!("5GHz:          {}", band_line(&i.bands, Band::Ghz5)),
        format!(
            "Uptime:        {}",
            i.observation
                .uptime
                .map_or_else(|| "-".into(), |u| format!("{u}s"))
        ),
        format!("SSID:          {}", output::or_dash(i.observation.ssid.as_deref())),
        format!(
            "PPPoE user:    {}",
            output::or_dash(i.observation.pppoe_username.as_deref())
        ),
    ];
    match &v.active_backup {
        Some(b) => {
            lines.push(format!(
                "Backup:        {} taken {}",
                b.id,
                output::timestamp(&b.created_at)
            ));
            lines.push(format!(
                "Auto-restore:  {} (restored {} times)",
                output::yes_no(b.auto_restore_enabled),
                b.restore_count
            ));
        }
        None => lines.push("Backup:        none".into()),
    }
    lines.join("\n")
}

/// Fetch a device by ACS id, falling back to a serial-number lookup.
async fn fetch_device(lifecycle: &DeviceLifecycle, identifier: &str) -> Result<Value, CliError> {
    let client = lifecycle.client();
    match client.get_device(identifier).await {
        Ok(doc) => Ok(doc),
        Err(cpekeep_acs::Error::DeviceNotFound { .. }) => client
            .find_device_by_serial(identifier)
            .await
            .map_err(CoreError::from)?
            .ok_or_else(|| {
                CoreError::DeviceNotFound {
                    identifier: identifier.to_owned(),
                }
                .into()
            }),
        Err(e) => Err(CoreError::from(e).into()),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: DeviceArgs,
    lifecycle: &DeviceLifecycle,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DeviceCommand::List => {
            let ids = lifecycle
                .client()
                .list_device_ids()
                .await
                .map_err(CoreError::from)?;
            let out = output::render_list(
                &global.output,
                &ids,
                |id| DeviceIdRow { id: id.clone() },
                Clone::clone,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DeviceCommand::Show { device } => {
            let doc = fetch_device(lifecycle, &device).await?;
            let tree = DeviceTree::from_json(&doc);
            let mut inspection = Inspection::of(&tree);
            if inspection.device_id.is_none() {
                inspection.device_id = Some(device.clone());
            }
            // The live view never carries secrets.
            inspection.snapshot = None;

            let active_backup = match &inspection.serial {
                Some(serial) => lifecycle.store().active_snapshot(serial)?.map(|s| BackupSummary {
                    id: s.id.to_string(),
                    created_at: s.created_at,
                    auto_restore_enabled: s.auto_restore_enabled,
                    restore_count: s.restore_count,
                }),
                None => None,
            };
            let view = DeviceView {
                inspection,
                active_backup,
            };

            let out = output::render_single(&global.output, &view, detail, |v| {
                output::or_dash(v.inspection.serial.as_deref())
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DeviceCommand::Backup { device } => {
            let outcome = lifecycle.backup_device(&device).await?;
            let out = output::render_single(
                &global.output,
                &outcome,
                |o| match o {
                    Some(CommitOutcome::Unchanged { id }) => {
                        format!("Backup {} of {device} is up to date", short_id(*id))
                    }
                    Some(created) => format!(
                        "Backup {} of {device} {}",
                        short_id(created.id()),
                        commit_label(created)
                    ),
                    None => format!("Nothing to back up on {device}"),
                },
                |o| o.map(|c| c.id().to_string()).unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DeviceCommand::Process { devices, all } => {
            let ids = if all {
                lifecycle
                    .client()
                    .list_device_ids()
                    .await
                    .map_err(CoreError::from)?
            } else {
                devices
            };
            let single = ids.len() == 1;

            let mut entries = Vec::with_capacity(ids.len());
            for (device_id, result) in lifecycle.process_fleet(ids).await {
                match result {
                    Ok(report) => entries.push(ProcessEntry {
                        device_id,
                        report: Some(report),
                        error: None,
                    }),
                    Err(e) if single => return Err(e.into()),
                    Err(e) => entries.push(ProcessEntry {
                        device_id,
                        report: None,
                        error: Some(e.to_string()),
                    }),
                }
            }
            entries.sort_by(|a, b| a.device_id.cmp(&b.device_id));

            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &entries,
                |e| ProcessRow::new(e, color),
                |e| e.device_id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
