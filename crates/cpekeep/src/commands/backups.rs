//! Backup command handlers. These only touch the local store.

use serde::Serialize;
use tabled::Tabled;

use cpekeep_core::{BackupStore, Band, ConfigSnapshot, MemoryBackupStore};

use crate::cli::{BackupsArgs, BackupsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, short_id};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Dialect")]
    dialect: String,
    #[tabled(rename = "SSID")]
    ssid: String,
    #[tabled(rename = "Active")]
    active: &'static str,
    #[tabled(rename = "Auto-restore")]
    auto_restore: &'static str,
    #[tabled(rename = "Restores")]
    restores: u32,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&ConfigSnapshot> for BackupRow {
    fn from(s: &ConfigSnapshot) -> Self {
        Self {
            id: short_id(s.id),
            serial: s.serial_number.clone(),
            dialect: s.dialect.to_string(),
            ssid: output::or_dash(s.primary_ssid()),
            active: output::yes_no(s.active),
            auto_restore: output::yes_no(s.auto_restore_enabled),
            restores: s.restore_count,
            created: output::timestamp(&s.created_at),
        }
    }
}

fn detail(s: &ConfigSnapshot) -> String {
    let mut lines = vec![
        format!("ID:           {}", s.id),
        format!("Serial:       {}", s.serial_number),
        format!("Device:       {}", output::or_dash(s.device_id.as_deref())),
        format!("Dialect:      {}", s.dialect),
        format!("Created:      {}", output::timestamp(&s.created_at)),
        format!("Auto-restore: {}", output::yes_no(s.auto_restore_enabled)),
        format!(
            "Restored:     {} times{}",
            s.restore_count,
            s.last_restored_at
                .map(|t| format!(", last {}", output::timestamp(&t)))
                .unwrap_or_default()
        ),
    ];
    for band in [Band::Ghz24, Band::Ghz5] {
        if let Some(wifi) = s.wifi.get(&band) {
            let label = format!("{band} SSID:");
            lines.push(format!(
                "{label:<14}{}",
                output::or_dash(wifi.ssid.as_deref())
            ));
        }
    }
    lines.push(format!(
        "PPPoE user:   {}",
        output::or_dash(s.wan.username.as_deref())
    ));
    lines.push(format!(
        "LAN:          {}",
        output::or_dash(s.lan.address.as_deref())
    ));
    lines.push(format!("Instructions: {}", s.instructions.len()));
    for ins in &s.instructions {
        lines.push(format!("  {} ({})", ins.path, ins.wire_type));
    }
    lines.join("\n")
}

#[derive(Debug, Serialize)]
struct Toggled {
    serial: String,
    auto_restore_enabled: bool,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(
    args: BackupsArgs,
    store: &MemoryBackupStore,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        BackupsCommand::List { serial, all } => {
            let snapshots = store.snapshots(serial.as_deref(), all)?;
            let out = output::render_list(
                &global.output,
                &snapshots,
                |s| BackupRow::from(s),
                |s| s.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BackupsCommand::Show { serial } => {
            let snapshot = store
                .active_snapshot(&serial)?
                .ok_or_else(|| not_found(serial))?;
            let out = output::render_single(&global.output, &snapshot, detail, |s| {
                s.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BackupsCommand::Toggle { serial, enable, .. } => {
            if !store.set_auto_restore(&serial, enable)? {
                return Err(not_found(serial));
            }
            let toggled = Toggled {
                serial,
                auto_restore_enabled: enable,
            };
            let out = output::render_single(
                &global.output,
                &toggled,
                |t| {
                    format!(
                        "Auto-restore {} for {}",
                        if t.auto_restore_enabled { "enabled" } else { "disabled" },
                        t.serial
                    )
                },
                |t| t.serial.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn not_found(serial: String) -> CliError {
    CliError::NotFound {
        resource_type: "backup".into(),
        identifier: serial,
        list_command: "backups list".into(),
    }
}
