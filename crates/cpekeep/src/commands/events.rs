//! Reset event command handlers.

use tabled::Tabled;

use cpekeep_core::{BackupStore, MemoryBackupStore, ResetEvent};

use crate::cli::{EventsArgs, EventsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, short_id};

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Detected")]
    detected: String,
    #[tabled(rename = "Signals")]
    signals: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl EventRow {
    fn new(e: &ResetEvent, color: bool) -> Self {
        Self {
            id: short_id(e.id),
            serial: e.serial_number.clone(),
            detected: output::timestamp(&e.detected_at),
            signals: e
                .signals
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
            uptime: match (e.previous_uptime, e.uptime) {
                (Some(before), Some(now)) => format!("{before}s -> {now}s"),
                (None, Some(now)) => format!("{now}s"),
                _ => "-".into(),
            },
            outcome: output::outcome(e.outcome, color),
            detail: output::or_dash(e.detail.as_deref()),
        }
    }
}

pub fn handle(
    args: EventsArgs,
    store: &MemoryBackupStore,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        EventsCommand::List { serial, limit } => {
            let events = store.events(serial.as_deref(), limit)?;
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &events,
                |e| EventRow::new(e, color),
                |e| e.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
