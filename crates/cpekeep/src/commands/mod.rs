//! Command handlers.

pub mod backups;
pub mod config_cmd;
pub mod device;
pub mod events;
pub mod inspect;
pub mod paths;
pub mod restore;

use std::sync::Arc;

use cpekeep_config::Config;
use cpekeep_core::{DeviceLifecycle, MemoryBackupStore};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Route a command that needs the config file, the backup store, or the ACS.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Config(args) => config_cmd::handle(args, cfg, global),
        Command::Backups(args) => backups::handle(args, &open_store(global, cfg)?, global),
        Command::Events(args) => events::handle(args, &open_store(global, cfg)?, global),
        Command::Device(args) => device::handle(args, &connect(global, cfg)?, global).await,
        Command::Restore(args) => restore::handle(args, &connect(global, cfg)?, global).await,
        Command::Paths(_) | Command::Inspect(_) | Command::Completions(_) => {
            Err(CliError::Internal("offline command routed to dispatch".into()))
        }
    }
}

fn open_store(global: &GlobalOpts, cfg: &Config) -> Result<MemoryBackupStore, CliError> {
    Ok(MemoryBackupStore::open(config::data_file(global, cfg))?)
}

/// Wire the engine to the ACS. Ctrl-C abandons in-flight restore retries.
fn connect(global: &GlobalOpts, cfg: &Config) -> Result<DeviceLifecycle, CliError> {
    let engine = config::engine_config(global, cfg)?;
    let client = Arc::new(engine.acs.build_client()?);
    let store = Arc::new(open_store(global, cfg)?);

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, abandoning pending restores");
            token.cancel();
        }
    });

    Ok(DeviceLifecycle::new(client, store, &engine, cancel))
}
