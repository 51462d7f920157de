// ── Backup persistence ──
//
// `BackupStore` is the seam between the engine and whatever keeps
// snapshots, reset events and device history. Every method is atomic at
// the single-record level; multi-record transitions (replace the active
// snapshot) run under the caller's per-serial lock.

mod lock;
mod memory;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{ConfigSnapshot, DeviceHistory, ResetEvent};

pub use lock::SerialLocks;
pub use memory::MemoryBackupStore;

/// Storage for snapshots, reset events and per-device history.
pub trait BackupStore: Send + Sync {
    // ── Snapshots ────────────────────────────────────────────────────

    /// The active snapshot for a serial, if any.
    fn active_snapshot(&self, serial: &str) -> Result<Option<ConfigSnapshot>, CoreError>;

    fn insert_snapshot(&self, snapshot: ConfigSnapshot) -> Result<(), CoreError>;

    /// Clear the active flag. Snapshots are never deleted.
    fn deactivate_snapshot(&self, id: Uuid) -> Result<(), CoreError>;

    /// Snapshots newest first, optionally for one serial and/or active only.
    fn snapshots(
        &self,
        serial: Option<&str>,
        only_active: bool,
    ) -> Result<Vec<ConfigSnapshot>, CoreError>;

    /// Toggle auto-restore on the active snapshot. `false` if there is none.
    fn set_auto_restore(&self, serial: &str, enabled: bool) -> Result<bool, CoreError>;

    /// Bump the restore counter and stamp the restore time.
    fn record_restore(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), CoreError>;

    // ── Reset events ─────────────────────────────────────────────────

    fn insert_event(&self, event: ResetEvent) -> Result<(), CoreError>;

    fn update_event(&self, event: &ResetEvent) -> Result<(), CoreError>;

    /// Events newest first, optionally for one serial.
    fn events(&self, serial: Option<&str>, limit: usize) -> Result<Vec<ResetEvent>, CoreError>;

    /// Most recent event still awaiting a restore outcome.
    fn latest_pending_event(&self, serial: &str) -> Result<Option<ResetEvent>, CoreError> {
        Ok(self
            .events(Some(serial), usize::MAX)?
            .into_iter()
            .find(ResetEvent::is_pending))
    }

    // ── Device history ───────────────────────────────────────────────

    fn device_history(&self, serial: &str) -> Result<Option<DeviceHistory>, CoreError>;

    fn record_history(&self, serial: &str, history: DeviceHistory) -> Result<(), CoreError>;
}

/// Result of committing an extracted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// The active snapshot already has this content hash.
    Unchanged { id: Uuid },
    /// Stored as the new active snapshot, replacing `replaced` if any.
    Created { id: Uuid, replaced: Option<Uuid> },
}

impl CommitOutcome {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Unchanged { id } | Self::Created { id, .. } => *id,
        }
    }
}

/// Store `snapshot` as the active one for its serial unless the content is
/// unchanged. The caller must hold the serial's lock.
///
/// A replacement inherits the operator's auto-restore choice.
pub fn commit_snapshot(
    store: &dyn BackupStore,
    mut snapshot: ConfigSnapshot,
) -> Result<CommitOutcome, CoreError> {
    let previous = store.active_snapshot(&snapshot.serial_number)?;

    if let Some(prev) = &previous {
        if prev.config_hash == snapshot.config_hash {
            return Ok(CommitOutcome::Unchanged { id: prev.id });
        }
        store.deactivate_snapshot(prev.id)?;
        snapshot.auto_restore_enabled = prev.auto_restore_enabled;
    }

    snapshot.active = true;
    let id = snapshot.id;
    info!(
        serial = %snapshot.serial_number,
        hash = %&snapshot.config_hash[..snapshot.config_hash.len().min(12)],
        "stored configuration snapshot"
    );
    store.insert_snapshot(snapshot)?;

    Ok(CommitOutcome::Created {
        id,
        replaced: previous.map(|p| p.id),
    })
}
