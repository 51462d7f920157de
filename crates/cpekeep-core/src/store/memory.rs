// ── In-memory backup store with optional JSON file persistence ──

use std::collections::BTreeMap;
use std::fs::{File, TryLockError};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use super::BackupStore;
use crate::error::CoreError;
use crate::model::{ConfigSnapshot, DeviceHistory, ResetEvent};

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    snapshots: Vec<ConfigSnapshot>,
    #[serde(default)]
    events: Vec<ResetEvent>,
    #[serde(default)]
    history: BTreeMap<String, DeviceHistory>,
}

/// `DashMap`-backed store. When opened on a file, every mutation is
/// written through so a crash loses at most the in-flight record.
///
/// Each mutation rewrites the whole file, so a file-backed store holds an
/// exclusive lock on `<file>.lock` for its lifetime and a second process
/// opening the same file is refused.
#[derive(Debug, Default)]
pub struct MemoryBackupStore {
    snapshots: DashMap<Uuid, ConfigSnapshot>,
    events: DashMap<Uuid, ResetEvent>,
    history: DashMap<String, DeviceHistory>,
    path: Option<PathBuf>,
    /// Serializes file writes.
    write_lock: Mutex<()>,
    /// Released on drop.
    _file_lock: Option<File>,
}

impl MemoryBackupStore {
    /// Volatile store, nothing touches disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path` if it exists, and persist to it from now on.
    ///
    /// Fails when another store (in this or another process) has the same
    /// file open.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let file_lock = lock_file(&path)?;
        let file: StoreFile = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|e| store_err(&path, &e))?;
            serde_json::from_str(&raw).map_err(|e| CoreError::Store {
                message: format!("{}: {e}", path.display()),
            })?
        } else {
            StoreFile::default()
        };
        debug!(
            path = %path.display(),
            snapshots = file.snapshots.len(),
            events = file.events.len(),
            "opened backup store"
        );

        Ok(Self {
            snapshots: file.snapshots.into_iter().map(|s| (s.id, s)).collect(),
            events: file.events.into_iter().map(|e| (e.id, e)).collect(),
            history: file.history.into_iter().collect(),
            path: Some(path),
            write_lock: Mutex::new(()),
            _file_lock: Some(file_lock),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the whole store to its file (no-op when volatile).
    pub fn flush(&self) -> Result<(), CoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().map_err(|_| CoreError::Store {
            message: "store write lock poisoned".into(),
        })?;

        let mut snapshots: Vec<ConfigSnapshot> =
            self.snapshots.iter().map(|r| r.value().clone()).collect();
        snapshots.sort_by_key(|s| (s.created_at, s.id));
        let mut events: Vec<ResetEvent> = self.events.iter().map(|r| r.value().clone()).collect();
        events.sort_by_key(|e| (e.detected_at, e.id));
        let history = self
            .history
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let body = serde_json::to_string_pretty(&StoreFile {
            snapshots,
            events,
            history,
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| store_err(parent, &e))?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(|e| store_err(&tmp, &e))?;
        std::fs::rename(&tmp, path).map_err(|e| store_err(path, &e))?;
        trace!(path = %path.display(), "backup store flushed");
        Ok(())
    }
}

/// Take the exclusive advisory lock guarding `path`.
fn lock_file(path: &Path) -> Result<File, CoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| store_err(parent, &e))?;
    }
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    let lock_path = path.with_file_name(name);

    let file = File::options()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| store_err(&lock_path, &e))?;
    match file.try_lock() {
        Ok(()) => Ok(file),
        Err(TryLockError::WouldBlock) => Err(CoreError::Store {
            message: format!(
                "{} is in use by another cpekeep process",
                path.display()
            ),
        }),
        Err(TryLockError::Error(e)) => Err(store_err(&lock_path, &e)),
    }
}

fn store_err(path: &Path, err: &std::io::Error) -> CoreError {
    CoreError::Store {
        message: format!("{}: {err}", path.display()),
    }
}

impl BackupStore for MemoryBackupStore {
    fn active_snapshot(&self, serial: &str) -> Result<Option<ConfigSnapshot>, CoreError> {
        Ok(self
            .snapshots
            .iter()
            .find(|s| s.active && s.serial_number == serial)
            .map(|s| s.value().clone()))
    }

    fn insert_snapshot(&self, snapshot: ConfigSnapshot) -> Result<(), CoreError> {
        self.snapshots.insert(snapshot.id, snapshot);
        self.flush()
    }

    fn deactivate_snapshot(&self, id: Uuid) -> Result<(), CoreError> {
        match self.snapshots.get_mut(&id) {
            Some(mut s) => s.active = false,
            None => {
                return Err(CoreError::Store {
                    message: format!("no snapshot {id}"),
                });
            }
        }
        self.flush()
    }

    fn snapshots(
        &self,
        serial: Option<&str>,
        only_active: bool,
    ) -> Result<Vec<ConfigSnapshot>, CoreError> {
        let mut out: Vec<ConfigSnapshot> = self
            .snapshots
            .iter()
            .filter(|s| serial.is_none_or(|sn| s.serial_number == sn))
            .filter(|s| !only_active || s.active)
            .map(|s| s.value().clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    fn set_auto_restore(&self, serial: &str, enabled: bool) -> Result<bool, CoreError> {
        let Some(id) = self.active_snapshot(serial)?.map(|s| s.id) else {
            return Ok(false);
        };
        if let Some(mut s) = self.snapshots.get_mut(&id) {
            s.auto_restore_enabled = enabled;
        }
        self.flush()?;
        Ok(true)
    }

    fn record_restore(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), CoreError> {
        if let Some(mut s) = self.snapshots.get_mut(&id) {
            s.restore_count = s.restore_count.saturating_add(1);
            s.last_restored_at = Some(at);
        }
        self.flush()
    }

    fn insert_event(&self, event: ResetEvent) -> Result<(), CoreError> {
        self.events.insert(event.id, event);
        self.flush()
    }

    fn update_event(&self, event: &ResetEvent) -> Result<(), CoreError> {
        if !self.events.contains_key(&event.id) {
            return Err(CoreError::Store {
                message: format!("no reset event {}", event.id),
            });
        }
        self.events.insert(event.id, event.clone());
        self.flush()
    }

    fn events(&self, serial: Option<&str>, limit: usize) -> Result<Vec<ResetEvent>, CoreError> {
        let mut out: Vec<ResetEvent> = self
            .events
            .iter()
            .filter(|e| serial.is_none_or(|sn| e.serial_number == sn))
            .map(|e| e.value().clone())
            .collect();
        out.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        out.truncate(limit);
        Ok(out)
    }

    fn device_history(&self, serial: &str) -> Result<Option<DeviceHistory>, CoreError> {
        Ok(self.history.get(serial).map(|h| h.value().clone()))
    }

    fn record_history(&self, serial: &str, history: DeviceHistory) -> Result<(), CoreError> {
        self.history.insert(serial.to_owned(), history);
        self.flush()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::{LanConfig, ResetReason, RestoreOutcome, WanConfig, content_hash};
    use crate::normalize::Dialect;
    use crate::store::{CommitOutcome, commit_snapshot};

    fn snapshot(serial: &str, username: &str) -> ConfigSnapshot {
        let wifi = BTreeMap::new();
        let wan = WanConfig {
            username: Some(username.into()),
            password: None,
        };
        let lan = LanConfig::default();
        ConfigSnapshot {
            id: Uuid::new_v4(),
            serial_number: serial.into(),
            device_id: Some(format!("DEV-{serial}")),
            dialect: Dialect::Tr098,
            config_hash: content_hash(&wifi, &wan, &lan),
            wifi,
            wan,
            lan,
            instructions: Vec::new(),
            active: false,
            auto_restore_enabled: true,
            restore_count: 0,
            last_restored_at: None,
            created_at: Utc::now(),
        }
    }

    fn active_count(store: &MemoryBackupStore, serial: &str) -> usize {
        store
            .snapshots(Some(serial), false)
            .unwrap()
            .iter()
            .filter(|s| s.active)
            .count()
    }

    #[test]
    fn unchanged_hash_is_a_noop() {
        let store = MemoryBackupStore::new();
        let first = commit_snapshot(&store, snapshot("SN1", "a")).unwrap();
        let again = commit_snapshot(&store, snapshot("SN1", "a")).unwrap();

        assert!(matches!(first, CommitOutcome::Created { replaced: None, .. }));
        assert_eq!(again, CommitOutcome::Unchanged { id: first.id() });
        assert_eq!(store.snapshots(Some("SN1"), false).unwrap().len(), 1);
    }

    #[test]
    fn at_most_one_active_per_serial() {
        let store = MemoryBackupStore::new();
        let hashes = ["a", "b", "a", "c", "c"];
        let mut last = None;
        for h in hashes {
            let outcome = commit_snapshot(&store, snapshot("SN1", h)).unwrap();
            assert_eq!(active_count(&store, "SN1"), 1);
            last = Some(outcome.id());
        }
        // a, b, a(again after b), c -> four stored, newest active
        assert_eq!(store.snapshots(Some("SN1"), false).unwrap().len(), 4);
        assert_eq!(store.active_snapshot("SN1").unwrap().unwrap().id, last.unwrap());

        commit_snapshot(&store, snapshot("SN2", "a")).unwrap();
        assert_eq!(active_count(&store, "SN1"), 1);
        assert_eq!(active_count(&store, "SN2"), 1);
    }

    #[test]
    fn replacement_keeps_auto_restore_choice() {
        let store = MemoryBackupStore::new();
        commit_snapshot(&store, snapshot("SN1", "a")).unwrap();
        assert!(store.set_auto_restore("SN1", false).unwrap());
        commit_snapshot(&store, snapshot("SN1", "b")).unwrap();
        assert!(!store.active_snapshot("SN1").unwrap().unwrap().auto_restore_enabled);
        assert!(!store.set_auto_restore("UNKNOWN", true).unwrap());
    }

    #[test]
    fn persists_to_file_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("backups.json");

        let store = MemoryBackupStore::open(&path).unwrap();
        let outcome = commit_snapshot(&store, snapshot("SN1", "a")).unwrap();
        store.record_restore(outcome.id(), Utc::now()).unwrap();
        store
            .insert_event(ResetEvent {
                id: Uuid::new_v4(),
                serial_number: "SN1".into(),
                device_id: None,
                reason: ResetReason::DefaultSsid,
                signals: vec![ResetReason::DefaultSsid],
                detected_at: Utc::now(),
                outcome: RestoreOutcome::Pending,
                detail: None,
                uptime: Some(120),
                previous_uptime: None,
                config_hash: None,
                resolved_at: None,
            })
            .unwrap();
        store
            .record_history("SN1", DeviceHistory {
                last_uptime: Some(120),
                last_pppoe_username: Some("a".into()),
                last_seen: Utc::now(),
            })
            .unwrap();

        drop(store);
        let reopened = MemoryBackupStore::open(&path).unwrap();
        let active = reopened.active_snapshot("SN1").unwrap().unwrap();
        assert_eq!(active.restore_count, 1);
        assert!(active.last_restored_at.is_some());
        assert!(reopened.latest_pending_event("SN1").unwrap().is_some());
        assert_eq!(
            reopened.device_history("SN1").unwrap().unwrap().last_uptime,
            Some(120)
        );
    }

    #[test]
    fn second_open_of_the_same_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backups.json");

        let first = MemoryBackupStore::open(&path).unwrap();
        commit_snapshot(&first, snapshot("SN1", "a")).unwrap();
        let err = MemoryBackupStore::open(&path).unwrap_err();
        assert!(matches!(err, CoreError::Store { ref message } if message.contains("in use")));

        // Other files are unaffected.
        MemoryBackupStore::open(dir.path().join("other.json")).unwrap();

        drop(first);
        let reopened = MemoryBackupStore::open(&path).unwrap();
        assert!(reopened.active_snapshot("SN1").unwrap().is_some());
    }

    #[test]
    fn corrupt_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backups.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            MemoryBackupStore::open(&path),
            Err(CoreError::Store { .. })
        ));
    }
}
