// ── Device lifecycle ──
//
// One pass over a device: observe it, decide whether it was reset,
// restore it if so, otherwise refresh its backup. A fleet scan runs that
// pass over many devices with bounded parallelism.

use std::sync::Arc;

use chrono::Utc;
use cpekeep_acs::NbiClient;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backup::{Observation, ResetDetector, extract_with};
use crate::config::{EngineConfig, ScanPolicy};
use crate::error::CoreError;
use crate::model::{DeviceTree, ResetEvent};
use crate::normalize::{Accessor, Detection};
use crate::restore::{RestoreOrchestrator, RestoreReport};
use crate::store::{BackupStore, CommitOutcome, SerialLocks, commit_snapshot};

/// What one pass over a device did.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub device_id: String,
    pub serial: Option<String>,
    pub detection: Detection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset: Option<ResetEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore: Option<RestoreReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<CommitOutcome>,
    /// The device may be running factory settings, so no backup was taken.
    pub backup_suppressed: bool,
}

pub struct DeviceLifecycle {
    client: Arc<NbiClient>,
    store: Arc<dyn BackupStore>,
    locks: Arc<SerialLocks>,
    detector: ResetDetector,
    orchestrator: RestoreOrchestrator,
    scan: ScanPolicy,
}

impl DeviceLifecycle {
    pub fn new(
        client: Arc<NbiClient>,
        store: Arc<dyn BackupStore>,
        config: &EngineConfig,
        cancel: CancellationToken,
    ) -> Self {
        let locks = Arc::new(SerialLocks::new());
        let orchestrator = RestoreOrchestrator::new(
            Arc::clone(&client),
            Arc::clone(&store),
            Arc::clone(&locks),
            config.restore.clone(),
            cancel,
        );
        Self {
            client,
            store,
            locks,
            detector: ResetDetector::new(config.reset.clone()),
            orchestrator,
            scan: config.scan.clone(),
        }
    }

    pub fn client(&self) -> &Arc<NbiClient> {
        &self.client
    }

    pub fn store(&self) -> &Arc<dyn BackupStore> {
        &self.store
    }

    pub fn orchestrator(&self) -> &RestoreOrchestrator {
        &self.orchestrator
    }

    /// Run one pass over an already-fetched tree.
    pub async fn process(
        &self,
        device_id: &str,
        tree: &DeviceTree,
    ) -> Result<ProcessReport, CoreError> {
        let acc = Accessor::new(tree);
        let mut report = ProcessReport {
            device_id: device_id.to_owned(),
            serial: tree.serial_number(),
            detection: acc.detection(),
            reset: None,
            restore: None,
            backup: None,
            backup_suppressed: false,
        };
        let Some(serial) = report.serial.clone() else {
            debug!(device_id, "device reports no serial number, observe only");
            return Ok(report);
        };

        let _guard = self.locks.lock(&serial).await;

        let obs = Observation::from_accessor(&acc);
        let active_hash = self
            .store
            .active_snapshot(&serial)?
            .map(|s| s.config_hash);
        let check = self.detector.observe(
            self.store.as_ref(),
            &serial,
            Some(device_id),
            &obs,
            active_hash.as_deref(),
            Utc::now(),
        )?;
        report.backup_suppressed = check.suppresses_backup();
        report.reset = check.event;

        if report.reset.is_some() {
            report.restore = Some(
                self.orchestrator
                    .restore_locked(&serial, Some(device_id))
                    .await?,
            );
        } else if report.backup_suppressed {
            debug!(device_id, serial = %serial, "reset unresolved for this boot, keeping backup");
        } else if let Some(mut snapshot) = extract_with(&acc) {
            snapshot.device_id = Some(device_id.to_owned());
            report.backup = Some(commit_snapshot(self.store.as_ref(), snapshot)?);
        }
        Ok(report)
    }

    /// Fetch a device from the ACS and process it.
    pub async fn process_device(&self, device_id: &str) -> Result<ProcessReport, CoreError> {
        let doc = self.client.get_device(device_id).await?;
        let tree = DeviceTree::from_json(&doc);
        self.process(device_id, &tree).await
    }

    /// Refresh the backup of one device without reset detection.
    ///
    /// `Ok(None)` when the device exposes nothing worth backing up.
    pub async fn backup_device(&self, device_id: &str) -> Result<Option<CommitOutcome>, CoreError> {
        let doc = self.client.get_device(device_id).await?;
        let tree = DeviceTree::from_json(&doc);
        let serial = tree.serial_number().ok_or_else(|| CoreError::MissingSerial {
            device_id: device_id.to_owned(),
        })?;

        let _guard = self.locks.lock(&serial).await;
        let Some(mut snapshot) = extract_with(&Accessor::new(&tree)) else {
            debug!(device_id, serial = %serial, "nothing to back up");
            return Ok(None);
        };
        snapshot.device_id = Some(device_id.to_owned());
        commit_snapshot(self.store.as_ref(), snapshot).map(Some)
    }

    /// Process many devices, `ScanPolicy::concurrency` at a time. One
    /// device failing never stops the scan.
    pub async fn process_fleet(
        &self,
        device_ids: Vec<String>,
    ) -> Vec<(String, Result<ProcessReport, CoreError>)> {
        let total = device_ids.len();
        let results: Vec<(String, Result<ProcessReport, CoreError>)> = stream::iter(device_ids)
            .map(|id| async move {
                let result = self.process_device(&id).await;
                if let Err(e) = &result {
                    warn!(device_id = %id, error = %e, "device pass failed");
                }
                (id, result)
            })
            .buffer_unordered(self.scan.concurrency.max(1))
            .collect()
            .await;

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        let resets = results
            .iter()
            .filter(|(_, r)| r.as_ref().is_ok_and(|p| p.reset.is_some()))
            .count();
        info!(total, failed, resets, "fleet scan finished");
        results
    }
}
