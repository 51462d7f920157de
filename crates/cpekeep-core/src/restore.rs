// ── Auto-restore orchestration ──
//
// Pushes the active snapshot's write instructions back to a device as one
// batched setParameterValues task and records the outcome on the pending
// reset event. A timed-out submission is not proof the write failed: the
// device confirms writes on its next session, not in this call.

use std::sync::Arc;

use chrono::Utc;
use cpekeep_acs::{NbiClient, ParameterValue, Task};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RestorePolicy;
use crate::error::CoreError;
use crate::model::{ConfigSnapshot, ResetEvent, RestoreOutcome};
use crate::store::{BackupStore, SerialLocks};

/// What a restore attempt did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub serial: String,
    pub outcome: RestoreOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Task submissions made (0 when skipped).
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl RestoreReport {
    fn new(serial: &str, outcome: RestoreOutcome, detail: impl Into<String>) -> Self {
        Self {
            serial: serial.to_owned(),
            outcome,
            detail: Some(detail.into()),
            attempts: 0,
            snapshot_id: None,
            event_id: None,
            task_id: None,
        }
    }
}

pub struct RestoreOrchestrator {
    client: Arc<NbiClient>,
    store: Arc<dyn BackupStore>,
    locks: Arc<SerialLocks>,
    policy: RestorePolicy,
    cancel: CancellationToken,
}

impl RestoreOrchestrator {
    pub fn new(
        client: Arc<NbiClient>,
        store: Arc<dyn BackupStore>,
        locks: Arc<SerialLocks>,
        policy: RestorePolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            store,
            locks,
            policy,
            cancel,
        }
    }

    pub fn policy(&self) -> &RestorePolicy {
        &self.policy
    }

    /// Restore the active snapshot of `serial`, taking the serial's lock.
    ///
    /// `target_device_id` overrides where the task is sent; by default it
    /// goes to the device that raised the pending reset event, else the
    /// device the snapshot was read from.
    pub async fn restore(
        &self,
        serial: &str,
        target_device_id: Option<&str>,
    ) -> Result<RestoreReport, CoreError> {
        let _guard = self.locks.lock(serial).await;
        self.restore_locked(serial, target_device_id).await
    }

    /// [`restore`](Self::restore) for callers already holding the lock.
    pub async fn restore_locked(
        &self,
        serial: &str,
        target_device_id: Option<&str>,
    ) -> Result<RestoreReport, CoreError> {
        let event = self.store.latest_pending_event(serial)?;
        let mut report = match self.attempt(serial, target_device_id, event.as_ref()).await {
            Ok(report) => report,
            Err(e) => {
                if let Some(event) = event {
                    self.resolve(event, RestoreOutcome::Failed, Some(e.to_string()))?;
                }
                return Err(e);
            }
        };

        if let Some(event) = event {
            report.event_id = Some(self.resolve(event, report.outcome, report.detail.clone())?);
        }
        let restored = report
            .snapshot_id
            .filter(|_| report.outcome == RestoreOutcome::Success);
        if let Some(snapshot_id) = restored {
            self.store.record_restore(snapshot_id, Utc::now())?;
        }

        match report.outcome {
            RestoreOutcome::Failed => warn!(
                serial,
                attempts = report.attempts,
                detail = ?report.detail,
                "restore failed"
            ),
            outcome => info!(serial, %outcome, attempts = report.attempts, "restore finished"),
        }
        Ok(report)
    }

    fn resolve(
        &self,
        mut event: ResetEvent,
        outcome: RestoreOutcome,
        detail: Option<String>,
    ) -> Result<Uuid, CoreError> {
        event.outcome = outcome;
        event.detail = detail;
        event.resolved_at = Some(Utc::now());
        self.store.update_event(&event)?;
        Ok(event.id)
    }

    /// Device-side work only; store writes happen in the caller once the
    /// event is resolved.
    async fn attempt(
        &self,
        serial: &str,
        target_device_id: Option<&str>,
        event: Option<&ResetEvent>,
    ) -> Result<RestoreReport, CoreError> {
        let Some(snapshot) = self.store.active_snapshot(serial)? else {
            return Ok(RestoreReport::new(
                serial,
                RestoreOutcome::Skipped,
                "no active snapshot",
            ));
        };
        let mut report = RestoreReport::new(serial, RestoreOutcome::Skipped, "");
        report.snapshot_id = Some(snapshot.id);

        if !snapshot.auto_restore_enabled {
            report.detail = Some("auto-restore disabled".into());
            return Ok(report);
        }
        if snapshot.instructions.is_empty() {
            report.detail = Some("snapshot has no write instructions".into());
            return Ok(report);
        }
        let known = target_device_id
            .map(String::from)
            .or_else(|| event.and_then(|e| e.device_id.clone()))
            .or_else(|| snapshot.device_id.clone());
        let device_id = match known {
            Some(id) => id,
            None => match self.lookup_device_id(serial).await {
                Ok(Some(id)) => id,
                Ok(None) => {
                    report.detail = Some("no ACS device id known".into());
                    return Ok(report);
                }
                Err(e) => {
                    report.outcome = RestoreOutcome::Failed;
                    report.detail = Some(format!("device lookup failed: {e}"));
                    return Ok(report);
                }
            },
        };

        let task = restore_task(&snapshot);
        let mut attempt: u32 = 0;
        loop {
            report.attempts = attempt + 1;
            debug!(serial, device_id = %device_id, attempt, "submitting restore task");

            match self.submit(&device_id, &task).await {
                Ok(ack) => {
                    report.outcome = RestoreOutcome::Success;
                    report.detail = Some(if ack.queued {
                        "task queued".into()
                    } else {
                        "task applied".into()
                    });
                    report.task_id = ack.task_id;
                    return Ok(report);
                }
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    warn!(serial, attempt, error = %e, "restore submission failed, retrying");
                    if !self.pause(attempt).await {
                        report.outcome = RestoreOutcome::Failed;
                        report.detail = Some("abandoned".into());
                        return Ok(report);
                    }
                    attempt += 1;
                }
                Err(e) => {
                    report.outcome = RestoreOutcome::Failed;
                    report.detail = Some(e.to_string());
                    return Ok(report);
                }
            }
        }
    }

    /// Ask the ACS which device currently reports `serial`. Transient
    /// failures are retried under the restore policy.
    async fn lookup_device_id(&self, serial: &str) -> Result<Option<String>, CoreError> {
        let mut attempt: u32 = 0;
        let doc = loop {
            match self.client.find_device_by_serial(serial).await {
                Ok(doc) => break doc,
                Err(e) => {
                    let e = CoreError::from(e);
                    if !e.is_transient() || attempt >= self.policy.max_retries {
                        return Err(e);
                    }
                    warn!(serial, attempt, error = %e, "device lookup failed, retrying");
                    if !self.pause(attempt).await {
                        return Err(e);
                    }
                    attempt += 1;
                }
            }
        };
        let id = doc.and_then(|d| d.get("_id").and_then(|v| v.as_str()).map(String::from));
        debug!(serial, device_id = ?id, "looked up device by serial");
        Ok(id)
    }

    /// Sleep out the backoff for `attempt`. `false` when cancelled first.
    async fn pause(&self, attempt: u32) -> bool {
        let delay = self.policy.backoff(attempt);
        debug!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "backing off"
        );
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    async fn submit(
        &self,
        device_id: &str,
        task: &Task,
    ) -> Result<cpekeep_acs::TaskAck, CoreError> {
        let call = self
            .client
            .submit_task(device_id, task, self.policy.connection_request);
        match tokio::time::timeout(self.policy.submit_timeout, call).await {
            Ok(result) => result.map_err(CoreError::from),
            Err(_) => Err(CoreError::Timeout {
                timeout_secs: self.policy.submit_timeout.as_secs(),
            }),
        }
    }
}

/// The batched write task for a snapshot, in instruction order.
pub fn restore_task(snapshot: &ConfigSnapshot) -> Task {
    Task::SetParameterValues {
        parameter_values: snapshot
            .instructions
            .iter()
            .cloned()
            .map(ParameterValue::from)
            .collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use cpekeep_acs::WireType;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::model::{LanConfig, ResetReason, WanConfig, WriteInstruction};
    use crate::normalize::Dialect;
    use crate::store::{MemoryBackupStore, commit_snapshot};

    fn snapshot(instructions: Vec<WriteInstruction>) -> ConfigSnapshot {
        ConfigSnapshot {
            id: Uuid::new_v4(),
            serial_number: "SN1".into(),
            device_id: Some("DEV1".into()),
            dialect: Dialect::Tr098,
            wifi: BTreeMap::new(),
            wan: WanConfig::default(),
            lan: LanConfig::default(),
            instructions,
            config_hash: "h1".into(),
            active: false,
            auto_restore_enabled: true,
            restore_count: 0,
            last_restored_at: None,
            created_at: Utc::now(),
        }
    }

    fn ssid_write() -> WriteInstruction {
        WriteInstruction {
            path: "InternetGatewayDevice.LANDevice.1.WLANConfiguration.1.SSID".into(),
            value: "Casa".into(),
            wire_type: WireType::String,
        }
    }

    fn pending_event() -> ResetEvent {
        ResetEvent {
            id: Uuid::new_v4(),
            serial_number: "SN1".into(),
            device_id: None,
            reason: ResetReason::UptimeRegression,
            signals: vec![ResetReason::UptimeRegression],
            detected_at: Utc::now(),
            outcome: RestoreOutcome::Pending,
            detail: None,
            uptime: Some(60),
            previous_uptime: Some(86400),
            config_hash: None,
            resolved_at: None,
        }
    }

    fn orchestrator(
        server: &MockServer,
        store: Arc<MemoryBackupStore>,
        policy: RestorePolicy,
        cancel: CancellationToken,
    ) -> RestoreOrchestrator {
        let client = NbiClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());
        RestoreOrchestrator::new(
            Arc::new(client),
            store,
            Arc::new(SerialLocks::new()),
            policy,
            cancel,
        )
    }

    #[tokio::test]
    async fn skips_without_active_snapshot() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryBackupStore::new());
        store.insert_event(pending_event()).unwrap();
        let orch = orchestrator(&server, store.clone(), RestorePolicy::default(), CancellationToken::new());

        let report = orch.restore("SN1", None).await.unwrap();
        assert_eq!(report.outcome, RestoreOutcome::Skipped);
        assert_eq!(report.attempts, 0);
        let event = store.events(Some("SN1"), 1).unwrap().remove(0);
        assert_eq!(event.outcome, RestoreOutcome::Skipped);
        assert!(event.resolved_at.is_some());
    }

    #[tokio::test]
    async fn skips_when_auto_restore_disabled_or_empty() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryBackupStore::new());
        commit_snapshot(store.as_ref(), snapshot(Vec::new())).unwrap();
        let orch = orchestrator(&server, store.clone(), RestorePolicy::default(), CancellationToken::new());

        let report = orch.restore("SN1", None).await.unwrap();
        assert_eq!(report.outcome, RestoreOutcome::Skipped);
        assert_eq!(report.detail.as_deref(), Some("snapshot has no write instructions"));

        let mut next = snapshot(vec![ssid_write()]);
        next.config_hash = "h2".into();
        commit_snapshot(store.as_ref(), next).unwrap();
        store.set_auto_restore("SN1", false).unwrap();
        let report = orch.restore("SN1", None).await.unwrap();
        assert_eq!(report.detail.as_deref(), Some("auto-restore disabled"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejection_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/devices/DEV1/tasks"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad parameter"))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryBackupStore::new());
        commit_snapshot(store.as_ref(), snapshot(vec![ssid_write()])).unwrap();
        store.insert_event(pending_event()).unwrap();
        let orch = orchestrator(&server, store.clone(), RestorePolicy::default(), CancellationToken::new());

        let report = orch.restore("SN1", None).await.unwrap();
        assert_eq!(report.outcome, RestoreOutcome::Failed);
        assert_eq!(report.attempts, 1);
        assert_eq!(store.active_snapshot("SN1").unwrap().unwrap().restore_count, 0);
        assert_eq!(
            store.events(Some("SN1"), 1).unwrap()[0].outcome,
            RestoreOutcome::Failed
        );
    }

    #[tokio::test]
    async fn cancellation_abandons_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/devices/DEV1/tasks"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryBackupStore::new());
        commit_snapshot(store.as_ref(), snapshot(vec![ssid_write()])).unwrap();
        store.insert_event(pending_event()).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let policy = RestorePolicy {
            max_retries: 3,
            backoff_base: Duration::from_secs(60),
            submit_timeout: Duration::from_millis(50),
            connection_request: true,
        };
        let orch = orchestrator(&server, store.clone(), policy, cancel);

        let report = orch.restore("SN1", None).await.unwrap();
        assert_eq!(report.outcome, RestoreOutcome::Failed);
        assert_eq!(report.detail.as_deref(), Some("abandoned"));
        assert_eq!(report.attempts, 1);
        assert_eq!(
            store.events(Some("SN1"), 1).unwrap()[0].detail.as_deref(),
            Some("abandoned")
        );
    }

    #[tokio::test]
    async fn unknown_device_is_looked_up_by_serial() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/devices/"))
            .and(query_param("query", r#"{"_deviceId._SerialNumber":"SN1"}"#))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "_id": "DEV9" }])),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/devices/DEV9/tasks"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryBackupStore::new());
        let mut snap = snapshot(vec![ssid_write()]);
        snap.device_id = None;
        commit_snapshot(store.as_ref(), snap).unwrap();
        let orch = orchestrator(&server, store.clone(), RestorePolicy::default(), CancellationToken::new());

        let report = orch.restore("SN1", None).await.unwrap();
        assert_eq!(report.outcome, RestoreOutcome::Success);
        assert_eq!(report.detail.as_deref(), Some("task queued"));
    }

    #[tokio::test]
    async fn failed_lookup_resolves_the_pending_event() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/devices/"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryBackupStore::new());
        let mut snap = snapshot(vec![ssid_write()]);
        snap.device_id = None;
        commit_snapshot(store.as_ref(), snap).unwrap();
        store.insert_event(pending_event()).unwrap();
        let orch = orchestrator(&server, store.clone(), RestorePolicy::default(), CancellationToken::new());

        let report = orch.restore("SN1", None).await.unwrap();
        assert_eq!(report.outcome, RestoreOutcome::Failed);
        assert_eq!(report.attempts, 0);
        assert!(report.detail.unwrap().starts_with("device lookup failed"));

        let event = store.events(Some("SN1"), 1).unwrap().remove(0);
        assert_eq!(event.outcome, RestoreOutcome::Failed);
        assert!(event.resolved_at.is_some());
        assert!(store.latest_pending_event("SN1").unwrap().is_none());
    }

    #[tokio::test]
    async fn success_counts_the_restore_after_resolving() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/devices/DEV1/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "_id": "t1" })))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryBackupStore::new());
        commit_snapshot(store.as_ref(), snapshot(vec![ssid_write()])).unwrap();
        store.insert_event(pending_event()).unwrap();
        let orch = orchestrator(&server, store.clone(), RestorePolicy::default(), CancellationToken::new());

        let report = orch.restore("SN1", None).await.unwrap();
        assert_eq!(report.outcome, RestoreOutcome::Success);
        assert!(report.event_id.is_some());
        let active = store.active_snapshot("SN1").unwrap().unwrap();
        assert_eq!(active.restore_count, 1);
        assert!(active.last_restored_at.is_some());
        assert_eq!(
            store.events(Some("SN1"), 1).unwrap()[0].outcome,
            RestoreOutcome::Success
        );
    }

    #[test]
    fn task_keeps_instruction_order() {
        let mut writes = vec![ssid_write()];
        writes.push(WriteInstruction {
            path: "InternetGatewayDevice.LANDevice.1.WLANConfiguration.1.Enable".into(),
            value: "true".into(),
            wire_type: WireType::Boolean,
        });
        let task = restore_task(&snapshot(writes));
        let body = serde_json::to_value(&task).unwrap();
        assert_eq!(body["name"], "setParameterValues");
        assert_eq!(body["parameterValues"][1][2], "xsd:boolean");
    }
}
