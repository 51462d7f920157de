#![allow(clippy::unwrap_used)]
// End-to-end device passes against a wiremock ACS.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cpekeep_acs::NbiClient;
use cpekeep_core::{
    AcsConfig, BackupStore, CommitOutcome, DeviceHistory, DeviceLifecycle, DeviceTree,
    EngineConfig, MemoryBackupStore, ResetReason, RestoreOutcome, RestorePolicy, commit_snapshot,
    extract,
};

// ── Helpers ─────────────────────────────────────────────────────────

const DEVICE: &str = "00259E-HG8245-SN123";

fn device_doc(uptime: u64, ssid: &str, pppoe_username: Option<&str>) -> Value {
    let username = pppoe_username.map_or(json!({ "_value": "" }), |u| json!({ "_value": u }));
    json!({
        "_id": DEVICE,
        "_deviceId": { "_SerialNumber": "SN123", "_Manufacturer": "Intelbras" },
        "InternetGatewayDevice": {
            "DeviceInfo": { "UpTime": { "_value": uptime } },
            "LANDevice": { "1": { "WLANConfiguration": { "1": {
                "SSID": { "_value": ssid },
                "KeyPassphrase": { "_value": "segredo123" },
                "Channel": { "_value": 6 }
            } } } },
            "WANDevice": { "1": { "WANConnectionDevice": { "1": { "WANPPPConnection": { "1": {
                "Username": username
            } } } } } }
        }
    })
}

async fn setup(policy: RestorePolicy) -> (MockServer, Arc<MemoryBackupStore>, DeviceLifecycle) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = Arc::new(NbiClient::with_client(reqwest::Client::new(), base_url.clone()));
    let store = Arc::new(MemoryBackupStore::new());

    let mut config = EngineConfig::new(AcsConfig::new(base_url));
    config.restore = policy;
    let lifecycle = DeviceLifecycle::new(client, store.clone(), &config, CancellationToken::new());
    (server, store, lifecycle)
}

/// Seed a backup taken while the device was healthy, and a history that
/// remembers its PPPoE login but not its uptime.
fn seed(store: &MemoryBackupStore) {
    let healthy = DeviceTree::from_json(&device_doc(86400, "Casa da Maria", Some("user@isp")));
    commit_snapshot(store, extract(&healthy).unwrap()).unwrap();
    store
        .record_history("SN123", DeviceHistory {
            last_uptime: None,
            last_pppoe_username: Some("user@isp".into()),
            last_seen: Utc::now(),
        })
        .unwrap();
}

async fn mount_device(server: &MockServer, doc: Value) {
    Mock::given(method("GET"))
        .and(path("/devices/"))
        .and(query_param("query", format!(r#"{{"_id":"{DEVICE}"}}"#)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([doc])))
        .mount(server)
        .await;
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_reset_device_is_restored() {
    let (server, store, lifecycle) = setup(RestorePolicy::default()).await;
    seed(&store);
    mount_device(&server, device_doc(300, "default", None)).await;

    Mock::given(method("POST"))
        .and(path(format!("/devices/{DEVICE}/tasks")))
        .and(query_param("connection_request", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "task-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let report = lifecycle.process_device(DEVICE).await.unwrap();

    let reset = report.reset.unwrap();
    assert_eq!(
        reset.signals,
        vec![ResetReason::DefaultSsid, ResetReason::CredentialLoss]
    );
    assert!(matches!(
        reset.reason,
        ResetReason::DefaultSsid | ResetReason::CredentialLoss
    ));

    let restore = report.restore.unwrap();
    assert_eq!(restore.outcome, RestoreOutcome::Success);
    assert_eq!(restore.task_id.as_deref(), Some("task-1"));
    assert!(report.backup.is_none());

    let events = store.events(Some("SN123"), 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, RestoreOutcome::Success);

    let active = store.active_snapshot("SN123").unwrap().unwrap();
    assert_eq!(active.restore_count, 1);
    assert_eq!(active.primary_ssid(), Some("Casa da Maria"));

    // The submitted task carries the stored instructions, in order.
    let requests = server.received_requests().await.unwrap();
    let post = requests.iter().find(|r| r.method.to_string() == "POST").unwrap();
    let body: Value = serde_json::from_slice(&post.body).unwrap();
    assert_eq!(body["name"], "setParameterValues");
    assert_eq!(
        body["parameterValues"][0],
        json!([
            "InternetGatewayDevice.LANDevice.1.WLANConfiguration.1.SSID",
            "Casa da Maria",
            "xsd:string"
        ])
    );
}

#[tokio::test]
async fn test_restore_fails_after_repeated_timeouts() {
    let policy = RestorePolicy {
        max_retries: 1,
        backoff_base: Duration::from_millis(10),
        submit_timeout: Duration::from_millis(100),
        connection_request: true,
    };
    let (server, store, lifecycle) = setup(policy).await;
    seed(&store);
    mount_device(&server, device_doc(300, "default", None)).await;

    Mock::given(method("POST"))
        .and(path(format!("/devices/{DEVICE}/tasks")))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .expect(2)
        .mount(&server)
        .await;

    let report = lifecycle.process_device(DEVICE).await.unwrap();
    let restore = report.restore.unwrap();
    assert_eq!(restore.outcome, RestoreOutcome::Failed);
    assert_eq!(restore.attempts, 2);

    let event = &store.events(Some("SN123"), 1).unwrap()[0];
    assert_eq!(event.outcome, RestoreOutcome::Failed);
    assert!(event.resolved_at.is_some());
    assert_eq!(store.active_snapshot("SN123").unwrap().unwrap().restore_count, 0);
}

#[tokio::test]
async fn test_failed_restore_keeps_the_good_backup() {
    let (server, store, lifecycle) = setup(RestorePolicy::default()).await;
    mount_device(&server, device_doc(86400, "Casa da Maria", Some("user@isp"))).await;
    let healthy = lifecycle.process_device(DEVICE).await.unwrap();
    assert!(matches!(healthy.backup, Some(CommitOutcome::Created { .. })));
    let good = store.active_snapshot("SN123").unwrap().unwrap().id;

    // Factory reset; the ACS rejects the restore task.
    server.reset().await;
    mount_device(&server, device_doc(300, "default", None)).await;
    Mock::given(method("POST"))
        .and(path(format!("/devices/{DEVICE}/tasks")))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;
    let reset = lifecycle.process_device(DEVICE).await.unwrap();
    assert!(reset.reset.is_some());
    assert_eq!(reset.restore.unwrap().outcome, RestoreOutcome::Failed);

    // Next poll in the same boot: no new event and no backup of the
    // factory settings.
    server.reset().await;
    mount_device(&server, device_doc(360, "default", None)).await;
    let again = lifecycle.process_device(DEVICE).await.unwrap();
    assert!(again.reset.is_none());
    assert!(again.restore.is_none());
    assert!(again.backup.is_none());
    assert!(again.backup_suppressed);

    let active = store.active_snapshot("SN123").unwrap().unwrap();
    assert_eq!(active.id, good);
    assert_eq!(active.primary_ssid(), Some("Casa da Maria"));
    assert_eq!(active.wan.username.as_deref(), Some("user@isp"));
    assert_eq!(store.snapshots(Some("SN123"), false).unwrap().len(), 1);
    assert_eq!(store.events(Some("SN123"), 10).unwrap().len(), 1);
}

#[tokio::test]
async fn test_healthy_device_is_backed_up_once() {
    let (server, store, lifecycle) = setup(RestorePolicy::default()).await;
    mount_device(&server, device_doc(86400, "Casa da Maria", Some("user@isp"))).await;

    let first = lifecycle.process_device(DEVICE).await.unwrap();
    assert!(first.reset.is_none());
    let Some(CommitOutcome::Created { id, replaced: None }) = first.backup else {
        panic!("expected a new snapshot, got {:?}", first.backup);
    };

    let second = lifecycle.process_device(DEVICE).await.unwrap();
    assert_eq!(second.backup, Some(CommitOutcome::Unchanged { id }));
    assert_eq!(store.snapshots(Some("SN123"), false).unwrap().len(), 1);
    assert_eq!(
        store.active_snapshot("SN123").unwrap().unwrap().device_id.as_deref(),
        Some(DEVICE)
    );
}

#[tokio::test]
async fn test_backup_only_skips_reset_detection() {
    let (server, store, lifecycle) = setup(RestorePolicy::default()).await;
    seed(&store);
    mount_device(&server, device_doc(300, "Nova Rede", Some("user@isp"))).await;

    let outcome = lifecycle.backup_device(DEVICE).await.unwrap().unwrap();
    assert!(matches!(outcome, CommitOutcome::Created { replaced: Some(_), .. }));
    assert!(store.events(Some("SN123"), 10).unwrap().is_empty());
    assert_eq!(
        store.active_snapshot("SN123").unwrap().unwrap().primary_ssid(),
        Some("Nova Rede")
    );
}

#[tokio::test]
async fn test_fleet_scan_reports_each_device() {
    let (server, store, lifecycle) = setup(RestorePolicy::default()).await;
    mount_device(&server, device_doc(86400, "Casa da Maria", Some("user@isp"))).await;
    Mock::given(method("GET"))
        .and(path("/devices/"))
        .and(query_param("query", r#"{"_id":"GHOST"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let mut results = lifecycle
        .process_fleet(vec![DEVICE.to_owned(), "GHOST".to_owned()])
        .await;
    results.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, DEVICE);
    assert!(results[0].1.is_ok());
    assert_eq!(results[1].0, "GHOST");
    assert!(results[1].1.is_err());
    assert_eq!(store.snapshots(None, true).unwrap().len(), 1);
}
