#![allow(clippy::unwrap_used)]
// Integration tests for `NbiClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cpekeep_acs::{BasicAuth, Error, NbiClient, ParameterValue, Task, WireType};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NbiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = NbiClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn ssid_task() -> Task {
    Task::SetParameterValues {
        parameter_values: vec![ParameterValue::new(
            "Device.WiFi.SSID.1.SSID",
            "Casa",
            WireType::String,
        )],
    }
}

// ── Device queries ──────────────────────────────────────────────────

#[tokio::test]
async fn test_get_device() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices/"))
        .and(query_param("query", r#"{"_id":"DEV-1"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "_id": "DEV-1",
            "_deviceId": { "_SerialNumber": "SN123", "_Manufacturer": "Huawei" }
        }])))
        .mount(&server)
        .await;

    let doc = client.get_device("DEV-1").await.unwrap();
    assert_eq!(doc["_deviceId"]["_SerialNumber"], "SN123");
}

#[tokio::test]
async fn test_get_device_missing() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = client.get_device("DEV-404").await;
    assert!(
        matches!(result, Err(Error::DeviceNotFound { ref device_id }) if device_id == "DEV-404"),
        "expected DeviceNotFound, got: {result:?}"
    );
}

#[tokio::test]
async fn test_basic_auth_is_sent() {
    let (server, client) = setup().await;
    let client = client.with_auth(BasicAuth {
        username: "nbi".into(),
        password: "secret".into(),
    });

    Mock::given(method("GET"))
        .and(path("/devices/"))
        .and(header("authorization", "Basic bmJpOnNlY3JldA=="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "_id": "DEV-1" }])))
        .expect(1)
        .mount(&server)
        .await;

    let doc = client.get_device("DEV-1").await.unwrap();
    assert_eq!(doc["_id"], "DEV-1");
}

#[tokio::test]
async fn test_find_device_by_serial() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices/"))
        .and(query_param("query", r#"{"_deviceId._SerialNumber":"SN123"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "_id": "DEV-1" }])))
        .mount(&server)
        .await;

    let doc = client.find_device_by_serial("SN123").await.unwrap().unwrap();
    assert_eq!(doc["_id"], "DEV-1");

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/devices/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    assert!(client.find_device_by_serial("SN999").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_device_ids() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices/"))
        .and(query_param("projection", "_id"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "_id": "A" }, { "_id": "B" }])),
        )
        .mount(&server)
        .await;

    let ids = client.list_device_ids().await.unwrap();
    assert_eq!(ids, vec!["A".to_owned(), "B".to_owned()]);
}

#[tokio::test]
async fn test_malformed_listing_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let result = client.list_device_ids().await;
    match result {
        Err(Error::Deserialization { body, .. }) => assert!(body.contains("proxy error")),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

// ── Tasks ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_task_accepted() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/devices/DEV-1/tasks"))
        .and(query_param("connection_request", ""))
        .and(body_json(json!({
            "name": "setParameterValues",
            "parameterValues": [["Device.WiFi.SSID.1.SSID", "Casa", "xsd:string"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "task-42",
            "name": "setParameterValues"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ack = client.submit_task("DEV-1", &ssid_task(), true).await.unwrap();
    assert_eq!(ack.task_id.as_deref(), Some("task-42"));
    assert!(!ack.queued);
}

#[tokio::test]
async fn test_submit_task_queued() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/devices/DEV-1/tasks"))
        .respond_with(ResponseTemplate::new(202).set_body_string("Task queued but not processed"))
        .mount(&server)
        .await;

    let ack = client.submit_task("DEV-1", &ssid_task(), false).await.unwrap();
    assert!(ack.queued);
    assert!(ack.task_id.is_none());
}

#[tokio::test]
async fn test_submit_task_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/devices/DEV-1/tasks"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid parameter path"))
        .mount(&server)
        .await;

    let result = client.submit_task("DEV-1", &ssid_task(), true).await;
    match result {
        Err(Error::Rejected { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.contains("Invalid parameter"));
        }
        other => panic!("expected Rejected, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_task_unknown_device() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/devices/GHOST/tasks"))
        .respond_with(ResponseTemplate::new(404).set_body_string("No such device"))
        .mount(&server)
        .await;

    let err = client
        .submit_task("GHOST", &ssid_task(), true)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
