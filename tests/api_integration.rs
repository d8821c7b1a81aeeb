//! API Integration Tests for pingboard
//!
//! Drives the monitor through the HTTP API over a real listener.

use std::time::Duration;

use async_trait::async_trait;
use pingboard::monitor::{MonitorBuilder, MonitorHandles, Settings, TimeMode};
use pingboard::probe::{Probe, ProbeOutcome};
use pingboard::server::{AppState, create_router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

// =============================================================================
// Test Helpers
// =============================================================================

/// Succeeds for targets containing "up", fails otherwise.
struct ScriptedProbe;

#[async_trait]
impl Probe for ScriptedProbe {
    fn kind(&self) -> &str {
        "scripted"
    }

    async fn probe(&self, target: &str) -> ProbeOutcome {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if target.contains("up") {
            ProbeOutcome::Success { latency_ms: 20 }
        } else {
            ProbeOutcome::Failure
        }
    }
}

/// Start test server and return base URL.
async fn start_test_server() -> (String, MonitorHandles) {
    let handles = MonitorBuilder::new(ScriptedProbe)
        .settings(Settings {
            targets: vec!["https://up.test".to_string()],
            interval: Duration::from_secs(1),
            time_mode: TimeMode::Utc,
        })
        .build();
    let router = create_router(AppState {
        monitor: handles.monitor.clone(),
    });

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}", addr), handles)
}

async fn get_state(client: &reqwest::Client, base_url: &str) -> Value {
    client
        .get(format!("{}/api/state", base_url))
        .send()
        .await
        .expect("Failed to fetch state")
        .json()
        .await
        .expect("Failed to parse state")
}

/// Poll the state until no entry is pending.
async fn wait_settled(client: &reqwest::Client, base_url: &str) -> Value {
    for _ in 0..100 {
        let state = get_state(client, base_url).await;
        if state["pending"] == 0 {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("entries never settled");
}

// =============================================================================
// Health Probe Tests
// =============================================================================

#[tokio::test]
async fn test_health_probe() {
    let (base_url, handles) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/healthz", base_url))
        .send()
        .await
        .expect("Failed to send healthz request");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse healthz response");
    assert_eq!(body["status"], "ok");

    handles.shutdown().await.unwrap();
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_full_lifecycle() {
    let (base_url, handles) = start_test_server().await;
    let client = reqwest::Client::new();

    // Start with two targets, one reachable
    let resp = client
        .post(format!("{}/api/start", base_url))
        .json(&json!({
            "targets": [" https://up.test ", "", "https://down.test"],
            "interval": "1s"
        }))
        .send()
        .await
        .expect("Failed to start");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["phase"], "running");
    // Rows are registered before the reply; settlement may already have begun
    assert!(body["pending"].as_u64().unwrap() <= 2);
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);

    // Settlement replaces the pending rows in place
    let state = wait_settled(&client, &base_url).await;
    let entries = state["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    let up = entries.iter().find(|e| e["target"] == "https://up.test").unwrap();
    assert_eq!(up["status"], "Success");
    assert_eq!(up["latency_ms"], 20);
    let down = entries.iter().find(|e| e["target"] == "https://down.test").unwrap();
    assert_eq!(down["status"], "Failure");
    assert!(down["latency_ms"].is_null());

    // Clear is refused while running
    let resp = client
        .post(format!("{}/api/clear", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Export works while running
    let resp = client
        .get(format!("{}/api/export?mode=utc", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let csv = resp.text().await.unwrap();
    assert_eq!(csv.lines().count(), 3);

    // Stop, then clear
    let resp = client
        .post(format!("{}/api/stop", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    wait_settled(&client, &base_url).await;

    let resp = client
        .post(format!("{}/api/clear", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["phase"], "idle");
    assert!(body["entries"].as_array().unwrap().is_empty());

    handles.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_interval_adds_second_cycle() {
    let (base_url, handles) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/start", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    tokio::time::sleep(Duration::from_millis(1_300)).await;
    let state = wait_settled(&client, &base_url).await;
    assert!(state["cycles"].as_u64().unwrap() >= 2);
    assert!(state["entries"].as_array().unwrap().len() >= 2);

    client
        .post(format!("{}/api/stop", base_url))
        .send()
        .await
        .unwrap();
    handles.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_export_csv_chronological() {
    let (base_url, handles) = start_test_server().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/start", base_url))
        .json(&json!({ "targets": ["https://up.test/1", "https://up.test/2"] }))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/api/stop", base_url))
        .send()
        .await
        .unwrap();
    let state = wait_settled(&client, &base_url).await;

    let resp = client
        .get(format!("{}/api/export?mode=utc", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/csv; charset=utf-8"
    );
    let disposition = resp.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"ping-logs-"));
    assert!(disposition.ends_with(".csv\""));

    // Rows are the display order reversed
    let csv = resp.text().await.unwrap();
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    let displayed: Vec<String> = state["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["target"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(rows.len(), displayed.len());
    for (row, target) in rows.iter().zip(displayed.iter().rev()) {
        assert!(row.contains(&format!("\"{}\"", target)));
        assert!(row.ends_with(",20,Success"));
    }

    handles.shutdown().await.unwrap();
}

// =============================================================================
// Validation Tests
// =============================================================================

#[tokio::test]
async fn test_validation_errors() {
    let (base_url, handles) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/start", base_url))
        .json(&json!({ "targets": ["   "] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Please enter at least one server URL.");

    let resp = client
        .get(format!("{}/api/export", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "There are no logs to export.");

    let resp = client
        .post(format!("{}/api/clear", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Nothing changed
    let state = get_state(&client, &base_url).await;
    assert_eq!(state["phase"], "idle");
    assert_eq!(state["settings"]["targets"], json!(["https://up.test"]));

    handles.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_settings_locked_while_running() {
    let (base_url, handles) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}/api/settings", base_url))
        .json(&json!({ "time_mode": "local" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["settings"]["time_mode"], "local");

    client
        .post(format!("{}/api/start", base_url))
        .send()
        .await
        .unwrap();

    let resp = client
        .put(format!("{}/api/settings", base_url))
        .json(&json!({ "time_mode": "utc" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    client
        .post(format!("{}/api/stop", base_url))
        .send()
        .await
        .unwrap();
    handles.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dashboard_served() {
    let (base_url, handles) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(&base_url).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Server Ping Dashboard"));

    let resp = client
        .get(format!("{}/ui/controls", base_url))
        .send()
        .await
        .unwrap();
    let html = resp.text().await.unwrap();
    assert!(html.contains("https://up.test"));
    assert!(html.contains("Start Pinging"));

    handles.shutdown().await.unwrap();
}
