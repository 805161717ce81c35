//! HTTP API tests against an in-process router.

use std::future::IntoFuture;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use petfence_core::bluetooth::MockBackend;
use petfence_core::{
    Config, ConfigStore, DeviceScanner, Monitor, PetStatus, ScanResult, SharedConfig, SharedScan,
    SharedStatus, StatusReporter,
};
use petfence_server::api::create_router;
use petfence_server::state::AppState;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::RwLock;

struct Harness {
    server: TestServer,
    store: ConfigStore,
    config: SharedConfig,
    status: SharedStatus,
    last_scan: SharedScan,
    _dir: TempDir,
}

fn harness_with(config: Config) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join("config.json"));
    store.save(&config).unwrap();
    harness_over(dir, store, config)
}

/// Harness over a hand-written configuration file, loaded the way startup does.
fn harness_with_file(content: &str) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::new(dir.path().join("config.json"));
    std::fs::write(store.path(), content).unwrap();
    let config = store.load_or_default();
    harness_over(dir, store, config)
}

fn harness_over(dir: TempDir, store: ConfigStore, config: Config) -> Harness {
    let shared: SharedConfig = Arc::new(RwLock::new(config));
    let status = SharedStatus::new(PetStatus::default());
    let last_scan = SharedScan::new(ScanResult::default());
    let state = AppState::new(
        Arc::clone(&shared),
        store.clone(),
        status.clone(),
        last_scan.clone(),
    );

    Harness {
        server: TestServer::new(create_router(state)).unwrap(),
        store,
        config: shared,
        status,
        last_scan,
        _dir: dir,
    }
}

fn harness() -> Harness {
    harness_with(Config::default())
}

impl Harness {
    async fn tick_with(&self, backend: MockBackend) {
        let scanner = DeviceScanner::new(backend, self.last_scan.clone());
        let mut monitor = Monitor::new(
            Arc::clone(&self.config),
            scanner,
            StatusReporter::new().unwrap(),
            self.status.clone(),
        );
        monitor.tick().await;
    }
}

fn collar(rssi: i16) -> MockBackend {
    MockBackend::new(vec![MockBackend::peripheral(
        Some("COLEIRA_PET"),
        "AA:BB:CC:DD:EE:FF",
        Some(rssi),
    )])
}

#[tokio::test]
async fn test_root_greets() {
    let h = harness();

    let response = h.server.get("/").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["mensagem"], "Hello, World!");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_before_first_tick() {
    let h = harness();

    let response = h.server.get("/status_coleira").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["dentro_do_perimetro"].is_null());
    assert!(body["distancia_aproximada_metros"].is_null());
    assert!(body["rssi"].is_null());
    assert!(body["ultimo_contato_timestamp"].is_null());
    assert_eq!(body["mensagem"], "Waiting for first reading...");
    assert_eq!(body["raio_configurado_metros"], 10.0);
}

#[tokio::test]
async fn test_status_after_tick_inside() {
    let h = harness();
    h.tick_with(collar(-65)).await;

    let body: Value = h.server.get("/status_coleira").await.json();
    assert_eq!(body["dentro_do_perimetro"], true);
    assert_eq!(body["distancia_aproximada_metros"], 2.0);
    assert_eq!(body["rssi"], -65);
    assert!(body["ultimo_contato_timestamp"].as_f64().is_some());
}

#[tokio::test]
async fn test_status_after_tick_outside() {
    let h = harness();
    h.tick_with(collar(-80)).await;

    let body: Value = h.server.get("/status_coleira").await.json();
    assert_eq!(body["dentro_do_perimetro"], false);
    assert_eq!(body["distancia_aproximada_metros"], 11.22);
}

#[tokio::test]
async fn test_status_when_device_unconfigured() {
    let h = harness_with(Config {
        device_name: None,
        device_address: None,
        ..Config::default()
    });
    h.tick_with(collar(-65)).await;

    let response = h.server.get("/status_coleira").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["mensagem"], "Error: device not configured.");
    assert!(body["dentro_do_perimetro"].is_null());
}

#[tokio::test]
async fn test_last_scan() {
    let h = harness();

    let before: Value = h.server.get("/ultimo_scan").await.json();
    assert!(before["rssi"].is_null());
    assert!(before["timestamp"].is_null());

    h.tick_with(collar(-70)).await;

    let after: Value = h.server.get("/ultimo_scan").await.json();
    assert_eq!(after["rssi"], -70);
    assert!(after["timestamp"].as_f64().is_some());
}

#[tokio::test]
async fn test_current_config() {
    let h = harness();

    let response = h.server.get("/configuracao_atual").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["DEVICE_NAME"], "COLEIRA_PET");
    assert!(body["DEVICE_MAC_ADDRESS"].is_null());
    assert_eq!(body["PERIMETER_RADIUS_METERS"], 10.0);
    assert_eq!(body["TX_POWER_AT_1M"], -59.0);
    assert_eq!(body["PATH_LOSS_EXPONENT_N"], 2.0);
    assert_eq!(body["SCAN_INTERVAL_SECONDS"], 5);
}

#[tokio::test]
async fn test_update_radius() {
    let h = harness();

    let response = h
        .server
        .post("/configurar_perimetro")
        .json(&json!({ "raio_metros": 15.5 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["raio_metros"], 15.5);
    assert!(body["mensagem"].as_str().unwrap().contains("15.5"));

    assert_eq!(h.store.load().unwrap().perimeter_radius_m, 15.5);
    assert_eq!(h.config.read().await.perimeter_radius_m, 15.5);

    let status: Value = h.server.get("/status_coleira").await.json();
    assert_eq!(status["raio_configurado_metros"], 15.5);
}

#[tokio::test]
async fn test_update_radius_accepts_numeric_string() {
    let h = harness();

    let response = h
        .server
        .post("/configurar_perimetro")
        .json(&json!({ "raio_metros": "12.5" }))
        .await;
    response.assert_status_ok();
    assert_eq!(h.store.load().unwrap().perimeter_radius_m, 12.5);
}

#[tokio::test]
async fn test_update_radius_applies_to_next_tick() {
    let h = harness();
    h.tick_with(collar(-80)).await;
    let body: Value = h.server.get("/status_coleira").await.json();
    assert_eq!(body["dentro_do_perimetro"], false);

    h.server
        .post("/configurar_perimetro")
        .json(&json!({ "raio_metros": 20 }))
        .await
        .assert_status_ok();
    h.tick_with(collar(-80)).await;

    let body: Value = h.server.get("/status_coleira").await.json();
    assert_eq!(body["dentro_do_perimetro"], true);
}

#[tokio::test]
async fn test_invalid_radius_is_rejected_and_not_saved() {
    let h = harness();

    for invalid in [
        json!({ "raio_metros": -5 }),
        json!({ "raio_metros": 0 }),
        json!({ "raio_metros": "abc" }),
        json!({ "raio_metros": "inf" }),
        json!({ "raio_metros": null }),
        json!({ "radius": 12 }),
        json!({}),
    ] {
        let response = h.server.post("/configurar_perimetro").json(&invalid).await;
        assert_eq!(
            response.status_code(),
            StatusCode::BAD_REQUEST,
            "body {invalid} should be rejected"
        );
        let body: Value = response.json();
        assert!(body["error"].is_string());
        assert!(body["message"].is_string());
    }

    assert_eq!(h.store.load().unwrap().perimeter_radius_m, 10.0);
    assert_eq!(h.config.read().await.perimeter_radius_m, 10.0);
}

#[tokio::test]
async fn test_non_json_body_is_rejected() {
    let h = harness();

    let response = h.server.post("/configurar_perimetro").text("15").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_JSON");

    let response = h
        .server
        .post("/configurar_perimetro")
        .content_type("application/json")
        .bytes("{raio_metros: ".into())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    assert_eq!(h.store.load().unwrap().perimeter_radius_m, 10.0);
}

#[tokio::test]
async fn test_update_radius_keeps_hand_written_keys() {
    let h = harness_with_file(
        r#"{"DEVICE_NAME": "REX", "PERIMETER_RADIUS_METERS": 5, "STATUS_UPDATE_URL": "collector.local/api"}"#,
    );
    assert_eq!(h.config.read().await.device_name.as_deref(), Some("REX"));

    h.server
        .post("/configurar_perimetro")
        .json(&json!({ "raio_metros": 7 }))
        .await
        .assert_status_ok();

    let on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(h.store.path()).unwrap()).unwrap();
    assert_eq!(on_disk["DEVICE_NAME"], "REX");
    assert_eq!(on_disk["STATUS_UPDATE_URL"], "collector.local/api");
    assert_eq!(on_disk["PERIMETER_RADIUS_METERS"], 7.0);

    let body: Value = h.server.get("/configuracao_atual").await.json();
    assert_eq!(body["DEVICE_NAME"], "REX");
    assert_eq!(body["PERIMETER_RADIUS_METERS"], 7.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_updates_leave_file_and_memory_in_step() {
    let h = harness();

    let requests = [3.0, 6.0, 9.0, 12.0].map(|radius| {
        h.server
            .post("/configurar_perimetro")
            .json(&json!({ "raio_metros": radius }))
            .into_future()
    });
    let [a, b, c, d] = requests;
    let (a, b, c, d) = tokio::join!(a, b, c, d);
    for response in [a, b, c, d] {
        response.assert_status_ok();
    }

    let in_memory = h.config.read().await.perimeter_radius_m;
    assert_eq!(h.store.load().unwrap().perimeter_radius_m, in_memory);
    assert!([3.0, 6.0, 9.0, 12.0].contains(&in_memory));
    assert!(!h.store.path().with_file_name("config.json.tmp").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_persist_failure_is_internal_error() {
    let h = harness();
    // A directory where the temporary file should go makes the write fail.
    std::fs::create_dir(h.store.path().with_file_name("config.json.tmp")).unwrap();

    let response = h
        .server
        .post("/configurar_perimetro")
        .json(&json!({ "raio_metros": 30 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(h.config.read().await.perimeter_radius_m, 10.0);
}

#[tokio::test]
async fn test_openapi_document() {
    let h = harness();

    let response = h.server.get("/openapi.json").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["info"]["title"], "petfence API");
    assert!(body["paths"]["/configurar_perimetro"]["post"].is_object());
    assert!(body["paths"]["/status_coleira"]["get"].is_object());
}
