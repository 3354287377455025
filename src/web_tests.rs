#![cfg(test)]

use super::web::*;
use crate::coordinator::Coordinator;
use crate::entities::EntitySet;
use crate::error::{PrachtError, Result};
use crate::wallbox::{AllData, LockStatus, Side, WallboxApi};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Notify;
use tower::ServiceExt;

struct FakeApi {
    all: Map<String, Value>,
    /// Error returned by every command when set
    command_error: fn() -> Option<PrachtError>,
    /// Lock commands signal the first and wait on the second
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    power: StdMutex<Vec<(i64, i64, i64)>>,
    locks: StdMutex<Vec<Side>>,
}

impl FakeApi {
    fn new(all: Value) -> Self {
        let Value::Object(all) = all else {
            panic!("fixture must be an object")
        };
        Self {
            all,
            command_error: || None,
            gate: None,
            power: StdMutex::new(Vec::new()),
            locks: StdMutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl WallboxApi for FakeApi {
    async fn login(&self, _password: &str) -> Result<String> {
        match (self.command_error)() {
            Some(e) => Err(e),
            None => Ok("key".into()),
        }
    }

    async fn get_all(&self) -> Result<AllData> {
        Ok(AllData::from_json(&self.all))
    }

    async fn get_lock_status(&self) -> Result<LockStatus> {
        Ok(LockStatus::default())
    }

    async fn set_power(&self, total: i64, car1: i64, car2: i64) -> Result<()> {
        self.power.lock().unwrap().push((total, car1, car2));
        Ok(())
    }

    async fn lock(&self, side: Side) -> Result<()> {
        if let Some(e) = (self.command_error)() {
            return Err(e);
        }
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        self.locks.lock().unwrap().push(side);
        Ok(())
    }

    async fn unlock(&self, side: Side) -> Result<()> {
        self.lock(side).await
    }

    async fn get_led_mode(&self) -> Result<i64> {
        Ok(0)
    }

    async fn set_led_mode(&self, _mode: i64) -> Result<()> {
        Ok(())
    }
}

fn duo_fixture() -> Value {
    json!({
        "DeviceId": "PA-WEB",
        "NumChargingPoints": 0,
        "SupportLockUnlock": 1,
        "MaxCurrentTotal": 32,
        "MaxCurrentCar1": 16,
        "MaxCurrentCar2": 16,
        "MaxCurrentPerSide": 16,
        "CurrentSettingInputLead": 32,
        "StatusCar1": 1,
    })
}

async fn state_with(api: Arc<FakeApi>) -> AppState {
    let coordinator = Arc::new(Coordinator::new(
        "web test",
        api.clone(),
        Duration::from_secs(3600),
    ));
    let data = coordinator.refresh().await.unwrap();
    AppState::new(coordinator, EntitySet::from_snapshot(&data, "127.0.0.1"))
}

async fn call(
    state: AppState,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = build_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

#[tokio::test]
async fn health_ok() {
    let state = state_with(Arc::new(FakeApi::new(duo_fixture()))).await;
    let (status, body) = call(state, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn version_reports_package() {
    let state = state_with(Arc::new(FakeApi::new(duo_fixture()))).await;
    let (status, body) = call(state, "GET", "/api/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("pracht-alpha"));
    assert!(body["version"].as_str().unwrap().starts_with(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn status_includes_device_and_snapshot() {
    let state = state_with(Arc::new(FakeApi::new(duo_fixture()))).await;
    let (status, body) = call(state, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], json!(true));
    assert_eq!(body["device"]["model"], json!("Alpha DUO"));
    assert_eq!(body["data"]["all_data"]["device_id"], json!("PA-WEB"));
    assert_eq!(body["status"]["cycles"], json!(1));
}

#[tokio::test]
async fn entities_without_snapshot_is_unavailable() {
    let api = Arc::new(FakeApi::new(duo_fixture()));
    let template = state_with(api.clone()).await;
    let fresh = Arc::new(Coordinator::new("empty", api, Duration::from_secs(3600)));
    let state = AppState {
        coordinator: fresh,
        entities: template.entities,
    };
    let (status, body) = call(state, "GET", "/api/entities", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("No data"));
}

#[tokio::test]
async fn entities_lists_rendered_states() {
    let state = state_with(Arc::new(FakeApi::new(duo_fixture()))).await;
    let (status, body) = call(state, "GET", "/api/entities", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    let connected = list.iter().find(|e| e["key"] == "car1_connected").unwrap();
    assert_eq!(connected["value"], json!(true));
    assert_eq!(connected["unique_id"], json!("PA-WEB_car1_connected"));
    assert!(list.iter().any(|e| e["key"] == "lock_side2"));
}

#[tokio::test]
async fn number_sets_all_limits() {
    let api = Arc::new(FakeApi::new(duo_fixture()));
    let state = state_with(api.clone()).await;
    let (status, _) = call(
        state,
        "POST",
        "/api/number",
        Some(json!({"key": "max_current_car2", "value": 8})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(*api.power.lock().unwrap(), vec![(32, 16, 8)]);
}

#[tokio::test]
async fn number_out_of_range_is_bad_request() {
    let api = Arc::new(FakeApi::new(duo_fixture()));
    let state = state_with(api.clone()).await;
    let (status, body) = call(
        state,
        "POST",
        "/api/number",
        Some(json!({"key": "max_current_total", "value": 40})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(api.power.lock().unwrap().is_empty());
}

#[tokio::test]
async fn switch_locks_side() {
    let api = Arc::new(FakeApi::new(duo_fixture()));
    let state = state_with(api.clone()).await;
    let (status, _) = call(
        state.clone(),
        "POST",
        "/api/switch",
        Some(json!({"key": "lock_side2", "on": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(*api.locks.lock().unwrap(), vec![Side::Second]);

    let (_, body) = call(state, "GET", "/api/entities", None).await;
    let lock = body
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["key"] == "lock_side2")
        .unwrap()
        .clone();
    assert_eq!(lock["value"], json!(true));
}

#[tokio::test]
async fn protocol_errors_hide_device_payload() {
    let mut api = FakeApi::new(duo_fixture());
    api.command_error = || Some(PrachtError::protocol_status(500, "<html>secret stack</html>"));
    let state = state_with(Arc::new(api)).await;
    let (status, body) = call(
        state,
        "POST",
        "/api/switch",
        Some(json!({"key": "lock_side1", "on": false})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("500"));
    assert!(!message.contains("secret"));
}

#[tokio::test]
async fn led_mode_without_support_is_bad_request() {
    let state = state_with(Arc::new(FakeApi::new(duo_fixture()))).await;
    let (status, _) = call(state, "POST", "/api/led_mode", Some(json!({"option": "off"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reauth_with_rejected_password_is_unauthorized() {
    let mut api = FakeApi::new(duo_fixture());
    api.command_error = || Some(PrachtError::auth("Login failed"));
    let state = state_with(Arc::new(api)).await;

    let body = Some(json!({"password": "wrong"}));
    let (status, body) = call(state, "POST", "/api/reauth", body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("Login failed"));
}

#[tokio::test]
async fn reauth_success_is_ok() {
    let state = state_with(Arc::new(FakeApi::new(duo_fixture()))).await;
    let (status, body) = call(state, "POST", "/api/reauth", Some(json!({"password": "new"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn refresh_is_accepted() {
    let state = state_with(Arc::new(FakeApi::new(duo_fixture()))).await;
    let (status, _) = call(state, "POST", "/api/refresh", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn pending_command_does_not_block_reads() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut api = FakeApi::new(duo_fixture());
    api.gate = Some((entered.clone(), release.clone()));
    let api = Arc::new(api);
    let state = state_with(api.clone()).await;

    let command = tokio::spawn(call(
        state.clone(),
        "POST",
        "/api/switch",
        Some(json!({"key": "lock_side1", "on": true})),
    ));
    entered.notified().await;

    let read = tokio::time::timeout(
        Duration::from_secs(1),
        call(state.clone(), "GET", "/api/entities", None),
    )
    .await;
    let (status, _) = read.expect("entities blocked by a pending command");
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(state, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);

    release.notify_one();
    let (status, _) = command.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(*api.locks.lock().unwrap(), vec![Side::First]);
}
