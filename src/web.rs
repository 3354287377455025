//! Axum-based HTTP surface over the coordinator and the entity set

use crate::coordinator::Coordinator;
use crate::entities::EntitySet;
use crate::error::{PrachtError, Result};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub entities: Arc<EntitySet>,
}

impl AppState {
    pub fn new(coordinator: Arc<Coordinator>, entities: EntitySet) -> Self {
        Self {
            coordinator,
            entities: Arc::new(entities),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NumberBody {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct SwitchBody {
    pub key: String,
    pub on: bool,
}

#[derive(Debug, Deserialize)]
pub struct LedModeBody {
    pub option: String,
}

#[derive(Debug, Deserialize)]
pub struct ReauthBody {
    pub password: String,
}

impl IntoResponse for PrachtError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            PrachtError::Validation { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            PrachtError::Auth { .. } => (StatusCode::UNAUTHORIZED, self.to_string()),
            PrachtError::Connection { .. } => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            // Device payloads stay in the log
            PrachtError::Protocol { status, .. } => (
                StatusCode::BAD_GATEWAY,
                match status {
                    Some(code) => format!("Wallbox answered with status {}", code),
                    None => "Unexpected response from the wallbox".to_string(),
                },
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn ok() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn version() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("APP_VERSION"),
    }))
}

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let coordinator = &state.coordinator;
    let device = state.entities.device.clone();
    Json(json!({
        "name": coordinator.name(),
        "update_interval_s": coordinator.update_interval().as_secs_f64(),
        "available": coordinator.is_available(),
        "status": coordinator.status(),
        "device": device,
        "data": coordinator.data().as_deref(),
    }))
}

pub async fn entities(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let data = state
        .coordinator
        .data()
        .ok_or_else(|| PrachtError::connection("No data from the wallbox yet"))?;
    let available = state.coordinator.is_available();
    let states = state.entities.states(&data, available, Instant::now());
    Ok(Json(states))
}

pub async fn set_number(
    State(state): State<AppState>,
    Json(body): Json<NumberBody>,
) -> Result<impl IntoResponse> {
    let data = state
        .coordinator
        .data()
        .ok_or_else(|| PrachtError::connection("No data from the wallbox yet"))?;
    state
        .entities
        .set_number(&body.key, body.value, &data, &state.coordinator)
        .await?;
    Ok(ok())
}

pub async fn set_switch(
    State(state): State<AppState>,
    Json(body): Json<SwitchBody>,
) -> Result<impl IntoResponse> {
    let api = state.coordinator.api();
    state
        .entities
        .set_switch(&body.key, body.on, api.as_ref(), Instant::now())
        .await?;
    Ok(ok())
}

pub async fn set_led_mode(
    State(state): State<AppState>,
    Json(body): Json<LedModeBody>,
) -> Result<impl IntoResponse> {
    let api = state.coordinator.api();
    state
        .entities
        .select_led_mode(&body.option, api.as_ref())
        .await?;
    Ok(ok())
}

pub async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    state.coordinator.request_refresh();
    (StatusCode::ACCEPTED, ok())
}

pub async fn reauth(
    State(state): State<AppState>,
    Json(body): Json<ReauthBody>,
) -> Result<impl IntoResponse> {
    let api = state.coordinator.api();
    crate::setup::reauthenticate(api.as_ref(), &state.coordinator, &body.password).await?;
    Ok(ok())
}

pub async fn events(State(state): State<AppState>) -> impl IntoResponse {
    let stream = WatchStream::new(state.coordinator.subscribe()).filter_map(|snapshot| {
        let data = snapshot?;
        Event::default()
            .event("snapshot")
            .json_data(&*data)
            .ok()
            .map(Ok::<Event, std::convert::Infallible>)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/version", get(version))
        .route("/api/status", get(status))
        .route("/api/entities", get(entities))
        .route("/api/number", post(set_number))
        .route("/api/switch", post(set_switch))
        .route("/api/led_mode", post(set_led_mode))
        .route("/api/refresh", post(refresh))
        .route("/api/reauth", post(reauth))
        .route("/api/events", get(events))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve the API until `shutdown` becomes true or its sender is dropped
pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let router = build_router(state);
    let logger = crate::logging::get_logger("web");

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| PrachtError::web(format!("Cannot bind {}: {}", addr, e)))?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!("Web server listening at http://{}", local_addr));

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .map_err(|e| PrachtError::web(e.to_string()))?;
    logger.info("Web server stopped");
    Ok(())
}
