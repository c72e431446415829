//! HTTP API for weather observations.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use weather_core::{
    NotificationSink, WeatherRecordRequest, WeatherRecordResponse, WeatherService,
    dates::is_valid_date,
};

use crate::{error::ApiError, ws};

/// Header carrying the static API token required for writes.
pub const API_TOKEN_HEADER: &str = "X-Api-Token";

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: WeatherService,
    pub api_token: Arc<str>,
    pub hub: ws::Broadcaster,
    pub sink: Arc<dyn NotificationSink>,
}

impl AppState {
    /// `hub` serves websocket subscriptions; created records go to `sink`,
    /// which in production is the hub itself.
    pub fn new(
        service: WeatherService,
        api_token: impl Into<Arc<str>>,
        hub: ws::Broadcaster,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self { service, api_token: api_token.into(), hub, sink }
    }
}

fn ensure_date(name: &str, value: &str) -> Result<(), ApiError> {
    if is_valid_date(value) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("invalid '{name}' date {value:?}")))
    }
}

/// GET /ping - Liveness check
async fn ping() -> &'static str {
    "Pong"
}

/// GET /weather/{from} - Records for one day
async fn records_for_day(
    State(state): State<AppState>,
    Path(from): Path<String>,
) -> Result<Json<Vec<WeatherRecordResponse>>, ApiError> {
    tracing::info!(%from, "Received request for weather data for single day");
    ensure_date("from", &from)?;

    let records = state.service.get_for_single_day(&from).await?;
    Ok(Json(records))
}

/// GET /weather/{from}/{to} - Records in an inclusive date range
async fn records_for_range(
    State(state): State<AppState>,
    Path((from, to)): Path<(String, String)>,
) -> Result<Json<Vec<WeatherRecordResponse>>, ApiError> {
    tracing::info!(%from, %to, "Received request for weather data for range");
    ensure_date("from", &from)?;
    ensure_date("to", &to)?;

    let records = state.service.get_for_range(&from, &to).await?;
    Ok(Json(records))
}

/// POST /weather - Create one record and notify subscribers
///
/// The token is checked before the body is even decoded.
async fn create_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let token = headers.get(API_TOKEN_HEADER).and_then(|v| v.to_str().ok());
    if token != Some(&*state.api_token) {
        return Err(ApiError::Unauthorized);
    }

    let request: WeatherRecordRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("malformed body: {e}")))?;
    tracing::info!(
        date = ?request.date,
        humidity = ?request.humidity,
        temperature = ?request.temperature,
        "Received record"
    );

    let record = state.service.create(request).await?;

    let payload = serde_json::to_string(&record)
        .map_err(|e| ApiError::Internal(format!("failed to encode record: {e}")))?;

    tracing::debug!(%payload, "Broadcasting record");
    state.sink.publish(&payload);

    Ok((
        StatusCode::CREATED,
        [(header::CONTENT_TYPE, "application/json")],
        payload,
    ))
}

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/weather", post(create_record))
        .route("/weather/{from}", get(records_for_day))
        .route("/weather/{from}/{to}", get(records_for_range))
        .route("/ws/{id}", get(ws::subscribe))
        .with_state(state)
}

/// Run the HTTP server until Ctrl+C
pub async fn run_http_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {e}");
            }
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
