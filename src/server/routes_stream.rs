use crate::server::{AppContext, AppError};
use crate::streaming::{StreamInfo, StreamStatus};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn stream_routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/streams", get(list_streams))
        .route("/stream/start", get(start_stream))
        .route("/stream/stop", post(stop_stream))
        .route("/stream/status", get(stream_status))
        .route("/stream/heartbeat", get(heartbeat))
}

/// Reject missing or blank parameters.
fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AppError::bad_request(format!("{} is required", name))),
    }
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_streams: usize,
}

async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_streams: ctx.registry.active_count(),
    })
}

async fn list_streams(State(ctx): State<AppContext>) -> Json<Vec<StreamInfo>> {
    Json(ctx.registry.list())
}

#[derive(Deserialize)]
struct StartQuery {
    indicator_id: Option<String>,
    rtsp_link: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct StartResponse {
    pub stream_path: String,
    pub status: String,
}

async fn start_stream(
    State(ctx): State<AppContext>,
    Query(params): Query<StartQuery>,
) -> Result<Json<StartResponse>, AppError> {
    let id = required(params.indicator_id, "indicator_id")?;
    let link = required(params.rtsp_link, "rtsp_link")?;

    let stream_path = ctx.registry.start(&id, &link)?;

    Ok(Json(StartResponse {
        stream_path,
        status: "started".to_string(),
    }))
}

#[derive(Deserialize)]
struct StopRequest {
    indicator_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct StopResponse {
    pub status: String,
}

async fn stop_stream(
    State(ctx): State<AppContext>,
    payload: Result<Json<StopRequest>, JsonRejection>,
) -> Result<Json<StopResponse>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let id = required(payload.indicator_id, "indicator_id")?;

    ctx.registry.stop(&id)?;

    Ok(Json(StopResponse {
        status: "stopped".to_string(),
    }))
}

#[derive(Deserialize)]
struct IdQuery {
    indicator_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct StatusResponse {
    pub indicator_id: String,
    pub status: StreamStatus,
}

async fn stream_status(
    State(ctx): State<AppContext>,
    Query(params): Query<IdQuery>,
) -> Result<Json<StatusResponse>, AppError> {
    let id = required(params.indicator_id, "indicator_id")?;
    let status = ctx.registry.status(&id);

    Ok(Json(StatusResponse {
        indicator_id: id,
        status,
    }))
}

#[derive(Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub status: String,
    pub indicator_id: String,
}

async fn heartbeat(
    State(ctx): State<AppContext>,
    Query(params): Query<IdQuery>,
) -> Result<Json<HeartbeatResponse>, AppError> {
    let id = required(params.indicator_id, "indicator_id")?;

    ctx.registry.heartbeat(&id)?;

    Ok(Json(HeartbeatResponse {
        status: "keepalive_updated".to_string(),
        indicator_id: id,
    }))
}
