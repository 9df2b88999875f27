//! API Routes

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::models::Decision;
use crate::state::AppState;

/// Default and maximum page size for /api/entries
const DEFAULT_ENTRY_LIMIT: usize = 50;
const MAX_ENTRY_LIMIT: usize = 500;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Gate
        .route("/capture", post(capture_and_analyze))
        .route("/override", post(override_decision))
        // Barrier
        .route("/api/barrier", get(barrier_status))
        .route("/api/barrier/close", post(close_barrier))
        // Audit trail
        .route("/api/entries", get(list_entries))
        // Captured images
        .route("/api/captures/:name", get(get_capture))
        .with_state(state)
}

// ========================================
// Gate Handlers
// ========================================

#[derive(Debug, Serialize)]
struct CaptureResponse {
    image: String,
    decision: Decision,
    analysis: String,
}

async fn capture_and_analyze(State(state): State<AppState>) -> Result<Response> {
    let image = match state.image_source.capture().await? {
        Some(image) => image,
        None => {
            tracing::error!("Capture failed: no device frame and no sample image");
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to capture image" })),
            )
                .into_response());
        }
    };

    let result = state.decision_system.process_vehicle(&image.path).await?;

    if result.decision.opens_barrier() {
        state.barrier.open().await;
    }

    tracing::info!(
        image = %image.name,
        source = image.source.as_str(),
        decision = %result.decision,
        "Vehicle processed"
    );

    Ok(Json(CaptureResponse {
        image: image.name,
        decision: result.decision,
        analysis: result.analysis,
    })
    .into_response())
}

#[derive(Debug, Deserialize)]
struct OverrideRequest {
    image_path: String,
    decision: Decision,
    reason: String,
    operator_id: String,
}

#[derive(Debug, Serialize)]
struct OverrideResponse {
    status: &'static str,
    decision: Decision,
}

async fn override_decision(
    State(state): State<AppState>,
    payload: std::result::Result<Json<OverrideRequest>, JsonRejection>,
) -> Result<Json<OverrideResponse>> {
    let Json(req) = payload?;
    let decision = state
        .decision_system
        .override_decision(&req.image_path, req.decision, &req.reason, &req.operator_id)
        .await?;

    if decision.opens_barrier() {
        state.barrier.open().await;
    }

    Ok(Json(OverrideResponse {
        status: "success",
        decision,
    }))
}

// ========================================
// Barrier Handlers
// ========================================

async fn barrier_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.barrier.status().await)
}

async fn close_barrier(State(state): State<AppState>) -> impl IntoResponse {
    state.barrier.close().await;
    Json(state.barrier.status().await)
}

// ========================================
// Audit / Capture Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct EntriesQuery {
    limit: Option<usize>,
}

async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<EntriesQuery>,
) -> Result<impl IntoResponse> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ENTRY_LIMIT)
        .clamp(1, MAX_ENTRY_LIMIT);
    let entries = state.decision_system.recent_entries(limit).await?;

    Ok(Json(json!({
        "count": entries.len(),
        "entries": entries
    })))
}

async fn get_capture(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    let path = state.image_source.resolve(&name).await?;
    let data = tokio::fs::read(&path).await?;

    let content_type = if name.to_ascii_lowercase().ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    };

    Ok(([(header::CONTENT_TYPE, content_type)], data))
}
