//! WebAPI - HTTP Endpoints
//!
//! ## Responsibilities
//!
//! - Capture-and-decide and override routes
//! - Operator read-outs (barrier, audit entries, captured images)
//! - Response formatting

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let barrier = state.barrier.state().await;

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        barrier: barrier.to_string(),
    };

    Json(response)
}
