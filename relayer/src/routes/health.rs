//! Health and status endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

use crate::state::AppState;
use crate::types::{HealthResponse, StatusResponse};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    (StatusCode::OK, Json(response))
}

/// GET /status
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let response = StatusResponse {
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        verifier_public_key: state.signer().public_key_hex(),
        inputs_attested: state.inputs_attested(),
        uptime_secs: state.uptime_secs(),
    };
    (StatusCode::OK, Json(response))
}
