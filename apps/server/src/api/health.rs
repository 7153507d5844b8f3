//! Liveness probe.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.pool.get() {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "reachable" })),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": err.to_string() })),
        ),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
