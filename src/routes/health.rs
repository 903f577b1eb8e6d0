//! GET /health - liveness probe, no authentication.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::models::ApiResponse;

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<ApiResponse<Value>> {
    Json(ApiResponse::ok(json!({ "status": "ok" })))
}
