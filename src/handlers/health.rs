use axum::response::Json;
use serde_json::{json, Value};

/// `GET /health`: unauthenticated liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
