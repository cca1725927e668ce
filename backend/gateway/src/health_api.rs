use axum::response::Json;
use serde_json::{json, Value};

/// Health check endpoint.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "cvgate",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
