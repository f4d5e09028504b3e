use axum::Json;
use serde_json::{json, Value};

pub const SERVICE_NAME: &str = "databridge-api";

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
