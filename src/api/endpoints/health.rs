use axum::Json;
use serde_json::{json, Value};

/// `GET /api/v1/health`
pub async fn check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "Heal-Io Backend API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
