//! Doctor directory endpoints.

use axum::extract::{Path, Query};
use axum::Json;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::doctors::{self, DoctorQuery, DIRECTORY};

/// `GET /api/v1/doctors/search`
pub async fn search(Query(query): Query<DoctorQuery>) -> Json<Value> {
    let found = doctors::search(&DIRECTORY, &query);
    Json(json!({
        "success": true,
        "total": found.len(),
        "doctors": found,
    }))
}

/// `GET /api/v1/doctors/:id`
pub async fn detail(Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = id.trim().parse::<i64>().unwrap_or(0);
    let doctor = doctors::find(&DIRECTORY, id).ok_or(ApiError::NotFound("Doctor not found"))?;
    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
    })))
}
