//! `POST /api/v1/reports/generate`: render a diagnosis as a downloadable PDF.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::input::JsonObject;
use crate::report;
use crate::validation::FieldErrors;

const DEFAULT_PATIENT_NAME: &str = "Patient";

pub async fn generate(JsonObject(body): JsonObject) -> Result<Response, ApiError> {
    let mut errors = FieldErrors::new();

    let diagnosis = match body.get("diagnosis") {
        Some(v @ Value::Object(map)) if !map.is_empty() => Some(v.clone()),
        Some(v @ Value::Array(items)) if !items.is_empty() => Some(v.clone()),
        None | Some(Value::Null) | Some(Value::Object(_)) | Some(Value::Array(_)) => {
            errors.add("diagnosis", "The diagnosis field is required.");
            None
        }
        Some(_) => {
            errors.add("diagnosis", "The diagnosis field must be an array.");
            None
        }
    };

    let patient_name = match body.get("patient_name") {
        None | Some(Value::Null) => DEFAULT_PATIENT_NAME.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => DEFAULT_PATIENT_NAME.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => {
            errors.add("patient_name", "The patient name field must be a string.");
            String::new()
        }
    };

    errors.into_result()?;
    let diagnosis = diagnosis.unwrap_or(Value::Null);

    let now = chrono::Local::now();
    let pdf = tokio::task::spawn_blocking(move || report::generate_report(&patient_name, &diagnosis, &now))
        .await
        .map_err(ApiError::internal("PDF generation failed"))?
        .map_err(ApiError::internal("PDF generation failed"))?;

    let file_name = report::report_file_name(&now);
    info!(bytes = pdf.len(), "Generated diagnosis report");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        pdf,
    )
        .into_response())
}
