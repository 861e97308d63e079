//! Diagnosis submission and history.
//!
//! Submissions are validated, forwarded once to the AI service and, when the
//! caller is authenticated, stored. The upstream `diagnosis` object is
//! returned to the client verbatim.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::api::error::ApiError;
use crate::api::input::{read_diagnosis_form, DiagnosisForm, JsonObject};
use crate::api::types::{AppState, AuthUser};
use crate::models::{DiagnosisType, NewDiagnosis};
use crate::repo;
use crate::validation::{validate_image, validate_symptoms, FieldErrors};

const ANALYSIS_FAILED: &str = "Analysis failed";

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub diagnosis: Value,
    pub diagnosis_id: Option<i64>,
}

/// `POST /api/v1/diagnosis/image`
pub async fn analyze_image(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let form = read_form(multipart).await?;

    let mut errors = FieldErrors::new();
    validate_image("image", form.image.as_ref(), &mut errors);
    errors.into_result()?;
    let Some(image) = form.image else {
        return Err(FieldErrors::single("image", "The image field is required.").into());
    };

    let diagnosis = state.ai.analyze_image(&image).await.map_err(|e| {
        error!("Image analysis error: {}", e);
        ApiError::from_ai(ANALYSIS_FAILED, e)
    })?;

    respond(&state, caller, DiagnosisType::Image, diagnosis).await
}

/// `POST /api/v1/diagnosis/symptoms`
pub async fn analyze_symptoms(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    JsonObject(body): JsonObject,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    validate_symptoms("symptoms", body.get("symptoms"), &mut errors);
    errors.into_result()?;
    let symptoms = body.get("symptoms").cloned().unwrap_or(Value::Null);

    let diagnosis = state.ai.analyze_symptoms(&symptoms).await.map_err(|e| {
        error!("Symptom analysis error: {}", e);
        ApiError::from_ai(ANALYSIS_FAILED, e)
    })?;

    respond(&state, caller, DiagnosisType::Symptoms, diagnosis).await
}

/// `POST /api/v1/diagnosis/combined`
pub async fn analyze_combined(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let form = read_form(multipart).await?;

    let mut errors = FieldErrors::new();
    validate_image("image", form.image.as_ref(), &mut errors);
    validate_symptoms("symptoms", form.symptoms.as_ref(), &mut errors);
    errors.into_result()?;
    let (Some(image), Some(symptoms)) = (form.image, form.symptoms) else {
        return Err(FieldErrors::single("image", "The image field is required.").into());
    };

    let diagnosis = state.ai.analyze_combined(&image, &symptoms).await.map_err(|e| {
        error!("Combined analysis error: {}", e);
        ApiError::from_ai(ANALYSIS_FAILED, e)
    })?;

    respond(&state, caller, DiagnosisType::Combined, diagnosis).await
}

async fn read_form(multipart: Result<Multipart, MultipartRejection>) -> Result<DiagnosisForm, ApiError> {
    match multipart {
        Ok(multipart) => read_diagnosis_form(multipart).await,
        // Not a multipart request at all: nothing was uploaded.
        Err(_) => Ok(DiagnosisForm::default()),
    }
}

async fn respond(
    state: &AppState,
    caller: Option<Extension<AuthUser>>,
    diagnosis_type: DiagnosisType,
    diagnosis: Value,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let diagnosis_id = match caller {
        Some(Extension(caller)) => {
            let row = NewDiagnosis::from_ai_result(caller.user.id, diagnosis_type, &diagnosis);
            let saved = repo::insert_diagnosis(&state.pool, &row)
                .await
                .map_err(ApiError::internal(ANALYSIS_FAILED))?;
            info!(diagnosis_id = saved.id, user_id = caller.user.id, kind = %diagnosis_type, "Stored diagnosis");
            Some(saved.id)
        }
        None => None,
    };

    Ok(Json(AnalysisResponse { success: true, diagnosis, diagnosis_id }))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<String>,
}

/// `GET /api/v1/diagnosis/history`
pub async fn history(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = query
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);

    let diagnoses = repo::diagnosis_history(&state.pool, caller.user.id, page)
        .await
        .map_err(ApiError::internal("Failed to retrieve history"))?;

    Ok(Json(json!({"success": true, "diagnoses": diagnoses})))
}

/// `GET /api/v1/diagnosis/:id`
pub async fn detail(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let Ok(id) = id.trim().parse::<i64>() else {
        return Err(ApiError::NotFound("Diagnosis not found"));
    };

    let diagnosis = repo::find_diagnosis(&state.pool, caller.user.id, id)
        .await
        .map_err(ApiError::internal("Failed to retrieve diagnosis"))?
        .ok_or(ApiError::NotFound("Diagnosis not found"))?;

    Ok(Json(json!({"success": true, "diagnosis": diagnosis})))
}
