//! API error type with the JSON envelope the frontend expects.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::ai_client::AiServiceError;
use crate::validation::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(FieldErrors),
    #[error("AI service error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("Unauthenticated")]
    Unauthorized,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("Upload too large")]
    PayloadTooLarge,
    #[error("{context}: {detail}")]
    Internal { context: &'static str, detail: String },
}

impl ApiError {
    /// Build a closure mapping any displayable error to a 500 with `context` as message.
    pub fn internal<E: std::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> ApiError {
        move |err| ApiError::Internal { context, detail: err.to_string() }
    }

    /// Map an AI client failure: upstream answers are relayed, everything else is a 500.
    pub fn from_ai(context: &'static str, err: AiServiceError) -> ApiError {
        match err {
            AiServiceError::Upstream { status, message } => ApiError::Upstream { status, message },
            other => ApiError::Internal { context, detail: other.to_string() },
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({"success": false, "message": "Validation failed", "errors": errors}),
            ),
            ApiError::Upstream { status, message } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({"success": false, "message": "AI service error", "error": message}),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({"success": false, "message": "Unauthenticated."}),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({"success": false, "message": "Invalid credentials"}),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({"success": false, "message": message}),
            ),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({"success": false, "message": "The uploaded content is too large."}),
            ),
            ApiError::Internal { context, detail } => {
                tracing::error!(detail = %detail, "{context}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"success": false, "message": context, "error": detail}),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn validation_returns_422_with_field_errors() {
        let errors = FieldErrors::single("symptoms", "The symptoms field is required.");
        let response = ApiError::Validation(errors).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Validation failed");
        assert_eq!(json["errors"]["symptoms"][0], "The symptoms field is required.");
    }

    #[tokio::test]
    async fn upstream_status_is_relayed() {
        let response = ApiError::Upstream { status: 400, message: "No image file provided".into() }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["message"], "AI service error");
        assert_eq!(json["error"], "No image file provided");
    }

    #[tokio::test]
    async fn unrepresentable_upstream_status_becomes_502() {
        let response = ApiError::Upstream { status: 42, message: "odd".into() }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn internal_carries_context_and_detail() {
        let response = ApiError::internal("Analysis failed")("connection refused").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Analysis failed");
        assert_eq!(json["error"], "connection refused");
    }

    #[tokio::test]
    async fn auth_errors_return_401() {
        assert_eq!(ApiError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
        let response = ApiError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn not_found_returns_404() {
        let response = ApiError::NotFound("Doctor not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "Doctor not found");
    }

    #[test]
    fn ai_errors_map_by_kind() {
        let relayed = ApiError::from_ai("Analysis failed", AiServiceError::Upstream { status: 503, message: "busy".into() });
        assert!(matches!(relayed, ApiError::Upstream { status: 503, .. }));
        let internal = ApiError::from_ai("Analysis failed", AiServiceError::MissingDiagnosis);
        assert!(matches!(internal, ApiError::Internal { context: "Analysis failed", .. }));
    }
}
