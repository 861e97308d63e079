//! Request body extraction that reports problems as 422 validation errors.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::StatusCode;
use serde_json::{Map, Value};

use crate::api::error::ApiError;
use crate::validation::{bracketed_key, symptoms_from_form, FieldErrors, UploadedImage};

/// A JSON object body. An empty body is treated as `{}`.
#[derive(Debug)]
pub struct JsonObject(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(FieldErrors::single("body", e.body_text())))?;
        parse_object(&bytes).map(JsonObject)
    }
}

pub fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(FieldErrors::single("body", "The request body must be a JSON object.").into()),
        Err(_) => Err(FieldErrors::single("body", "The request body must be valid JSON.").into()),
    }
}

/// Fields of a diagnosis upload form.
#[derive(Debug, Default)]
pub struct DiagnosisForm {
    pub image: Option<UploadedImage>,
    pub symptoms: Option<Value>,
}

/// Read an `image` file part and `symptoms` (JSON text or `symptoms[key]` fields).
pub async fn read_diagnosis_form(mut multipart: Multipart) -> Result<DiagnosisForm, ApiError> {
    let mut form = DiagnosisForm::default();
    let mut symptoms_json: Option<String> = None;
    let mut symptom_fields: Vec<(String, String)> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(upload_failed(e)),
        };
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(upload_failed)?;
            form.image = Some(UploadedImage { file_name, content_type, bytes: bytes.to_vec() });
        } else if name == "symptoms" {
            symptoms_json = Some(field.text().await.map_err(upload_failed)?);
        } else if let Some(key) = bracketed_key(&name, "symptoms") {
            let key = key.to_string();
            let value = field.text().await.map_err(upload_failed)?;
            symptom_fields.push((key, value));
        }
    }

    form.symptoms = symptoms_from_form(symptoms_json.as_deref(), &symptom_fields);
    Ok(form)
}

fn upload_failed(err: MultipartError) -> ApiError {
    tracing::warn!("Failed to read multipart upload: {}", err);
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge;
    }
    FieldErrors::single("image", "The image failed to upload.").into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_an_empty_object() {
        assert!(parse_object(b"").unwrap().is_empty());
        assert!(parse_object(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn object_body_parses() {
        let map = parse_object(br#"{"symptoms": {"itching": "no"}}"#).unwrap();
        assert_eq!(map["symptoms"]["itching"], "no");
    }

    #[test]
    fn non_object_or_broken_json_is_a_validation_error() {
        assert!(matches!(parse_object(b"[1,2]"), Err(ApiError::Validation(_))));
        assert!(matches!(parse_object(b"{oops"), Err(ApiError::Validation(_))));
    }
}
