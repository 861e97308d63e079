//! HTTP client for the external AI inference service.
//!
//! Every call issues exactly one request with a fixed timeout. A 2xx answer
//! yields the `diagnosis` object; anything else is surfaced unchanged so the
//! API can relay the upstream status and message.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::validation::UploadedImage;

#[derive(Debug, thiserror::Error)]
pub enum AiServiceError {
    #[error("AI service returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("AI service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("AI service response is missing the diagnosis")]
    MissingDiagnosis,
}

#[derive(Debug, Clone)]
pub struct AiClient {
    base_url: String,
    http: Client,
    image_timeout: Duration,
    symptom_timeout: Duration,
}

impl AiClient {
    pub fn new(base_url: &str, image_timeout: Duration, symptom_timeout: Duration) -> AiClient {
        AiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
            image_timeout,
            symptom_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn analyze_image(&self, image: &UploadedImage) -> Result<Value, AiServiceError> {
        let form = Form::new().part("image", image_part(image)?);
        let res = self
            .http
            .post(format!("{}/api/analyze/image", self.base_url))
            .timeout(self.image_timeout)
            .multipart(form)
            .send()
            .await?;
        extract_diagnosis(res).await
    }

    pub async fn analyze_symptoms(&self, symptoms: &Value) -> Result<Value, AiServiceError> {
        let res = self
            .http
            .post(format!("{}/api/analyze/symptoms", self.base_url))
            .timeout(self.symptom_timeout)
            .json(&json!({ "symptoms": symptoms }))
            .send()
            .await?;
        extract_diagnosis(res).await
    }

    pub async fn analyze_combined(&self, image: &UploadedImage, symptoms: &Value) -> Result<Value, AiServiceError> {
        let form = Form::new()
            .part("image", image_part(image)?)
            .text("symptoms", symptoms.to_string());
        let res = self
            .http
            .post(format!("{}/api/analyze/combined", self.base_url))
            .timeout(self.image_timeout)
            .multipart(form)
            .send()
            .await?;
        extract_diagnosis(res).await
    }
}

fn image_part(image: &UploadedImage) -> Result<Part, AiServiceError> {
    Ok(Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(image.mime())?)
}

async fn extract_diagnosis(res: Response) -> Result<Value, AiServiceError> {
    let status = res.status();
    let body = res.text().await?;
    let parsed: Option<Value> = serde_json::from_str(&body).ok();

    if !status.is_success() {
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("error"))
            .map(|e| match e {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "Unknown error".to_string());
        warn!("AI service answered {}: {}", status, message);
        return Err(AiServiceError::Upstream { status: status.as_u16(), message });
    }

    debug!("AI service answered {}", status);
    match parsed {
        Some(Value::Object(mut obj)) => match obj.remove("diagnosis") {
            Some(diagnosis) if !diagnosis.is_null() => Ok(diagnosis),
            _ => Err(AiServiceError::MissingDiagnosis),
        },
        _ => Err(AiServiceError::MissingDiagnosis),
    }
}

#[cfg(test)]
pub(crate) mod stub {
    //! In-process stand-in for the AI service, served on an ephemeral port.

    use axum::Router;
    use tokio::net::TcpListener;

    pub async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }
}
