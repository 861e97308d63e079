use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use tracing::warn;

/// Which analysis produced a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosisType {
    Image,
    Symptoms,
    Combined,
}

impl DiagnosisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosisType::Image => "image",
            DiagnosisType::Symptoms => "symptoms",
            DiagnosisType::Combined => "combined",
        }
    }
}

impl fmt::Display for DiagnosisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown diagnosis type: {0}")]
pub struct UnknownDiagnosisType(String);

impl FromStr for DiagnosisType {
    type Err = UnknownDiagnosisType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(DiagnosisType::Image),
            "symptoms" => Ok(DiagnosisType::Symptoms),
            "combined" => Ok(DiagnosisType::Combined),
            other => Err(UnknownDiagnosisType(other.to_string())),
        }
    }
}

impl TryFrom<String> for DiagnosisType {
    type Error = UnknownDiagnosisType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A persisted diagnosis row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Diagnosis {
    pub id: i64,
    pub user_id: Option<i64>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub diagnosis_type: DiagnosisType,
    pub disease: String,
    pub confidence: f64,
    pub severity: Option<String>,
    pub description: Option<String>,
    pub explanation: String,
    pub recommendations: Value,
    pub alternative_diagnoses: Option<Value>,
    pub image_path: Option<String>,
    pub heatmap_path: Option<String>,
    pub symptoms_data: Option<Value>,
    pub analysis_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row values for a diagnosis about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDiagnosis {
    pub user_id: i64,
    pub diagnosis_type: DiagnosisType,
    pub disease: String,
    pub confidence: f64,
    pub severity: Option<String>,
    pub description: Option<String>,
    pub explanation: String,
    pub recommendations: Value,
    pub alternative_diagnoses: Value,
    pub image_path: Option<String>,
    pub heatmap_path: Option<String>,
    pub symptoms_data: Option<Value>,
    pub analysis_method: Option<String>,
}

impl NewDiagnosis {
    /// Map the `diagnosis` object returned by the AI service onto a row.
    pub fn from_ai_result(user_id: i64, diagnosis_type: DiagnosisType, result: &Value) -> NewDiagnosis {
        let text = |key: &str| result.get(key).and_then(Value::as_str).map(str::to_string);
        let json = |key: &str| result.get(key).filter(|v| !v.is_null()).cloned();

        NewDiagnosis {
            user_id,
            diagnosis_type,
            disease: text("disease").unwrap_or_else(|| "Unknown".to_string()),
            confidence: normalize_confidence(result.get("confidence")),
            severity: text("severity"),
            description: text("description"),
            explanation: text("explanation").unwrap_or_default(),
            recommendations: json("recommendations").unwrap_or_else(|| Value::Array(vec![])),
            alternative_diagnoses: json("alternative_diagnoses").unwrap_or_else(|| Value::Array(vec![])),
            image_path: text("image_path"),
            heatmap_path: text("heatmap_path"),
            symptoms_data: json("matched_symptoms"),
            analysis_method: text("analysis_method"),
        }
    }
}

// Confidence must land in [0,1] with three decimals of precision.
fn normalize_confidence(raw: Option<&Value>) -> f64 {
    let value = match raw {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if !value.is_finite() {
        return 0.0;
    }
    if !(0.0..=1.0).contains(&value) {
        warn!("AI service returned out-of-range confidence {}, clamping", value);
    }
    (value.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}

/// An account. Guests are created without a usable password.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_guest: bool,
    pub created_at: DateTime<Utc>,
}

/// Page of results in the envelope the frontend expects.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, current_page: i64, per_page: i64, total: i64) -> Paginated<T> {
        let last_page = if total <= 0 { 1 } else { (total + per_page - 1) / per_page };
        Paginated { data, current_page, per_page, total, last_page }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_full_ai_result() {
        let result = json!({
            "disease": "Melanoma",
            "confidence": 0.8766,
            "severity": "high",
            "description": "Malignant skin cancer",
            "explanation": "Irregular borders detected",
            "recommendations": ["See a dermatologist"],
            "alternative_diagnoses": [{"disease": "Nevus", "confidence": 0.05}],
            "image_path": "uploads/a.jpg",
            "heatmap_path": "heatmaps/a.png",
            "matched_symptoms": {"bleeding": "yes"},
            "analysis_method": "CNN Ensemble"
        });

        let row = NewDiagnosis::from_ai_result(7, DiagnosisType::Combined, &result);
        assert_eq!(row.user_id, 7);
        assert_eq!(row.diagnosis_type, DiagnosisType::Combined);
        assert_eq!(row.disease, "Melanoma");
        assert_eq!(row.confidence, 0.877);
        assert_eq!(row.severity.as_deref(), Some("high"));
        assert_eq!(row.recommendations, json!(["See a dermatologist"]));
        assert_eq!(row.symptoms_data, Some(json!({"bleeding": "yes"})));
        assert_eq!(row.heatmap_path.as_deref(), Some("heatmaps/a.png"));
        assert_eq!(row.analysis_method.as_deref(), Some("CNN Ensemble"));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let row = NewDiagnosis::from_ai_result(1, DiagnosisType::Image, &json!({}));
        assert_eq!(row.disease, "Unknown");
        assert_eq!(row.confidence, 0.0);
        assert_eq!(row.explanation, "");
        assert_eq!(row.recommendations, json!([]));
        assert_eq!(row.alternative_diagnoses, json!([]));
        assert_eq!(row.severity, None);
        assert_eq!(row.symptoms_data, None);
        assert_eq!(row.heatmap_path, None);
    }

    #[test]
    fn null_heatmap_stays_null() {
        let row = NewDiagnosis::from_ai_result(
            1,
            DiagnosisType::Image,
            &json!({"heatmap_path": null, "alternative_diagnoses": null}),
        );
        assert_eq!(row.heatmap_path, None);
        assert_eq!(row.alternative_diagnoses, json!([]));
    }

    #[test]
    fn confidence_is_clamped_into_unit_interval() {
        assert_eq!(normalize_confidence(Some(&json!(1.7))), 1.0);
        assert_eq!(normalize_confidence(Some(&json!(-0.2))), 0.0);
        assert_eq!(normalize_confidence(Some(&json!("0.5"))), 0.5);
        assert_eq!(normalize_confidence(Some(&json!("high"))), 0.0);
        assert_eq!(normalize_confidence(None), 0.0);
    }

    #[test]
    fn diagnosis_type_round_trips_through_text() {
        for ty in [DiagnosisType::Image, DiagnosisType::Symptoms, DiagnosisType::Combined] {
            assert_eq!(ty.as_str().parse::<DiagnosisType>().unwrap(), ty);
        }
        assert!("xray".parse::<DiagnosisType>().is_err());
    }

    #[test]
    fn pagination_computes_last_page() {
        let page: Paginated<u8> = Paginated::new(vec![], 1, 10, 0);
        assert_eq!(page.last_page, 1);
        let page: Paginated<u8> = Paginated::new(vec![], 2, 10, 21);
        assert_eq!(page.last_page, 3);
        let page: Paginated<u8> = Paginated::new(vec![], 1, 10, 10);
        assert_eq!(page.last_page, 1);
    }
}
