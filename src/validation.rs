//! Request validation producing per-field error lists.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Maximum accepted image size in kilobytes.
pub const MAX_IMAGE_KB: usize = 10240;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Field name -> list of messages, serialized as a JSON object.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> FieldErrors {
        FieldErrors::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// An uploaded image as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    /// Content type to forward upstream, derived from the file contents.
    pub fn mime(&self) -> &'static str {
        if self.bytes.starts_with(PNG_MAGIC) { "image/png" } else { "image/jpeg" }
    }
}

pub fn validate_image(field: &str, image: Option<&UploadedImage>, errors: &mut FieldErrors) {
    let Some(image) = image else {
        errors.add(field, format!("The {field} field is required."));
        return;
    };

    let is_image = image.bytes.starts_with(JPEG_MAGIC) || image.bytes.starts_with(PNG_MAGIC);
    if !is_image {
        errors.add(field, format!("The {field} field must be an image."));
    }
    if !has_allowed_type(image) {
        errors.add(field, format!("The {field} field must be a file of type: jpeg, jpg, png."));
    }
    if image.bytes.len() > MAX_IMAGE_KB * 1024 {
        errors.add(field, format!("The {field} field must not be greater than {MAX_IMAGE_KB} kilobytes."));
    }
}

fn has_allowed_type(image: &UploadedImage) -> bool {
    let by_extension = image
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| matches!(ext.to_ascii_lowercase().as_str(), "jpeg" | "jpg" | "png"))
        .unwrap_or(false);
    let by_content_type = image
        .content_type
        .as_deref()
        .map(|ct| matches!(ct.to_ascii_lowercase().as_str(), "image/jpeg" | "image/jpg" | "image/png"))
        .unwrap_or(false);
    by_extension || by_content_type
}

/// Symptoms must be a non-empty JSON object or array.
pub fn validate_symptoms(field: &str, symptoms: Option<&Value>, errors: &mut FieldErrors) {
    match symptoms {
        None | Some(Value::Null) => errors.add(field, format!("The {field} field is required.")),
        Some(Value::Object(map)) if map.is_empty() => {
            errors.add(field, format!("The {field} field is required."))
        }
        Some(Value::Array(items)) if items.is_empty() => {
            errors.add(field, format!("The {field} field is required."))
        }
        Some(Value::Object(_)) | Some(Value::Array(_)) => {}
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.add(field, format!("The {field} field is required."))
        }
        Some(_) => errors.add(field, format!("The {field} field must be an array.")),
    }
}

/// Build the symptoms value from multipart text fields.
///
/// Accepts either a single `symptoms` field holding JSON, or bracketed
/// fields such as `symptoms[itching]=no`.
pub fn symptoms_from_form(json_field: Option<&str>, bracketed: &[(String, String)]) -> Option<Value> {
    if let Some(raw) = json_field {
        return Some(serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string())));
    }
    if bracketed.is_empty() {
        return None;
    }
    let map: Map<String, Value> = bracketed
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    Some(Value::Object(map))
}

/// Key inside `symptoms[...]`, if the form field name has that shape.
pub fn bracketed_key<'a>(field_name: &'a str, prefix: &str) -> Option<&'a str> {
    field_name
        .strip_prefix(prefix)?
        .strip_prefix('[')?
        .strip_suffix(']')
        .filter(|key| !key.is_empty())
}

pub fn validate_required_string(field: &str, value: Option<&Value>, max_len: Option<usize>, errors: &mut FieldErrors) -> Option<String> {
    match value {
        None | Some(Value::Null) => {
            errors.add(field, format!("The {field} field is required."));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.add(field, format!("The {field} field is required."));
            None
        }
        Some(Value::String(s)) => {
            if let Some(max) = max_len {
                if s.chars().count() > max {
                    errors.add(field, format!("The {field} field must not be greater than {max} characters."));
                    return None;
                }
            }
            Some(s.trim().to_string())
        }
        Some(_) => {
            errors.add(field, format!("The {field} field must be a string."));
            None
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
