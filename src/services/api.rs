//! JSON request and response types for the settings service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::settings::{FieldSnapshot, FieldValue, FormError};

// ============================================================================
// Response Types
// ============================================================================

/// API response wrapper for consistent JSON structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (present when success=true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present when success=false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// One settings field as returned by `GET /api/settings`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldResponse {
    /// Form control id (`f1`, `f2`, ...)
    pub id: String,
    /// Display label
    pub label: String,
    /// Kind name (`text`, `integer`, `time_span`, ...)
    pub kind: &'static str,
    /// Current value; time spans are seconds, passwords are always `""`
    pub value: FieldValue,
}

impl From<FieldSnapshot<'_>> for FieldResponse {
    fn from(snapshot: FieldSnapshot<'_>) -> Self {
        Self {
            id: snapshot.id.as_str().to_owned(),
            label: snapshot.label.to_owned(),
            kind: snapshot.kind,
            value: snapshot.value,
        }
    }
}

/// A rejected form value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedField {
    /// Form control id
    pub id: String,
    /// Display label
    pub label: String,
    /// Human-readable reason
    pub error: String,
}

impl From<&FormError> for RejectedField {
    fn from(e: &FormError) -> Self {
        Self {
            id: e.id.to_string(),
            label: e.label.to_owned(),
            error: e.error.to_string(),
        }
    }
}

/// Outcome of a settings submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Whether the record was written to storage
    pub saved: bool,
    /// Fields that kept their previous value
    pub rejected: Vec<RejectedField>,
}

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST /api/settings`: form ids mapped to new values.
///
/// Values may be strings, numbers or booleans, so the `value`s of a
/// `GET /api/settings` response can be sent back as they are:
///
/// ```json
/// {"f1": "boiler", "f2": 15, "f3": true}
/// ```
///
/// Absent ids and `null` keep their value, checkboxes included. An empty
/// string keeps a password.
pub type SubmitRequest = HashMap<String, Value>;

/// Converts a [`SubmitRequest`] to the raw text a form post would carry.
///
/// Numbers keep their JSON spelling and booleans become `"on"`/`"off"`.
/// `null` entries are dropped.
///
/// # Errors
///
/// Returns the id of the first array or object value.
pub fn form_values(request: &SubmitRequest) -> Result<HashMap<String, String>, String> {
    let mut values = HashMap::with_capacity(request.len());
    for (id, value) in request {
        let raw = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(true) => "on".to_owned(),
            Value::Bool(false) => "off".to_owned(),
            Value::Array(_) | Value::Object(_) => return Err(id.clone()),
        };
        values.insert(id.clone(), raw);
    }
    Ok(values)
}
