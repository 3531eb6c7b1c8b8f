//! Response decoding boundary.
//!
//! Every response body is decoded exactly once here and classified as either
//! a success payload or an API error. Callers never inspect raw JSON for an
//! `error` key themselves.

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{Result, SharePointError};

/// A decoded response: either the expected payload or the server's error
/// message.
#[derive(Debug)]
pub(crate) enum ApiResponse<T> {
    Success(T),
    Error(String),
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Classifies a raw body. An empty body decodes as JSON `null`, which is
    /// what MERGE and DELETE requests answer with on success.
    pub(crate) fn from_body(status: u16, body: &[u8]) -> Result<Self> {
        let value = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(body).map_err(|source| SharePointError::Parse { status, source })?
        };

        if let Some(message) = error_message(&value) {
            return Ok(Self::Error(message));
        }

        serde_json::from_value(value)
            .map(Self::Success)
            .map_err(|source| SharePointError::Parse { status, source })
    }

    pub(crate) fn into_result(self) -> Result<T> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::Error(message) => Err(SharePointError::Api(message)),
        }
    }
}

/// Extracts the error message from a body, if it carries one.
///
/// OData errors look like `{"error": {"message": {"value": "..."}}}`. The
/// OAuth token endpoints instead answer `{"error": "<code>",
/// "error_description": "..."}`.
fn error_message(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    match error {
        Value::Null => None,
        Value::String(code) => Some(
            value
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or(code)
                .to_string(),
        ),
        other => Some(
            other
                .pointer("/message/value")
                .and_then(Value::as_str)
                .map_or_else(|| other.to_string(), str::to_string),
        ),
    }
}

/// The OData verbose envelope: every success payload sits under `d`.
#[derive(Debug, Deserialize)]
pub(crate) struct Verbose<T> {
    pub d: T,
}

/// Collection payloads nest their entries under `results`.
#[derive(Debug, Deserialize)]
pub(crate) struct Results<T> {
    pub results: Vec<T>,
}
