//! Relay response shaping.

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// Marker added to the raw-text fallback in detailed mode.
pub const PARSE_ERROR: &str = "Response is not valid JSON";

/// Body returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelayBody {
    /// Upstream body parsed as JSON, passed through unchanged.
    Json(Value),
    /// Upstream body that is not JSON.
    Raw {
        #[serde(rename = "rawResponse")]
        raw_response: String,
        #[serde(rename = "parseError", skip_serializing_if = "Option::is_none")]
        parse_error: Option<&'static str>,
    },
}

impl RelayBody {
    /// Parse upstream text, falling back to a raw wrapper.
    pub fn from_text(text: String, include_parse_error: bool) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => RelayBody::Json(value),
            Err(e) => {
                tracing::debug!(error = %e, "Upstream body is not JSON");
                RelayBody::Raw {
                    raw_response: text,
                    parse_error: include_parse_error.then_some(PARSE_ERROR),
                }
            }
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, RelayBody::Json(_))
    }
}

/// What the relay sends back: upstream status, shaped body, and any
/// forwarded upstream headers.
#[derive(Debug)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub body: RelayBody,
    pub headers: HeaderMap,
}

impl IntoResponse for ForwardResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        let headers = response.headers_mut();
        for name in self.headers.keys() {
            if headers.contains_key(name) {
                continue;
            }
            for value in self.headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }
        response
    }
}

/// First `max_chars` characters of `text`, for logging.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
