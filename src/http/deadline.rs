//! Overall request deadline.
//!
//! Requests that outlive the deadline are answered with the relay's JSON
//! timeout failure instead of an empty body.

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::relay::RelayError;

/// Deadline settings shared by every request.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    pub limit: Duration,
    pub detailed_errors: bool,
}

/// Cancel the inner service once `limit` has passed.
pub async fn request_deadline(
    State(deadline): State<Deadline>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    match tokio::time::timeout(deadline.limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                path = %path,
                timeout_ms = deadline.limit.as_millis() as u64,
                "Request exceeded deadline"
            );
            let err = RelayError::DeadlineExceeded(deadline.limit);
            (err.status(), Json(err.to_body(deadline.detailed_errors))).into_response()
        }
    }
}
