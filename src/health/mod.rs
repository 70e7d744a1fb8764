//! Liveness endpoint.
//!
//! `GET /health` always answers 200 while the process is serving. It does
//! not probe upstreams.

use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    /// RFC 3339 UTC time with millisecond precision.
    pub timestamp: String,
}

pub async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
