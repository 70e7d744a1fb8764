//! `POST /api/proxy` handler.

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use tracing::Instrument;

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::relay::ForwardRequest;

/// Parse the forward request, relay it, and turn every outcome into JSON.
pub async fn proxy_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let span = tracing::info_span!("relay", request_id = %request_id(&headers));

    async move {
        let request = match ForwardRequest::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected relay request body");
                metrics::record_relay(
                    metrics::method_label(None),
                    e.status().as_u16(),
                    "rejected",
                    start,
                );
                return (e.status(), Json(e.to_body(state.detailed_errors()))).into_response();
            }
        };

        let method = metrics::method_label(request.method().ok().as_ref());

        match state.relay.forward(request).await {
            Ok(response) => {
                metrics::record_relay(method, response.status.as_u16(), "relayed", start);
                response.into_response()
            }
            Err(e) => {
                let status = e.status();
                if e.is_client_error() {
                    tracing::warn!(status = status.as_u16(), error = %e, "Relay request rejected");
                    metrics::record_relay(method, status.as_u16(), "rejected", start);
                } else {
                    tracing::error!(code = e.code(), error = %e, "Proxy request failed");
                    metrics::record_relay(method, status.as_u16(), "failed", start);
                }
                (status, Json(e.to_body(state.detailed_errors()))).into_response()
            }
        }
    }
    .instrument(span)
    .await
}
