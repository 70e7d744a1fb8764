//! Static asset serving.
//!
//! Files come from the configured directory through `ServeDir`; scripts,
//! stylesheets and pages get fixed content types regardless of what the
//! extension lookup guessed.

use std::path::Path;

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower_http::services::ServeDir;

/// Content type forced for `path`, if any.
pub fn content_type_for(path: &str) -> Option<&'static str> {
    let (_, ext) = path.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "js" => Some("application/javascript"),
        "css" => Some("text/css"),
        "html" => Some("text/html"),
        _ => None,
    }
}

async fn explicit_content_type(request: Request<Body>, next: Next) -> Response {
    let forced = content_type_for(request.uri().path());
    let mut response = next.run(request).await;
    if let Some(content_type) = forced {
        if response.status().is_success() {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }
    response
}

/// Router serving files under `dir`.
pub fn static_router(dir: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(middleware::from_fn(explicit_content_type))
}
