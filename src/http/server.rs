//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, panics, limits, CORS,
//!   security headers, rate limiting)
//! - Serve static assets as the fallback
//! - Bind server to listener and shut down gracefully

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{CorsConfig, Environment, ProxyConfig};
use crate::health::health_handler;
use crate::http::deadline::{request_deadline, Deadline};
use crate::http::proxy::proxy_handler;
use crate::http::request::MakeRequestUuidV4;
use crate::http::static_files::static_router;
use crate::relay::{ErrorBody, Relay, RelayError};
use crate::security::{rate_limit_middleware, security_headers, spawn_purge_task, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

impl AppState {
    pub fn detailed_errors(&self) -> bool {
        self.relay.config().detailed_errors
    }
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, RelayError> {
        let relay = Arc::new(Relay::new(config.relay.clone())?);

        tracing::info!(
            domains = ?relay.policy().domains(),
            mode = ?relay.policy().mode(),
            timeout = ?config.relay.timeout(),
            "Relay initialized"
        );

        let limiter = config.rate_limit.enabled.then(|| {
            Arc::new(RateLimiter::new(
                config.rate_limit.clone(),
                config.server.trust_forwarded_for,
            ))
        });

        let state = AppState { relay };
        let router = Self::build_router(&config, state, limiter.clone());

        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &ProxyConfig,
        state: AppState,
        limiter: Option<Arc<RateLimiter>>,
    ) -> Router {
        let deadline = Deadline {
            limit: Duration::from_secs(config.server.request_timeout_secs),
            detailed_errors: state.detailed_errors(),
        };

        let mut router = Router::new()
            .route("/api/proxy", post(proxy_handler))
            .route("/health", get(health_handler))
            .with_state(state);

        if let Some(dir) = &config.server.static_dir {
            router = router.fallback_service(static_router(dir));
        }
        // Must wrap the fallback too: every /api path is counted.
        if let Some(limiter) = limiter {
            router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }
        if config.security.enable_headers {
            router = router.layer(middleware::map_response(security_headers));
        }
        if config.cors.enabled {
            router = router.layer(cors_layer(&config.cors));
        }

        router
            .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
            .layer(middleware::from_fn_with_state(deadline, request_deadline))
            .layer(CatchPanicLayer::custom(panic_response(
                config.server.environment,
            )))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = ?self.config.server.environment,
            "HTTP server starting"
        );
        tracing::info!("Health check: http://{}/health", addr);
        tracing::info!("Proxy endpoint: http://{}/api/proxy", addr);

        if let Some(limiter) = &self.limiter {
            spawn_purge_task(
                limiter.clone(),
                Duration::from_secs(self.config.rate_limit.purge_interval_secs),
                shutdown.resubscribe(),
            );
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(config.allow_credentials)
}

/// Generic 500 for panics. Development builds expose the panic text.
fn panic_response(
    environment: Environment,
) -> impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone + Send + Sync + 'static {
    move |panic: Box<dyn Any + Send + 'static>| {
        let detail = if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "Unknown panic".to_string()
        };
        tracing::error!(panic = %detail, "Request handler panicked");

        let message = if environment.is_development() {
            detail
        } else {
            "Something went wrong".to_string()
        };
        let body = ErrorBody {
            message: Some(message),
            ..ErrorBody::short("Internal server error")
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
