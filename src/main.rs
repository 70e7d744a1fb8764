//! API Relay
//!
//! Server-side relay for browser clients blocked by CORS.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client                 ┌──────────────────────────────────────────────┐
//!     POST /api/proxy ──────▶│ request id → trace → limits → rate limiter   │
//!                            │        │                                      │
//!                            │        ▼                                      │
//!                            │  relay: validate url → allow-list → headers  │──▶ Upstream
//!                            │        │                                      │
//!     JSON response ◀────────│  shape body (JSON / rawResponse) ◀───────────│◀── Upstream
//!                            │                                               │
//!                            │  /health, static files, security headers,    │
//!                            │  CORS, metrics, graceful shutdown             │
//!                            └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use api_relay::config;
use api_relay::http::HttpServer;
use api_relay::lifecycle::{signals, Shutdown};
use api_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "api-relay")]
#[command(about = "Allow-listed HTTP relay for browser clients", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    logging::init_logging(&config.observability, config.server.environment)?;

    tracing::info!("api-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address(),
        environment = ?config.server.environment,
        rate_limit_enabled = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(config.server.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
