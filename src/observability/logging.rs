//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Pick pretty or JSON output
//! - Apply the configured level unless `RUST_LOG` is set

use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

use crate::config::{Environment, LogFormat, ObservabilityConfig};

/// Install the global subscriber.
pub fn init_logging(
    config: &ObservabilityConfig,
    environment: Environment,
) -> Result<(), TryInitError> {
    let level = &config.log_level;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("api_relay={level},tower_http={level}").into());

    let json = use_json(config.log_format, environment);

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .try_init()
}

fn use_json(format: LogFormat, environment: Environment) -> bool {
    match format {
        LogFormat::Json => true,
        LogFormat::Pretty => false,
        LogFormat::Auto => !environment.is_development(),
    }
}
