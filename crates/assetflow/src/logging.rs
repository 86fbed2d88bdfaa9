use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::ConfigError;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configured level. Records emitted through the
/// `log` facade (the worker thread) are forwarded into the same subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ConfigError::Logging(format!("invalid log level '{}': {}", config.level, e)))?;

    let registry = Registry::default().with(env_filter);
    match config.format {
        LogFormat::Text => {
            let layer = fmt::layer()
                .with_thread_ids(true)
                .with_target(true)
                .with_line_number(true);
            tracing::subscriber::set_global_default(registry.with(layer))
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_thread_ids(true)
                .with_target(true)
                .with_line_number(true)
                .with_current_span(true);
            tracing::subscriber::set_global_default(registry.with(layer))
        }
    }
    .map_err(|e| ConfigError::Logging(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| ConfigError::Logging(e.to_string()))?;
    Ok(())
}
