use crate::config::{ConfigErrors, LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// build the filter, `RUST_LOG` takes precedence over the configured level
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigErrors> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|error| ConfigErrors::InvalidLogFilter(format!("{}: {error}", config.level))),
    }
}

/// install the global tracing subscriber, logs go to stderr to keep stdout for the task
pub fn init(config: &LoggingConfig) -> Result<(), ConfigErrors> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|_| ConfigErrors::LoggerAlreadyInitialized)
}
