//! Tracing subscriber setup

use recur_domain::{LoggingConfig, RecurError, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `config.level`. Calling this again after
/// a subscriber is installed is a no-op that returns `Ok(false)`.
///
/// # Errors
/// Returns `RecurError::Config` if the level is not a valid filter directive.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(config, std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())?;

    let installed = if config.json {
        tracing_subscriber::registry().with(filter).with(fmt::layer().json()).try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(fmt::layer()).try_init()
    };
    Ok(installed.is_ok())
}

fn build_filter(config: &LoggingConfig, env_directives: Option<&str>) -> Result<EnvFilter> {
    let directives = env_directives.filter(|d| !d.trim().is_empty()).unwrap_or(&config.level);
    EnvFilter::try_new(directives)
        .map_err(|e| RecurError::Config(format!("Invalid log level '{directives}': {e}")))
}
