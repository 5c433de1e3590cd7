//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` fmt layer filtered by the configured level.
//! Setting `CHATD_LOG` (any `EnvFilter` directive, e.g. `chatd_ext=debug`)
//! overrides the configured level.

use tracing::info;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{ExtError, Result};

/// Environment variable holding filter directives
pub const LOG_ENV_VAR: &str = "CHATD_LOG";

fn filter_for(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()))
}

/// Install the global subscriber.
///
/// # Errors
/// [`ExtError::ConfigError`] if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = filter_for(config);
    let registry = tracing_subscriber::registry();

    let installed = if config.json_format {
        registry
            .with(fmt::layer().json().with_filter(filter))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_filter(filter))
            .try_init()
    };
    installed
        .map_err(|e| ExtError::ConfigError(format!("Failed to install log subscriber: {e}")))?;

    info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        // another test may already have installed one
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
