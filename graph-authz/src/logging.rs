//! Tracing subscriber setup for binaries and services embedding the engine

use crate::config::LoggingConfig;
use crate::error::{AuthzError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Fails if a global
/// subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AuthzError::Configuration(format!("Invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.json {
        registry
            .with(fmt::layer().with_target(false).with_ansi(false).json())
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()
    };

    result.map_err(|e| AuthzError::Configuration(format!("Tracing already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        // Another test may have installed a subscriber first
        let _ = init_tracing(&config);

        assert!(matches!(
            init_tracing(&config),
            Err(AuthzError::Configuration(_))
        ));
    }
}
