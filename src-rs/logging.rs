use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::ConfigError;

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured filter.
pub fn init_logging(filter: &str) -> Result<(), ConfigError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter).map_err(|err| ConfigError::Invalid {
            key: "log filter".to_string(),
            reason: err.to_string(),
        })?,
    };

    Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|err| ConfigError::Logging(err.to_string()))
}
