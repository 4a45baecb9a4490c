use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::ConfigError;

/// Installs a global `fmt` subscriber. `RUST_LOG` takes precedence over the
/// configured level. Returns `Ok(false)` if a subscriber was already set.
pub fn init(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|err| ConfigError::Logging(format!("bad level {:?}: {err}", config.level)))?,
    };

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok();
    Ok(installed)
}
