use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::errors::AppError;

/// `RUST_LOG` when set, otherwise the configured level.
pub fn env_filter(default_level: &str) -> Result<EnvFilter, AppError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_level).map_err(|err| {
        AppError::invalid(format!(
            "observability.log_level `{default_level}` is not a valid filter: {err}"
        ))
    })
}

/// Installs the stderr subscriber. Logs go to stderr so binaries can keep stdout for output.
/// A second call in the same process leaves the first subscriber in place.
pub fn init_logging(observability: &ObservabilityConfig) -> Result<(), AppError> {
    let filter = env_filter(&observability.log_level)?;
    let installed = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
