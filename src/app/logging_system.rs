use super::config::{LogFormat, LogLevel};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, util::TryInitError};

/// Noisy dependencies capped at `warn` unless `RUST_LOG` says otherwise.
const DEFAULT_DIRECTIVES: &[&str] = &["hyper=warn", "reqwest=warn", "rustls=warn", "sled=warn"];

/// Build the filter string for the given base level.
pub fn build_filter_string(level: LogLevel) -> String {
    let mut parts = Vec::with_capacity(DEFAULT_DIRECTIVES.len() + 1);
    parts.push(level.as_str());
    parts.extend_from_slice(DEFAULT_DIRECTIVES);
    parts.join(",")
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Fails if a global subscriber is already installed.
pub fn setup_logging(level: LogLevel, format: LogFormat) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(build_filter_string(level)));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .json()
                    .with_current_span(true),
            )
            .try_init(),
    }
}
