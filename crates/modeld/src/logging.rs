//! Log filter setup

use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset or unparsable
pub const DEFAULT_LEVEL: &str = "info";

/// Build the log filter from `RUST_LOG`-style directives
///
/// The directives are used as given, so a bare `debug` lowers every target
/// to debug. Missing or invalid directives fall back to [`DEFAULT_LEVEL`].
pub fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL))
}
