use env_logger::{Builder, Env};
use log::SetLoggerError;

/// Filter applied when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

/// Builds the process logger and installs it behind the `log` facade.
///
/// Called once from `main`; library code only ever talks to the facade
/// (`log::info!` and friends), so tests run without any logger installed.
pub fn init(default_filter: &str) -> Result<(), SetLoggerError> {
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .format_target(false)
        .try_init()
}
