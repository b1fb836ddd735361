//! Tracing setup for the command-line driver.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter, e.g. `pagebrief=debug`
pub const LOG_ENV: &str = "PAGEBRIEF_LOG";

/// Install a stderr subscriber.
///
/// The filter comes from `PAGEBRIEF_LOG`, then `RUST_LOG`, then `default`.
/// Calling this twice is harmless; the second call keeps the first subscriber.
pub fn init(default: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
