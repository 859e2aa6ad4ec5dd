use tracing_subscriber::prelude::*;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,photo_pins=debug";

/// Install a stdout subscriber.
///
/// Log levels follow `RUST_LOG` when set. Calling this twice is harmless;
/// the second call leaves the first subscriber in place.
pub fn init() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .try_init();
}
