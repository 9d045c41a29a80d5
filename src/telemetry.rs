use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialises structured JSON logging on stdout.
/// The level is taken from `RUST_LOG` and defaults to `info`.
/// `log` records (actix's `Logger`, `LoggerMiddleware`) are bridged in by
/// `SubscriberInitExt::init`.
pub fn init_telemetry() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .init();
}

/// Same as [`init_telemetry`] but tolerates an already-installed subscriber.
/// Used by the seed binary and integration tests, which may initialise more
/// than once per process.
pub fn try_init_telemetry(default_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout).json())
        .try_init();
}
