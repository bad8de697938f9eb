use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a `tracing-subscriber` registry with an env-filter (`RUST_LOG`,
/// defaulting to `info`) and ANSI-colored formatting. No OpenTelemetry
/// exporter is wired in; distributed tracing backends are out of scope
/// here.
pub fn init_tracing(name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true));

    if registry.try_init().is_err() {
        tracing::debug!(name, "tracing subscriber already initialized");
    }
}
