// src/infra/logger.rs — Structured logging with tracing

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `SCRUTINEER_LOG` takes precedence,
/// then `RUST_LOG`, then the caller's default level. Log lines go to
/// stderr so piped answers stay clean.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_env("SCRUTINEER_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}
