//! Logging initialization and configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "header_session=info";

fn build_filter(directives: Option<&str>) -> EnvFilter {
    match directives {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        _ => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Initialize the logging system.
///
/// `directives` takes precedence over `RUST_LOG`. If neither is usable the
/// filter defaults to `header_session=info`.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init(directives: Option<&str>) {
    tracing_subscriber::registry()
        .with(build_filter(directives))
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

/// Try to initialize the logging system.
///
/// Returns `Err` if logging has already been initialized.
pub fn try_init(directives: Option<&str>) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(build_filter(directives))
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_idempotent() {
        let _ = try_init(None);
        // Second call either errors (already set) or is the first to succeed
        let _ = try_init(Some("debug"));
    }

    #[test]
    fn test_explicit_directives_win() {
        let filter = build_filter(Some("header_session=trace"));
        assert!(filter.to_string().contains("trace"));
    }
}
