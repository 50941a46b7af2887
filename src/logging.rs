//! Diagnostic logging through the `tracing` ecosystem.
//!
//! Output goes to stderr so command results on stdout stay machine
//! readable. `RUST_LOG` overrides the configured level when set.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the filter for the configured level, preferring `RUST_LOG`
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed, which happens
/// when tests or an embedding application set one up first.
pub fn init_logging(level: &str) -> bool {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(console_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let _ = init_logging("warn");
        assert!(!init_logging("debug"));
    }

    #[test]
    fn test_build_filter_accepts_plain_level() {
        let filter = build_filter("info");
        assert!(!filter.to_string().is_empty());
    }
}
