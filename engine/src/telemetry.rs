//! Telemetry and Observability
//!
//! Handles setting up `tracing-subscriber` for structured logging.
//! Logs go to stderr so the terminal chat keeps stdout to itself.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directives for `log_level`.
///
/// Our crate and the HTTP trace layer follow `log_level`; dependencies are
/// held at `warn` unless `log_level` is stricter.
pub fn filter_directives(log_level: &str) -> String {
    let deps = match log_level {
        "error" => "error",
        _ => "warn",
    };
    format!(
        "{deps},relay_engine={level},relay={level},tower_http={level}",
        deps = deps,
        level = log_level
    )
}

/// Initialize the tracing subscriber.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter.
///
/// In debug builds: pretty-printed terminal output.
/// In release builds: JSON structured output with spans.
pub fn init_telemetry(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(log_level)));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives() {
        assert_eq!(
            filter_directives("debug"),
            "warn,relay_engine=debug,relay=debug,tower_http=debug"
        );
        assert!(filter_directives("error").starts_with("error,"));
        assert!(EnvFilter::try_new(filter_directives("info")).is_ok());
    }
}
