//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays clean for results. `RUST_LOG`, when set,
//! replaces the computed filter entirely.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive for a base level. ONNX Runtime is noisy below `warn`.
fn directives(level: &str) -> String {
    format!("{level},ort=warn")
}

/// Install the global subscriber.
pub fn init(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives(level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Install the subscriber from `[logging]` with CLI overrides applied.
pub fn init_from_config(config: &geolens_core::Config, verbose: bool, json_logs: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    init(level, json_logs || config.logging.format == "json");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_quiet_onnx_runtime() {
        assert_eq!(directives("debug"), "debug,ort=warn");
        assert!(EnvFilter::try_new(directives("info")).is_ok());
    }
}
