//! Observability utilities.

use crate::types::ObservabilityConfig;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable switching log output to JSON (`json`).
pub const ENV_LOG_FORMAT: &str = "DESKPILOT_LOG_FORMAT";

static TRACING_INIT: OnceLock<()> = OnceLock::new();

fn json_requested(config: &ObservabilityConfig, env_format: Option<&str>) -> bool {
    match env_format {
        Some(format) => format.eq_ignore_ascii_case("json"),
        None => config.json_logs,
    }
}

/// Initialize the tracing subscriber once for the process.
///
/// `RUST_LOG` wins over the configured level. `DESKPILOT_LOG_FORMAT`
/// wins over `json_logs`.
pub fn init_tracing(config: &ObservabilityConfig) {
    TRACING_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
        let env_format = std::env::var(ENV_LOG_FORMAT).ok();

        let result = if json_requested(config, env_format.as_deref()) {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact())
                .try_init()
        };

        if let Err(err) = result {
            eprintln!("tracing init skipped: {err}");
        }
    });
}
