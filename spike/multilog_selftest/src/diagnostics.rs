use crate::error::SelftestError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::subscriber::set_global_default;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, EnvFilter};

/// Where the selftest reports what the logging library does internally.
/// These diagnostics never reach the façade's own sinks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticsConfig {
    /// Sets the diagnostics [`EnvFilter`].
    /// Example of a valid filter: "warn,multilog_common_logger=debug"
    pub level: String,

    /// Determines whether the diagnostics should be printed to standard output.
    pub stdout_output: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { level: "warn".to_owned(), stdout_output: true }
    }
}

/// Routes the `log` records of the library to stdout through a tracing subscriber.
pub fn setup_diagnostics(config: &DiagnosticsConfig) -> Result<(), SelftestError> {
    let env_filter = EnvFilter::from_str(&config.level).map_err(|err| {
        SelftestError::DiagnosticsError {
            message: format!(
                "Cannot parse the diagnostics level: [{}]. err: {:?}",
                config.level, err
            ),
        }
    })?;

    // must stay synchronous, a halting fatal message exits without running destructors
    let stdout_layer = if config.stdout_output {
        Some(Layer::new().with_ansi(false).with_writer(std::io::stdout))
    } else {
        None
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(stdout_layer);

    tracing_log::LogTracer::init().map_err(|err| SelftestError::DiagnosticsError {
        message: format!("Cannot start the LogTracer. err: {:?}", err),
    })?;
    set_global_default(subscriber).map_err(|err| SelftestError::DiagnosticsError {
        message: format!("Cannot start the diagnostics subscriber. err: {:?}", err),
    })
}
