use crate::format::{DEFAULT_DATE_FORMAT, MESSAGE_ONLY_FORMAT, TIMESTAMPED_FORMAT};
use crate::level::{LevelRegistry, LevelResolution};
use serde::{Deserialize, Serialize};

/// Defines the Logger configuration.
///
/// Every field has a default, so partial documents deserialize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggerConfiguration {
    /// The minimum severity to emit.
    /// Valid values: debug, info, warning, warn, error, critical, fatal.
    /// Any other value disables filtering, see [`LoggerConfiguration::level_resolution`].
    pub log_level: String,

    /// The message template, e.g. "{timestamp} - {level:>7} - {message}"
    pub log_format: String,

    /// A chrono strftime format for the `{timestamp}` placeholder.
    pub log_date_format: String,

    /// The base name used to derive the log file names.
    pub log_name: String,

    pub log_to_console: bool,

    /// The directory holding the log files; created if missing.
    pub log_dir: String,

    /// Whether to write an additional `<log_name>_raw.log` with the bare message text.
    pub log_to_raw: bool,

    // The name of the process-wide channel the sinks are attached to.
    pub logger_name: String,

    /// Whether a fatal message terminates the process.
    pub halt_on_failure: bool,

    /// Whether existing log files are appended to instead of being recreated.
    pub append_to_log: bool,
}

impl Default for LoggerConfiguration {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: MESSAGE_ONLY_FORMAT.to_owned(),
            log_date_format: DEFAULT_DATE_FORMAT.to_owned(),
            log_name: "test".to_owned(),
            log_to_console: true,
            log_dir: ".".to_owned(),
            log_to_raw: false,
            logger_name: "".to_owned(),
            halt_on_failure: true,
            append_to_log: false,
        }
    }
}

impl LoggerConfiguration {
    /// Defaults of the single aggregate file strategy.
    pub fn aggregate() -> Self {
        Self {
            log_format: TIMESTAMPED_FORMAT.to_owned(),
            log_dir: "logs".to_owned(),
            logger_name: "Simple".to_owned(),
            ..Default::default()
        }
    }

    /// Defaults of the one-file-per-level strategy; the raw file is enabled.
    pub fn per_level() -> Self {
        Self {
            log_format: TIMESTAMPED_FORMAT.to_owned(),
            log_dir: "logs".to_owned(),
            log_to_raw: true,
            logger_name: "Multi".to_owned(),
            ..Default::default()
        }
    }

    pub fn level_resolution(&self) -> LevelResolution {
        LevelRegistry::resolve(&self.log_level)
    }
}
