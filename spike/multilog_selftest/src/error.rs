use thiserror::Error;

#[derive(Error, Debug)]
pub enum SelftestError {
    #[error("Could not parse the commandline arguments: {0}")]
    ArgumentParseError(#[from] clap::Error),
    #[error("Could not load config file for the selftest: {0}")]
    ConfigError(#[from] config_rs::ConfigError),
    #[error("Could not set up the diagnostics: {message}")]
    DiagnosticsError { message: String },
    #[error("Could not instantiate logger: {0}")]
    LoggerError(#[from] multilog_common_logger::LoggerError),
}
