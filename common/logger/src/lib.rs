//! A logging façade mapping named severity levels to console and file sinks.
//!
//! Sinks are attached to process-wide channels keyed by name; a
//! [`RoutingStrategy`] decides which files a logger writes:
//! - [`AggregateFileLogger`]: a single `<log_name>.log`
//! - [`PerLevelFileLogger`]: one `<log_name>_<level>.log` per level at or above the floor
//!
//! A fatal message terminates the process unless `halt_on_failure` is unset.

use thiserror::Error;

pub mod channel;
pub mod config;
pub mod format;
pub mod level;
pub mod logger_core;
pub mod sink;
pub mod strategy;

pub use crate::channel::{HandlerRegistry, LoggerInstance};
pub use crate::config::LoggerConfiguration;
pub use crate::level::{LevelRegistry, LevelResolution, Rank};
pub use crate::logger_core::{
    Log, LogFileManifest, LoggerCore, LoggerState, ProcessTerminator, SinkOptions, Terminator,
    DEFAULT_EXIT_CODE,
};
pub use crate::sink::{SinkFactory, SinkHandle, SinkKind};
pub use crate::strategy::{
    AggregateFileLogger, AggregateFileStrategy, Logger, PerLevelFileLogger, PerLevelFileStrategy,
    RoutingStrategy,
};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("LoggerConfigurationError: [{message}]")]
    LoggerConfigurationError { message: String },
    #[error("LoggerFileSystemError: [{message}]")]
    LoggerFileSystemError { message: String },
    #[error("LoggerRuntimeError: [{message}]")]
    LoggerRuntimeError { message: String },
}

impl From<std::io::Error> for LoggerError {
    fn from(error: std::io::Error) -> Self {
        LoggerError::LoggerFileSystemError { message: format!("{}", error) }
    }
}
