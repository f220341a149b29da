use crate::config::LoggerConfiguration;
use crate::logger_core::{
    Log, LogFileManifest, LoggerCore, LoggerState, ProcessTerminator, SinkOptions, Terminator,
};
use crate::level::LevelRegistry;
use crate::LoggerError;
use log::*;

/// Composes the strategy-specific sinks around a [`LoggerCore`].
pub trait RoutingStrategy {
    /// Used as the default name of the startup announcement.
    fn name(&self) -> &'static str;

    /// Called after the base sinks (console, raw file) are attached.
    fn attach_sinks(&self, core: &mut LoggerCore) -> Result<(), LoggerError>;
}

/// One `<log_name>.log` file receiving every message at or above the configured level.
#[derive(Debug, Default, Clone, Copy)]
pub struct AggregateFileStrategy;

impl RoutingStrategy for AggregateFileStrategy {
    fn name(&self) -> &'static str {
        "AggregateFileStrategy"
    }

    fn attach_sinks(&self, core: &mut LoggerCore) -> Result<(), LoggerError> {
        let path = core.log_path(&format!("{}.log", core.config().log_name));
        core.add_file_sink("default", &path, SinkOptions::default())?;
        Ok(())
    }
}

/// One `<log_name>_<level>.log` file per level at or above the configured level.
///
/// Each file is filtered at its own level as a minimum, so the "error" file
/// also receives "critical" and "fatal" messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct PerLevelFileStrategy;

impl RoutingStrategy for PerLevelFileStrategy {
    fn name(&self) -> &'static str {
        "PerLevelFileStrategy"
    }

    fn attach_sinks(&self, core: &mut LoggerCore) -> Result<(), LoggerError> {
        let floor = core.level_resolution().rank;
        for (level, _) in LevelRegistry::levels_at_or_above(floor) {
            let path = core.log_path(&format!("{}_{}.log", core.config().log_name, level));
            core.add_file_sink(level, &path, SinkOptions::with_level(level))?;
        }
        Ok(())
    }
}

/// A logger wired by a [`RoutingStrategy`].
///
/// Sinks are detached when [`Logger::shutdown`] is called or when the logger is dropped.
pub struct Logger<S: RoutingStrategy> {
    core: LoggerCore,
    strategy: S,
}

pub type AggregateFileLogger = Logger<AggregateFileStrategy>;
pub type PerLevelFileLogger = Logger<PerLevelFileStrategy>;

impl AggregateFileLogger {
    pub fn new(config: LoggerConfiguration) -> Result<Self, LoggerError> {
        Logger::with_strategy(config, AggregateFileStrategy, Box::new(ProcessTerminator))
    }
}

impl PerLevelFileLogger {
    pub fn new(config: LoggerConfiguration) -> Result<Self, LoggerError> {
        Logger::with_strategy(config, PerLevelFileStrategy, Box::new(ProcessTerminator))
    }
}

impl<S: RoutingStrategy> Logger<S> {
    /// Creates the directory, attaches the sinks and announces the logger.
    pub fn with_strategy(
        config: LoggerConfiguration,
        strategy: S,
        terminator: Box<dyn Terminator>,
    ) -> Result<Self, LoggerError> {
        let core = LoggerCore::with_terminator(config, terminator)?;
        let mut logger = Self { core, strategy };
        logger.rebuild()?;
        Ok(logger)
    }

    /// Detaches every sink, then builds and announces a fresh set.
    /// On failure no sink of the partial set stays attached.
    pub fn rebuild(&mut self) -> Result<(), LoggerError> {
        let logger_name = self.core.config().logger_name.clone();
        let attached = self
            .core
            .new_logger(&logger_name)
            .and_then(|_| self.strategy.attach_sinks(&mut self.core));
        if let Err(err) = attached {
            self.core.detach_all()?;
            return Err(err);
        }
        info!(
            "Logger - [{}] attached {} sink(s) to channel [{}]",
            self.strategy.name(),
            self.core.sinks().len(),
            logger_name
        );
        self.core.announce(self.strategy.name());
        Ok(())
    }

    /// Detaches and closes every sink; the directory and configuration are kept.
    pub fn shutdown(&mut self) -> Result<(), LoggerError> {
        self.core.detach_all()
    }

    pub fn init_message(&self, name: Option<&str>) {
        self.core.init_message(Some(name.unwrap_or_else(|| self.strategy.name())))
    }

    pub fn log_files(&self) -> &LogFileManifest {
        self.core.log_files()
    }

    pub fn state(&self) -> LoggerState {
        self.core.state()
    }

    pub fn core(&self) -> &LoggerCore {
        &self.core
    }
}

impl<S: RoutingStrategy> Log for Logger<S> {
    fn log(&self, message: &str, level: &str, exit_code: i32) {
        self.core.log(message, level, exit_code)
    }
}
