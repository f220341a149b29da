use crate::channel::{HandlerRegistry, LoggerInstance};
use crate::config::LoggerConfiguration;
use crate::format::{LineFormatter, MESSAGE_ONLY_FORMAT};
use crate::level::{LevelRegistry, LevelResolution, Rank, FATAL, IGNORE_LEVEL};
use crate::sink::{SinkFactory, SinkHandle};
use crate::LoggerError;
use chrono::Local;
use log::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_EXIT_CODE: i32 = -1;

/// Logical file key ("default", "raw" or a level name) to absolute path.
pub type LogFileManifest = BTreeMap<String, PathBuf>;

/// Lifecycle of a logger; messages are only written in `Announced` and `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
    Unbuilt,
    DirectoryReady,
    SinksAttached,
    Announced,
    Active,
}

/// The process exit mechanism invoked by a halting fatal message.
pub trait Terminator: Send + Sync {
    fn terminate(&self, exit_code: i32);
}

/// Terminates the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn terminate(&self, exit_code: i32) {
        std::process::exit(exit_code)
    }
}

/// Per-sink overrides; `None` falls back to the logger configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkOptions {
    pub level: Option<String>,
    pub format: Option<String>,
    pub date_format: Option<String>,
}

impl SinkOptions {
    pub fn with_level(level: &str) -> Self {
        Self { level: Some(level.to_owned()), ..Default::default() }
    }

    pub fn raw() -> Self {
        Self { format: Some(MESSAGE_ONLY_FORMAT.to_owned()), ..Default::default() }
    }
}

/// Level-named logging calls.
pub trait Log {
    /// Emits every line of `message` at `level`. A fatal message with
    /// `halt_on_failure` set terminates the process with `exit_code`.
    fn log(&self, message: &str, level: &str, exit_code: i32);

    fn debug(&self, message: &str) {
        self.log(message, "debug", DEFAULT_EXIT_CODE)
    }

    fn info(&self, message: &str) {
        self.log(message, "info", DEFAULT_EXIT_CODE)
    }

    fn warning(&self, message: &str) {
        self.log(message, "warning", DEFAULT_EXIT_CODE)
    }

    fn warn(&self, message: &str) {
        self.warning(message)
    }

    fn error(&self, message: &str) {
        self.log(message, "error", DEFAULT_EXIT_CODE)
    }

    fn critical(&self, message: &str) {
        self.log(message, "critical", DEFAULT_EXIT_CODE)
    }

    fn fatal(&self, message: &str) {
        self.fatal_with_code(message, DEFAULT_EXIT_CODE)
    }

    fn fatal_with_code(&self, message: &str, exit_code: i32) {
        self.log(message, "fatal", exit_code)
    }
}

/// The base logging engine: owns the configuration, the channel handle and the
/// sinks it attached to that channel.
pub struct LoggerCore {
    config: LoggerConfiguration,
    log_dir: PathBuf,
    instance: Option<LoggerInstance>,
    handlers: HandlerRegistry,
    log_files: LogFileManifest,
    state: LoggerState,
    terminator: Box<dyn Terminator>,
}

impl LoggerCore {
    pub fn new(config: LoggerConfiguration) -> Result<Self, LoggerError> {
        Self::with_terminator(config, Box::new(ProcessTerminator))
    }

    /// Prepares the log directory. No sink is attached until [`LoggerCore::new_logger`].
    pub fn with_terminator(
        config: LoggerConfiguration,
        terminator: Box<dyn Terminator>,
    ) -> Result<Self, LoggerError> {
        let mut core = Self {
            log_dir: PathBuf::from(&config.log_dir),
            config,
            instance: None,
            handlers: HandlerRegistry::new(),
            log_files: LogFileManifest::new(),
            state: LoggerState::Unbuilt,
            terminator,
        };
        core.log_dir = SinkFactory::ensure_directory(&core.log_dir)?;
        core.state = LoggerState::DirectoryReady;
        Ok(core)
    }

    /// (Re)binds the core to the channel `logger_name` and attaches the base sinks
    /// (console and raw file, when configured). Previously attached sinks are always
    /// detached first.
    pub fn new_logger(&mut self, logger_name: &str) -> Result<(), LoggerError> {
        self.detach_all()?;

        let floor = self.level_resolution();
        let instance = LoggerInstance::get(logger_name);
        instance.set_floor(floor.rank);
        self.instance = Some(instance);
        self.state = LoggerState::SinksAttached;

        if self.config.log_to_console {
            self.add_console_sink(SinkOptions::default())?;
        }
        if self.config.log_to_raw {
            let path = self.log_path(&format!("{}_raw.log", self.config.log_name));
            self.add_file_sink("raw", &path, SinkOptions::raw())?;
        }
        Ok(())
    }

    pub fn add_console_sink(
        &mut self,
        options: SinkOptions,
    ) -> Result<Arc<SinkHandle>, LoggerError> {
        let (rank, formatter) = self.sink_settings(&options)?;
        let sink = SinkFactory::console_sink(rank, formatter);
        self.attach(sink)
    }

    /// Attaches a file sink at `path` and records it in the manifest under `key`.
    pub fn add_file_sink(
        &mut self,
        key: &str,
        path: &Path,
        options: SinkOptions,
    ) -> Result<Arc<SinkHandle>, LoggerError> {
        let (rank, formatter) = self.sink_settings(&options)?;
        let sink = SinkFactory::file_sink(path, rank, formatter, self.config.append_to_log)?;
        let sink = self.attach(sink)?;
        self.log_files.insert(key.to_owned(), path.to_path_buf());
        Ok(sink)
    }

    /// Detaches and closes every sink this core attached. Safe to call repeatedly.
    pub fn detach_all(&mut self) -> Result<(), LoggerError> {
        if let Some(instance) = &self.instance {
            self.handlers.detach_all(instance)?;
        }
        self.log_files.clear();
        if self.state != LoggerState::Unbuilt {
            self.state = LoggerState::DirectoryReady;
        }
        Ok(())
    }

    /// Writes the startup announcement and marks the logger as active.
    pub fn announce(&mut self, name: &str) {
        if self.state != LoggerState::SinksAttached {
            warn!("LoggerCore - cannot announce [{}] in state {:?}", name, self.state);
            return;
        }
        self.state = LoggerState::Announced;
        self.init_message(Some(name));
        self.state = LoggerState::Active;
    }

    pub fn init_message(&self, name: Option<&str>) {
        let cwd = std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|_| "<unknown>".to_owned());
        self.info(&format!(
            "{} online at {} in {}",
            name.unwrap_or("LoggerCore"),
            Local::now().format("%Y%m%d %H:%M:%S"),
            cwd
        ));
    }

    pub fn log_path(&self, file_name: &str) -> PathBuf {
        self.log_dir.join(file_name)
    }

    pub fn config(&self) -> &LoggerConfiguration {
        &self.config
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log_files(&self) -> &LogFileManifest {
        &self.log_files
    }

    pub fn state(&self) -> LoggerState {
        self.state
    }

    pub fn instance(&self) -> Option<&LoggerInstance> {
        self.instance.as_ref()
    }

    pub fn sinks(&self) -> &[Arc<SinkHandle>] {
        self.handlers.sinks()
    }

    /// Whether the configured minimum level was recognized; an unrecognized one
    /// leaves the logger unfiltered.
    pub fn level_resolution(&self) -> LevelResolution {
        self.config.level_resolution()
    }

    fn attach(&mut self, sink: SinkHandle) -> Result<Arc<SinkHandle>, LoggerError> {
        match &self.instance {
            Some(instance) => Ok(self.handlers.attach(instance, sink)),
            None => Err(LoggerError::LoggerRuntimeError {
                message: "Cannot attach a sink before the logger is built".to_owned(),
            }),
        }
    }

    fn sink_settings(&self, options: &SinkOptions) -> Result<(Rank, LineFormatter), LoggerError> {
        let level = or_configured(options.level.as_deref(), &self.config.log_level);
        let formatter = LineFormatter::new(
            or_configured(options.format.as_deref(), &self.config.log_format),
            or_configured(options.date_format.as_deref(), &self.config.log_date_format),
        )?;
        Ok((LevelRegistry::rank(level), formatter))
    }
}

// An empty override counts as no override.
fn or_configured<'a>(value: Option<&'a str>, configured: &'a str) -> &'a str {
    value.filter(|value| !value.is_empty()).unwrap_or(configured)
}

/// Splits on `\r\n`, `\n` and a lone `\r`; a trailing line break yields no empty line.
pub(crate) fn split_lines(message: &str) -> Vec<&str> {
    let mut lines = vec![];
    let mut rest = message;
    while !rest.is_empty() {
        match rest.find(|c: char| c == '\n' || c == '\r') {
            Some(index) => {
                lines.push(&rest[..index]);
                let separator = if rest[index..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[index + separator..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

impl Log for LoggerCore {
    fn log(&self, message: &str, level: &str, exit_code: i32) {
        if level == IGNORE_LEVEL {
            return;
        }
        let level = if level.is_empty() { self.config.log_level.as_str() } else { level };
        let instance = match (&self.instance, self.state) {
            (Some(instance), LoggerState::Announced) | (Some(instance), LoggerState::Active) => {
                Some(instance)
            }
            _ => {
                debug!("LoggerCore - dropping message in state {:?}", self.state);
                None
            }
        };

        if let Some(instance) = instance {
            let rank = LevelRegistry::rank(level);
            for line in split_lines(message) {
                instance.dispatch(rank, line);
            }
        }

        if level == "fatal" && self.config.halt_on_failure {
            if let Some(instance) = instance {
                instance.dispatch(FATAL, &format!("Exiting {}", exit_code));
                instance.flush();
            }
            self.terminator.terminate(exit_code);
        }
    }
}

impl Drop for LoggerCore {
    fn drop(&mut self) {
        if let Err(err) = self.detach_all() {
            warn!("LoggerCore - cannot detach sinks on drop. err: {}", err);
        }
    }
}

#[cfg(test)]
pub(crate) mod test {

    use super::*;
    use crate::level::{DEBUG, ERROR, NOTSET};
    use std::sync::Mutex;

    #[derive(Default, Clone)]
    pub struct RecordingTerminator {
        pub exit_codes: Arc<Mutex<Vec<i32>>>,
    }

    impl Terminator for RecordingTerminator {
        fn terminate(&self, exit_code: i32) {
            self.exit_codes.lock().unwrap().push(exit_code);
        }
    }

    fn config(dir: &Path) -> LoggerConfiguration {
        LoggerConfiguration {
            log_dir: dir.to_str().unwrap().to_owned(),
            log_to_console: false,
            logger_name: format!("core_{}", rand::random::<u64>()),
            ..Default::default()
        }
    }

    fn active_core(config: LoggerConfiguration, terminator: RecordingTerminator) -> LoggerCore {
        let mut core = LoggerCore::with_terminator(config.clone(), Box::new(terminator)).unwrap();
        core.new_logger(&config.logger_name).unwrap();
        let path = core.log_path("core.log");
        core.add_file_sink("default", &path, SinkOptions::default()).unwrap();
        core.announce("test");
        core
    }

    fn read(core: &LoggerCore) -> String {
        std::fs::read_to_string(core.log_path("core.log")).unwrap()
    }

    #[test]
    fn should_walk_the_lifecycle_states() {
        // Arrange
        let tempdir = tempfile::tempdir().unwrap();
        let config = config(tempdir.path());

        // Act & Assert
        let mut core =
            LoggerCore::with_terminator(config.clone(), Box::new(RecordingTerminator::default()))
                .unwrap();
        assert_eq!(LoggerState::DirectoryReady, core.state());

        core.new_logger(&config.logger_name).unwrap();
        assert_eq!(LoggerState::SinksAttached, core.state());

        core.announce("Lifecycle");
        assert_eq!(LoggerState::Active, core.state());

        core.detach_all().unwrap();
        assert_eq!(LoggerState::DirectoryReady, core.state());
        assert!(core.log_files().is_empty());
    }

    #[test]
    fn should_drop_messages_before_being_active() {
        // Arrange
        let tempdir = tempfile::tempdir().unwrap();
        let config = config(tempdir.path());
        let mut core =
            LoggerCore::with_terminator(config.clone(), Box::new(RecordingTerminator::default()))
                .unwrap();
        core.new_logger(&config.logger_name).unwrap();
        let path = core.log_path("core.log");
        core.add_file_sink("default", &path, SinkOptions::default()).unwrap();

        // Act
        core.info("too early");
        core.announce("Early");
        core.info("in time");

        // Assert
        let content = read(&core);
        assert!(!content.contains("too early"));
        assert!(content.contains("Early online at "));
        assert!(content.ends_with("in time\n"));
    }

    #[test]
    fn ignore_level_should_write_nothing() {
        // Arrange
        let tempdir = tempfile::tempdir().unwrap();
        let core = active_core(config(tempdir.path()), RecordingTerminator::default());
        let before = read(&core);

        // Act
        core.log("hidden", IGNORE_LEVEL, DEFAULT_EXIT_CODE);

        // Assert
        assert_eq!(before, read(&core));
    }

    #[test]
    fn fatal_with_halt_should_write_exit_line_then_terminate() {
        // Arrange
        let tempdir = tempfile::tempdir().unwrap();
        let terminator = RecordingTerminator::default();
        let core = active_core(config(tempdir.path()), terminator.clone());

        // Act
        core.fatal_with_code("boom", 3);

        // Assert
        assert!(read(&core).ends_with("boom\nExiting 3\n"));
        assert_eq!(vec![3], *terminator.exit_codes.lock().unwrap());
    }

    #[test]
    fn fatal_should_use_the_default_exit_code() {
        // Arrange
        let tempdir = tempfile::tempdir().unwrap();
        let terminator = RecordingTerminator::default();
        let core = active_core(config(tempdir.path()), terminator.clone());

        // Act
        core.fatal("boom");

        // Assert
        assert!(read(&core).ends_with("Exiting -1\n"));
        assert_eq!(vec![DEFAULT_EXIT_CODE], *terminator.exit_codes.lock().unwrap());
    }

    #[test]
    fn fatal_without_halt_should_return_and_keep_logging() {
        // Arrange
        let tempdir = tempfile::tempdir().unwrap();
        let terminator = RecordingTerminator::default();
        let config = LoggerConfiguration { halt_on_failure: false, ..config(tempdir.path()) };
        let core = active_core(config, terminator.clone());

        // Act
        core.fatal("not dying");
        core.error("still here");

        // Assert
        let content = read(&core);
        assert!(content.ends_with("not dying\nstill here\n"));
        assert!(!content.contains("Exiting"));
        assert!(terminator.exit_codes.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_floor_should_disable_filtering() {
        // Arrange
        let tempdir = tempfile::tempdir().unwrap();
        let config = LoggerConfiguration { log_level: "inof".to_owned(), ..config(tempdir.path()) };
        let core = active_core(config, RecordingTerminator::default());

        // Act
        core.debug("debug is visible");

        // Assert
        assert!(!core.level_resolution().recognized);
        assert_eq!(NOTSET, core.instance().unwrap().floor());
        assert!(read(&core).contains("debug is visible"));
    }

    #[test]
    fn unknown_call_site_level_should_be_filtered_by_a_known_floor() {
        // Arrange
        let tempdir = tempfile::tempdir().unwrap();
        let core = active_core(config(tempdir.path()), RecordingTerminator::default());

        // Act
        core.log("mistyped", "eror", DEFAULT_EXIT_CODE);

        // Assert
        assert!(!read(&core).contains("mistyped"));
    }

    #[test]
    fn sink_options_should_override_the_configuration() {
        // Arrange
        let tempdir = tempfile::tempdir().unwrap();
        let config = LoggerConfiguration { log_level: "debug".to_owned(), ..config(tempdir.path()) };
        let mut core = active_core(config, RecordingTerminator::default());
        let path = core.log_path("errors.log");

        // Act
        let sink = core
            .add_file_sink(
                "errors",
                &path,
                SinkOptions {
                    level: Some("error".to_owned()),
                    format: Some("[{level}] {message}".to_owned()),
                    date_format: None,
                },
            )
            .unwrap();
        core.info("info line");
        core.error("error line");

        // Assert
        assert_eq!(ERROR, sink.min_rank());
        assert_eq!(DEBUG, core.sinks()[0].min_rank());
        assert_eq!("[ERROR] error line\n", std::fs::read_to_string(&path).unwrap());
        assert_eq!(Some(&path), core.log_files().get("errors"));
    }

    #[test]
    fn should_split_lines_on_every_line_break() {
        assert_eq!(vec!["a", "b", "c", "d"], split_lines("a\nb\r\nc\rd"));
        assert_eq!(vec!["a", "", "b"], split_lines("a\n\nb"));
        assert_eq!(vec!["a"], split_lines("a\r\n"));
        assert_eq!(vec![""], split_lines("\r"));
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn empty_level_should_fall_back_to_the_configured_level() {
        // Arrange
        let tempdir = tempfile::tempdir().unwrap();
        let config = LoggerConfiguration { log_level: "error".to_owned(), ..config(tempdir.path()) };
        let mut core = active_core(config, RecordingTerminator::default());
        let path = core.log_path("empty.log");

        // Act
        let sink = core
            .add_file_sink(
                "empty",
                &path,
                SinkOptions {
                    level: Some("".to_owned()),
                    format: Some("".to_owned()),
                    date_format: Some("".to_owned()),
                },
            )
            .unwrap();
        core.log("at the configured level", "", DEFAULT_EXIT_CODE);

        // Assert
        assert_eq!(ERROR, sink.min_rank());
        assert_eq!("at the configured level\n", std::fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn attaching_before_new_logger_should_fail() {
        let tempdir = tempfile::tempdir().unwrap();
        let mut core = LoggerCore::with_terminator(
            config(tempdir.path()),
            Box::new(RecordingTerminator::default()),
        )
        .unwrap();
        assert!(core.add_console_sink(SinkOptions::default()).is_err());
    }

    #[test]
    fn drop_should_detach_the_sinks() {
        // Arrange
        let tempdir = tempfile::tempdir().unwrap();
        let core = active_core(config(tempdir.path()), RecordingTerminator::default());
        let instance = core.instance().unwrap().clone();
        assert_eq!(1, instance.sink_count());

        // Act
        drop(core);

        // Assert
        assert_eq!(0, instance.sink_count());
    }
}
