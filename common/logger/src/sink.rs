use crate::format::LineFormatter;
use crate::level::{LevelRegistry, Rank};
use crate::LoggerError;
use log::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq)]
pub enum SinkKind {
    Console,
    File(PathBuf),
}

type SinkWriter = Box<dyn Write + Send>;

/// One attached output destination with its own minimum severity and formatter.
///
/// The underlying writer is released by [`SinkHandle::close`]; a closed sink
/// refuses further writes.
pub struct SinkHandle {
    id: u64,
    kind: SinkKind,
    min_rank: Rank,
    formatter: LineFormatter,
    writer: Mutex<Option<SinkWriter>>,
}

impl SinkHandle {
    fn new(kind: SinkKind, min_rank: Rank, formatter: LineFormatter, writer: SinkWriter) -> Self {
        Self {
            id: NEXT_SINK_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            min_rank,
            formatter,
            writer: Mutex::new(Some(writer)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &SinkKind {
        &self.kind
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.kind {
            SinkKind::File(path) => Some(path),
            SinkKind::Console => None,
        }
    }

    pub fn min_rank(&self) -> Rank {
        self.min_rank
    }

    /// Minimum-threshold filter: a sink at "error" also admits "critical" and "fatal".
    pub fn admits(&self, rank: Rank) -> bool {
        rank >= self.min_rank
    }

    /// Formats one line and writes it with a single write call.
    pub fn emit(&self, rank: Rank, message: &str) -> Result<(), LoggerError> {
        let mut line = self.formatter.format(rank, message);
        line.push('\n');
        let mut writer = self.lock_writer();
        let writer = writer.as_mut().ok_or_else(|| self.closed_error())?;
        writer.write_all(line.as_bytes())?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), LoggerError> {
        match self.lock_writer().as_mut() {
            Some(writer) => Ok(writer.flush()?),
            None => Ok(()),
        }
    }

    /// Flushes and releases the writer. Calling it again is a no-op.
    pub fn close(&self) -> Result<(), LoggerError> {
        let writer = self.lock_writer().take();
        if let Some(mut writer) = writer {
            debug!("SinkHandle - closing sink [{}] {:?}", self.id, self.kind);
            writer.flush()?;
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.lock_writer().is_none()
    }

    fn lock_writer(&self) -> MutexGuard<'_, Option<SinkWriter>> {
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn closed_error(&self) -> LoggerError {
        LoggerError::LoggerRuntimeError {
            message: format!("Sink [{}] {:?} is already closed", self.id, self.kind),
        }
    }
}

impl std::fmt::Debug for SinkHandle {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("SinkHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("min_rank", &self.min_rank)
            .finish()
    }
}

/// Creates console and file sinks and bootstraps their directory.
pub struct SinkFactory;

impl SinkFactory {
    /// Makes sure `path` is a directory and returns its absolute form.
    /// A plain file found at `path` is removed and replaced by a directory.
    pub fn ensure_directory(path: &Path) -> Result<PathBuf, LoggerError> {
        if path.exists() && !path.is_dir() {
            warn!("SinkFactory - [{}] is not a directory; removing it", path.display());
            std::fs::remove_file(path).map_err(|err| fs_error("remove", path, err))?;
        }
        if !path.exists() {
            info!("SinkFactory - creating log directory [{}]", path.display());
            std::fs::create_dir_all(path).map_err(|err| fs_error("create", path, err))?;
        }
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(std::env::current_dir()?.join(path))
        }
    }

    /// Builds a sink writing to the standard error stream.
    pub fn build_console_sink(
        min_level: &str,
        format: &str,
        date_format: &str,
    ) -> Result<SinkHandle, LoggerError> {
        let formatter = LineFormatter::new(format, date_format)?;
        Ok(Self::console_sink(LevelRegistry::rank(min_level), formatter))
    }

    /// Builds a sink writing to the file at `path`.
    ///
    /// Without `append`, an existing file is deleted before being recreated, so
    /// permissions and links of the previous file are intentionally not preserved.
    pub fn build_file_sink(
        path: &Path,
        min_level: &str,
        format: &str,
        date_format: &str,
        append: bool,
    ) -> Result<SinkHandle, LoggerError> {
        let formatter = LineFormatter::new(format, date_format)?;
        Self::file_sink(path, LevelRegistry::rank(min_level), formatter, append)
    }

    pub(crate) fn console_sink(min_rank: Rank, formatter: LineFormatter) -> SinkHandle {
        SinkHandle::new(SinkKind::Console, min_rank, formatter, Box::new(std::io::stderr()))
    }

    pub(crate) fn file_sink(
        path: &Path,
        min_rank: Rank,
        formatter: LineFormatter,
        append: bool,
    ) -> Result<SinkHandle, LoggerError> {
        if !append && path.exists() {
            debug!("SinkFactory - removing previous log file [{}]", path.display());
            std::fs::remove_file(path).map_err(|err| fs_error("remove", path, err))?;
        }
        let (dir, filename) = path_to_dir_and_filename(path)?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(filename)
            .build(&dir)
            .map_err(|err| LoggerError::LoggerFileSystemError {
                message: format!("Cannot open the log file [{}]. err: {:?}", path.display(), err),
            })?;
        Ok(SinkHandle::new(SinkKind::File(path.to_path_buf()), min_rank, formatter, Box::new(appender)))
    }
}

fn path_to_dir_and_filename(full_path: &Path) -> Result<(PathBuf, String), LoggerError> {
    match (full_path.parent(), full_path.file_name().and_then(|name| name.to_str())) {
        (Some(dir), Some(filename)) => {
            let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
            Ok((dir.to_path_buf(), filename.to_owned()))
        }
        _ => Err(LoggerError::LoggerConfigurationError {
            message: format!("Output file path [{}] is wrong", full_path.display()),
        }),
    }
}

fn fs_error(operation: &str, path: &Path, err: std::io::Error) -> LoggerError {
    LoggerError::LoggerFileSystemError {
        message: format!("Cannot {} [{}]. err: {}", operation, path.display(), err),
    }
}
