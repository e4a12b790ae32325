//! Logging setup
//!
//! One-shot commands log to stderr. The daemon logs to stderr by default, or
//! with `--log-file` to a size-rotated file through a non-blocking writer.

use color_eyre::eyre::{Context, ContextCompat, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Rotate the daemon log at this size
const MAX_LOG_BYTES: u64 = 1_000_000;

/// Daemon log file name inside [`log_dir`]
pub const LOG_FILE_NAME: &str = "daemon.log";

/// Filter for one-shot commands: `RUST_LOG`, else warnings only
#[must_use]
pub fn command_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Filter for the daemon: `RUST_LOG`, else `dasw=<level>`
#[must_use]
pub fn daemon_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dasw={log_level}")))
}

/// Initialize stderr logging for one-shot commands
pub fn init_command_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(command_filter())
        .with_writer(io::stderr)
        .init();
}

/// Initialize daemon logging
///
/// Returns the writer guard when logging to a file; keep it alive for the
/// daemon's lifetime so buffered lines are flushed on exit.
///
/// # Errors
/// Returns an error if the log directory cannot be determined or created.
pub fn init_daemon_logging(log_level: &str, log_file: bool) -> Result<Option<WorkerGuard>> {
    let filter = daemon_filter(log_level);

    if !log_file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        return Ok(None);
    }

    let dir = log_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log dir: {}", dir.display()))?;

    let appender = RotatingFileAppender::new(&dir, LOG_FILE_NAME, MAX_LOG_BYTES);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}

/// Directory for the daemon log (`<data local dir>/dasw`)
///
/// # Errors
/// Returns an error if no data directory exists for this user.
pub fn log_dir() -> Result<PathBuf> {
    Ok(dirs::data_local_dir()
        .context("Could not determine data directory")?
        .join("dasw"))
}

/// A file appender that rotates logs based on size.
///
/// Keeps exactly two files: the active log and one `.old` backup. The active
/// file is re-created if deleted externally, and created with 0o600
/// permissions on Unix.
pub struct RotatingFileAppender {
    path: PathBuf,
    backup_path: PathBuf,
    max_size_bytes: u64,
    file: Mutex<Option<File>>,
}

impl RotatingFileAppender {
    /// Create a new rotating file appender.
    ///
    /// # Arguments
    /// * `dir` - Directory to store logs in.
    /// * `filename` - Base filename (e.g., "daemon.log").
    /// * `max_size_bytes` - Maximum size before rotation.
    pub fn new(dir: impl Into<PathBuf>, filename: &str, max_size_bytes: u64) -> Self {
        let dir = dir.into();
        let path = dir.join(filename);
        let backup_path = dir.join(format!("{filename}.old"));

        Self {
            path,
            backup_path,
            max_size_bytes,
            file: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_secure(path: &Path, append: bool) -> io::Result<File> {
        let mut options = fs::OpenOptions::new();
        options.create(true).write(true);

        if append {
            options.append(true);
        } else {
            options.truncate(true);
        }

        #[cfg(unix)]
        {
            options.mode(0o600);
        }

        options.open(path)
    }

    /// Open the file if not open, or re-open if deleted.
    fn get_file<'a>(&self, guard: &'a mut Option<File>) -> io::Result<&'a mut File> {
        if !self.path.exists() {
            *guard = None;
        }

        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            *guard = Some(Self::open_secure(&self.path, true)?);
        }

        guard
            .as_mut()
            .ok_or_else(|| io::Error::other("log file not open"))
    }

    /// current -> backup, then start a fresh current file
    fn rotate(&self, guard: &mut Option<File>) -> io::Result<()> {
        *guard = None;

        if self.path.exists() {
            fs::rename(&self.path, &self.backup_path)?;
        }

        *guard = Some(Self::open_secure(&self.path, false)?);
        Ok(())
    }
}

impl Write for RotatingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(format!("Log mutex poisoned: {e}")))?;

        let current_size = match self.get_file(&mut guard) {
            Ok(f) => f.metadata()?.len(),
            Err(_) => 0,
        };

        if current_size >= self.max_size_bytes
            && let Err(e) = self.rotate(&mut guard)
        {
            eprintln!("Failed to rotate log file: {e}");
        }

        let file = self.get_file(&mut guard)?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(format!("Log mutex poisoned: {e}")))?;

        if let Some(file) = guard.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_is_under_data_dir() {
        let dir = log_dir().unwrap();
        assert!(dir.ends_with("dasw"));
        assert_eq!(dir.join(LOG_FILE_NAME).file_name().unwrap(), "daemon.log");
    }

    #[test]
    fn test_appender_writes_and_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let mut appender = RotatingFileAppender::new(dir.path(), "daemon.log", 16);

        appender.write_all(b"0123456789abcdef").unwrap();
        appender.write_all(b"next").unwrap();
        appender.flush().unwrap();

        let current = fs::read_to_string(dir.path().join("daemon.log")).unwrap();
        let backup = fs::read_to_string(dir.path().join("daemon.log.old")).unwrap();
        assert_eq!(current, "next");
        assert_eq!(backup, "0123456789abcdef");
    }

    #[test]
    fn test_appender_recreates_deleted_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut appender = RotatingFileAppender::new(dir.path(), "daemon.log", 1024);

        appender.write_all(b"first\n").unwrap();
        fs::remove_file(appender.path()).unwrap();
        appender.write_all(b"second\n").unwrap();

        let current = fs::read_to_string(dir.path().join("daemon.log")).unwrap();
        assert_eq!(current, "second\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_appender_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mut appender = RotatingFileAppender::new(dir.path(), "daemon.log", 1024);
        appender.write_all(b"x").unwrap();

        let mode = fs::metadata(appender.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
