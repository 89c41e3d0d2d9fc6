//! Process logging bootstrap.
//!
//! # Responsibility
//! - Start the `flexi_logger` backend once per process, writing either to
//!   stderr or to rolling files in an absolute directory.
//! - Route panics through the logger as one-line, length-capped events.
//!
//! # Invariants
//! - Repeating `init_logging` with the same level and target is a no-op.
//! - A second call with a different level or target is rejected.
//! - Initialization never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::panic::PanicHookInfo;
use std::path::PathBuf;

const LOG_FILE_BASENAME: &str = "reorg";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 5;
const PANIC_MESSAGE_LIMIT: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Rolling files below an absolute directory.
    Directory(PathBuf),
}

impl LogTarget {
    /// Maps the `--log-dir` flag onto a target.
    pub fn from_flag(log_dir: Option<&str>) -> Result<Self, String> {
        let Some(dir) = log_dir.map(str::trim) else {
            return Ok(Self::Stderr);
        };
        if dir.is_empty() {
            return Err("log directory cannot be empty".to_string());
        }
        let dir = PathBuf::from(dir);
        if !dir.is_absolute() {
            return Err(format!(
                "log directory must be absolute, got `{}`",
                dir.display()
            ));
        }
        Ok(Self::Directory(dir))
    }
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => write!(f, "stderr"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

struct ActiveLogger {
    level: LevelFilter,
    target: LogTarget,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn matches(&self, level: LevelFilter, target: &LogTarget) -> Result<(), String> {
        if self.level != level || &self.target != target {
            return Err(format!(
                "logging already running at {} to {}; cannot switch to {} to {}",
                self.level, self.target, level, target
            ));
        }
        Ok(())
    }
}

/// Starts process logging at `level`, to `log_dir` when given or stderr.
///
/// # Errors
/// - `level` is not a `log` level name.
/// - `log_dir` is empty, relative or cannot be created.
/// - Logging is already running with another level or target.
pub fn init_logging(level: &str, log_dir: Option<&str>) -> Result<(), String> {
    let level = parse_level(level)?;
    let target = LogTarget::from_flag(log_dir)?;

    let active = ACTIVE.get_or_try_init(|| -> Result<ActiveLogger, String> {
        let handle = start_backend(level, &target)?;
        install_panic_hook();
        info!(
            "event=app_start module=core status=ok platform={} debug_build={} version={}",
            std::env::consts::OS,
            cfg!(debug_assertions),
            env!("CARGO_PKG_VERSION")
        );
        info!(
            "event=logging_init module=core status=ok level={} target={}",
            level, target
        );
        Ok(ActiveLogger {
            level,
            target: target.clone(),
            _handle: handle,
        })
    })?;
    active.matches(level, &target)
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, String> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| format!("unknown log level `{}`", level.trim()))
}

fn start_backend(level: LevelFilter, target: &LogTarget) -> Result<LoggerHandle, String> {
    let filter = level.as_str().to_ascii_lowercase();
    let logger =
        Logger::try_with_str(&filter).map_err(|err| format!("bad log filter `{filter}`: {err}"))?;
    let logger = match target {
        LogTarget::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::default_format),
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|err| format!("cannot create log directory {}: {err}", dir.display()))?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir.as_path())
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
    };
    logger
        .start()
        .map_err(|err| format!("cannot start logger: {err}"))
}

/// Chains a hook that logs the panic before the default report.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map_or_else(
            || "unknown".to_string(),
            |loc| format!("{}:{}", loc.file(), loc.line()),
        );
        error!(
            "event=panic module=core status=error location={} message={}",
            location,
            panic_message(info)
        );
        default_hook(info);
    }));
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let text = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>");
    single_line(text, PANIC_MESSAGE_LIMIT)
}

// Panic payloads can carry note text.
fn single_line(text: &str, limit: usize) -> String {
    let mut line: String = text
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .take(limit)
        .collect();
    if text.chars().nth(limit).is_some() {
        line.push('…');
    }
    line
}
