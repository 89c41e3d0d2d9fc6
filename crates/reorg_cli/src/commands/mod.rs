//! Subcommand implementations and their shared context.
//!
//! # Responsibility
//! - Map global flags onto `PipelineConfig`.
//! - Provide the `> continue? [Y/n]` confirmation gate.
//!
//! # Invariants
//! - Only an exact `Y` response passes a gate; anything else aborts.

mod categorise;
mod clean;
mod store;

pub(crate) use categorise::run_categorise;
pub(crate) use clean::run_clean;
pub(crate) use store::run_store;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::info;
use reorg_core::{
    parse_time_zone, ConfigError, FileSystem, NoteService, OsFileSystem, PipelineConfig,
};

use crate::cli::GlobalArgs;

const CONFIRM_PROMPT: &str = "> continue? [Y/n] ";

/// CLI-level failures not covered by core errors.
#[derive(Debug)]
pub(crate) enum CommandError {
    /// Operator declined a confirmation gate.
    Aborted,
    /// Input directory holds nothing to process.
    NothingFound { path: PathBuf, what: &'static str },
    /// Store phase requires at least one categorised note.
    EmptyManifest { path: PathBuf },
    /// `--backend local` without `--output`.
    MissingOutput,
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aborted => write!(f, "aborted"),
            Self::NothingFound { path, what } => {
                write!(f, "no {what} found in parent: {}", path.display())
            }
            Self::EmptyManifest { path } => write!(f, "manifest is empty: {}", path.display()),
            Self::MissingOutput => write!(f, "--output is required for the local backend"),
        }
    }
}

impl Error for CommandError {}

/// Shared state for one invocation.
pub(crate) struct Context {
    pub(crate) config: PipelineConfig,
    assume_yes: bool,
    fs: Arc<dyn FileSystem>,
}

impl Context {
    pub(crate) fn from_args(args: &GlobalArgs) -> Result<Self, ConfigError> {
        let mut config = PipelineConfig::default();
        config.parser.time_zone = parse_time_zone(&args.time_zone)?;
        config.executor.max_in_flight = args.max_in_flight;
        config.executor.deadline =
            (args.deadline_secs > 0).then(|| Duration::from_secs(args.deadline_secs));

        info!(
            "event=config_load module=cli status=ok time_zone={} max_in_flight={} deadline_secs={}",
            config.parser.time_zone.name(),
            config.executor.normalized_max_in_flight(),
            args.deadline_secs
        );
        Ok(Self {
            config,
            assume_yes: args.yes,
            fs: Arc::new(OsFileSystem),
        })
    }

    pub(crate) fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    pub(crate) fn service(&self) -> NoteService {
        NoteService::new(self.fs(), &self.config)
    }

    pub(crate) fn absolute(&self, path: &Path) -> io::Result<PathBuf> {
        self.fs.absolute(path)
    }

    /// Asks the operator to continue; `--yes` answers automatically.
    pub(crate) fn confirm(&self) -> Result<(), Box<dyn Error>> {
        if self.assume_yes {
            info!("event=confirm module=cli status=ok source=flag");
            return Ok(());
        }
        let stdin = io::stdin();
        let stdout = io::stdout();
        if confirm_with(stdin.lock(), stdout.lock())? {
            Ok(())
        } else {
            Err(CommandError::Aborted.into())
        }
    }
}

/// Writes the gate prompt and returns whether the response is exactly `Y`.
pub(crate) fn confirm_with<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<bool> {
    write!(output, "{CONFIRM_PROMPT}")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']) == "Y")
}

#[cfg(test)]
mod tests {
    use super::confirm_with;
    use std::io::Cursor;

    #[test]
    fn only_exact_capital_y_confirms() {
        let mut output = Vec::new();
        assert!(confirm_with(Cursor::new("Y\n"), &mut output).unwrap());
        assert_eq!(output, b"> continue? [Y/n] ");

        assert!(!confirm_with(Cursor::new("y\n"), Vec::new()).unwrap());
        assert!(!confirm_with(Cursor::new("yes\n"), Vec::new()).unwrap());
        assert!(!confirm_with(Cursor::new("\n"), Vec::new()).unwrap());
        assert!(!confirm_with(Cursor::new(""), Vec::new()).unwrap());
    }
}
