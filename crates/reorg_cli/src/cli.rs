use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "reorg")]
#[command(about = "Clean, categorise and store exported notes.", version)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) global: GlobalArgs,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Args)]
pub(crate) struct GlobalArgs {
    /// Log level: trace|debug|info|warn|error (default: debug builds `debug`, release `info`)
    #[arg(long, global = true)]
    pub(crate) log_level: Option<String>,

    /// Absolute directory for rolling log files (default: stderr)
    #[arg(long, global = true)]
    pub(crate) log_dir: Option<String>,

    /// IANA time zone used to interpret note timestamps
    #[arg(long, global = true, default_value = "Europe/London")]
    pub(crate) time_zone: String,

    /// Max concurrent note writes
    #[arg(long, global = true, default_value_t = reorg_core::config::DEFAULT_MAX_IN_FLIGHT)]
    pub(crate) max_in_flight: usize,

    /// Bulk write deadline in seconds (0 disables)
    #[arg(long, global = true, default_value_t = 5)]
    pub(crate) deadline_secs: u64,

    /// Answer `Y` to every confirmation gate
    #[arg(long, short = 'y', global = true)]
    pub(crate) yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Json,
    Txt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum StoreBackend {
    /// Log each object instead of storing it
    Log,
    /// Write objects below `--output`
    Local,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Parse a raw export into one artifact per note.
    Clean {
        /// Export root containing one directory per note
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Output directory (wiped before writing)
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Artifact format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Nested export folder holding the note directories
        #[arg(long)]
        subdir: Option<String>,
    },
    /// Interactively assign a category to every uncategorised note.
    Categorise {
        /// Cleaned directory holding JSON artifacts and the manifest
        #[arg(long, short = 'i')]
        input: PathBuf,
    },
    /// Store categorised notes in a backend.
    Store {
        /// Cleaned directory holding JSON artifacts and the manifest
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Storage backend
        #[arg(long, value_enum, default_value_t = StoreBackend::Log)]
        backend: StoreBackend,

        /// Destination directory for the `local` backend
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}
