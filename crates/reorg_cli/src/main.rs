//! `reorg` entry point.
//!
//! # Responsibility
//! - Parse flags, initialize logging and dispatch one subcommand.
//! - Map any error to a non-zero exit status.

mod cli;
mod commands;

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use crate::cli::{Cli, Command};
use crate::commands::{run_categorise, run_clean, run_store, Context};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=command module=cli status=error error={}", err);
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let level = cli
        .global
        .log_level
        .clone()
        .unwrap_or_else(|| reorg_core::default_log_level().to_string());
    reorg_core::init_logging(&level, cli.global.log_dir.as_deref())?;

    let context = Context::from_args(&cli.global)?;
    match cli.command {
        Command::Clean {
            input,
            output,
            format,
            subdir,
        } => run_clean(&context, &input, &output, format, subdir.as_deref()).await,
        Command::Categorise { input } => run_categorise(&context, &input),
        Command::Store {
            input,
            backend,
            output,
        } => run_store(&context, &input, backend, output.as_deref()).await,
    }
}
