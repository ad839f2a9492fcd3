//! Static Analyzer Harness CLI.
//!
//! Builds a scenario around a fixture source, drives the configured
//! analysis driver against it, and communicates the verdict through the
//! process exit status: 0 when the observed outcome matched the
//! expectation, 1 when the analyzer ran but the outcome mismatched, and 2
//! when setup or invocation failed.

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

mod commands;

use commands::{PrepareArgs, RunArgs};

#[derive(Parser)]
#[command(
    name = "sah",
    version,
    about = "Drive a static-analysis driver over synthetic fixture projects"
)]
struct Cli {
    /// Increase verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare a workspace, run the analyzer, and judge the outcome.
    Run(RunArgs),
    /// Prepare the workspace and compilation database without running.
    Prepare(PrepareArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    sah_common::logging::init(cli.verbose);

    let outcome = match cli.command {
        Commands::Run(args) => commands::run(args),
        Commands::Prepare(args) => commands::prepare(args).map(|()| true),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(error) => {
            eprintln!("sah: {error:#}");
            ExitCode::from(2)
        }
    }
}
