//! Deterministic mock analysis driver binary.
//!
//! A stand-in for a real static-analysis driver that honors the same
//! invocation contract: it reads a JSON compilation database, writes plist
//! diagnostics into a report directory under `--output`, and exits non-zero
//! when `--status-bugs` was requested and findings exist.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};

use sah_common::mock_analyzer::{self, MockAnalyzerOptions};

#[derive(Parser)]
#[command(
    name = "sah-mock-analyzer",
    version,
    about = "Deterministic stand-in for a static-analysis driver"
)]
struct Cli {
    /// The JSON compilation database.
    #[arg(long, value_name = "FILE", default_value = "compile_commands.json")]
    cdb: PathBuf,

    /// Output directory for analyzer reports.
    #[arg(long, short = 'o', value_name = "PATH", default_value = ".")]
    output: PathBuf,

    /// Emit results as a set of .plist files.
    #[arg(long)]
    plist: bool,

    /// Exit non-zero when potential bugs were found.
    #[arg(long)]
    status_bugs: bool,

    /// Keep the report directory even if no issues were reported.
    #[arg(long)]
    keep_empty: bool,

    /// Increase verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    sah_common::logging::init(cli.verbose);

    let options = MockAnalyzerOptions {
        cdb: cli.cdb,
        output: cli.output,
        plist: cli.plist,
        status_bugs: cli.status_bugs,
        keep_empty: cli.keep_empty,
    };

    match mock_analyzer::run(&options) {
        Ok(code) => ExitCode::from(code.clamp(0, 125) as u8),
        Err(error) => {
            eprintln!("sah-mock-analyzer: {error}");
            ExitCode::from(2)
        }
    }
}
