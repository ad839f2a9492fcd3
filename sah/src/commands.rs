//! Subcommand implementations for the `sah` binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::debug;

use sah_common::scenario::OUTPUT_DIR_NAME;
use sah_common::{
    ExpectedOutcome, HarnessConfig, Scenario, ScenarioReport, ScenarioSpec, Workspace,
};

/// Expected outcome class, as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExpectArg {
    /// The analyzer should exit non-zero because it found bugs.
    Findings,
    /// The analyzer should exit zero.
    Clean,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Fixture source file to build the scenario from.
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with = "scenario",
        required_unless_present = "scenario"
    )]
    pub fixture: Option<PathBuf>,

    /// Declarative scenario file (TOML). Relative fixture paths resolve
    /// against the file's directory.
    #[arg(long, value_name = "FILE")]
    pub scenario: Option<PathBuf>,

    /// Workspace root directory; defaults to a fresh directory under the
    /// system temp dir.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Static-analysis driver to invoke.
    #[arg(long, value_name = "PROGRAM")]
    pub analyzer: Option<String>,

    /// Compiler written into the generated build script.
    #[arg(long, value_name = "PROGRAM")]
    pub compiler: Option<String>,

    /// Expected outcome class.
    #[arg(long, value_enum, default_value_t = ExpectArg::Findings)]
    pub expect: ExpectArg,

    /// Minimum number of plist diagnostics the run must produce.
    #[arg(long, value_name = "N")]
    pub min_diagnostics: Option<usize>,

    /// Do not ask the analyzer to fail the run when bugs are found.
    #[arg(long)]
    pub no_status_bugs: bool,

    /// Keep the analyzer report directory even when empty.
    #[arg(long)]
    pub keep_empty: bool,
}

#[derive(Debug, Args)]
pub struct PrepareArgs {
    /// Fixture source file to build the workspace from.
    #[arg(long, value_name = "FILE")]
    pub fixture: PathBuf,

    /// Workspace root directory; defaults to a fresh directory under the
    /// system temp dir.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Compiler written into the generated build script.
    #[arg(long, value_name = "PROGRAM")]
    pub compiler: Option<String>,
}

/// Run a full scenario. Returns whether the verdict passed.
pub fn run(args: RunArgs) -> Result<bool> {
    let spec = build_spec(&args)?;
    let config = build_config(args.compiler.as_deref(), args.analyzer.as_deref());
    let root = args.root.clone().unwrap_or_else(|| default_root(&spec.id));
    debug!(scenario = %spec.id, root = %root.display(), "running scenario");

    let mut scenario = Scenario::new(spec, config, root);
    let report = scenario.run().context("scenario failed")?;
    print_report(&report);
    Ok(report.passed())
}

/// Prepare the workspace and emit the compilation database, then stop.
pub fn prepare(args: PrepareArgs) -> Result<()> {
    let config = build_config(args.compiler.as_deref(), None);
    let root = args
        .root
        .unwrap_or_else(|| default_root(fixture_stem(&args.fixture)));

    let workspace = Workspace::prepare(&root, &args.fixture, &config)
        .context("workspace preparation failed")?;
    let database = workspace.emit_recipe().context("recipe emission failed")?;

    println!("workspace: {}", workspace.root().display());
    println!("build script: {}", workspace.build_script_path().display());
    println!("compilation database: {}", database.display());
    println!("compile command: {}", workspace.compile_command().command_line());
    Ok(())
}

fn build_spec(args: &RunArgs) -> Result<ScenarioSpec> {
    if let Some(path) = &args.scenario {
        let mut spec = ScenarioSpec::load(path)
            .with_context(|| format!("failed to load scenario '{}'", path.display()))?;
        if spec.fixture.is_relative()
            && let Some(base) = path.parent()
        {
            spec.fixture = base.join(&spec.fixture);
        }
        return Ok(spec);
    }

    // `fixture` is enforced by clap when no scenario file is given.
    let fixture = args
        .fixture
        .clone()
        .context("either --fixture or --scenario is required")?;

    let mut expect = match args.expect {
        ExpectArg::Findings => ExpectedOutcome::findings(),
        ExpectArg::Clean => ExpectedOutcome::clean(),
    };
    if let Some(min) = args.min_diagnostics {
        expect = expect.with_min_diagnostics(min);
    }

    let spec = ScenarioSpec::new(fixture_stem(&fixture).to_string(), fixture)
        .with_status_bugs(!args.no_status_bugs)
        .with_expect(expect);
    Ok(ScenarioSpec {
        keep_empty: args.keep_empty,
        ..spec
    })
}

fn build_config(compiler: Option<&str>, analyzer: Option<&str>) -> HarnessConfig {
    let mut config = HarnessConfig::from_env();
    if let Some(compiler) = compiler {
        config.compiler = compiler.to_string();
    }
    if let Some(analyzer) = analyzer {
        config.analyzer = analyzer.to_string();
    }
    config
}

fn fixture_stem(fixture: &Path) -> &str {
    fixture
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("scenario")
}

fn default_root(id: &str) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f");
    std::env::temp_dir()
        .join("sah")
        .join(format!("{id}_{stamp}_{}", std::process::id()))
}

fn print_report(report: &ScenarioReport) {
    println!(
        "scenario {}: {}",
        report.scenario_id,
        if report.passed() { "PASS" } else { "FAIL" }
    );
    println!("  {}", report.verdict.detail);
    println!("  analyzer exit code: {}", report.run.exit_code);
    println!("  plist diagnostics: {}", report.run.artifacts.len());
    println!("  output under: {}", report.workspace_root.join(OUTPUT_DIR_NAME).display());
    println!("  workspace: {}", report.workspace_root.display());
}
