//! Analyzer invocation.
//!
//! Builds the analyzer command line, resolves the executable, runs it from
//! the workspace root as a blocking child process, and captures the exit
//! status together with the plist artifacts the run left behind. There is no
//! timeout here: scenario wall-clock limits belong to the outer test runner.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::errors::{ScenarioError, ScenarioResult};
use crate::outcome::ExitClass;
use crate::recipe::DATABASE_FILE_NAME;

/// Description of one analyzer run against a prepared workspace.
#[derive(Debug, Clone)]
pub struct AnalyzerInvocation {
    program: String,
    cdb: PathBuf,
    output_dir: PathBuf,
    plist: bool,
    status_bugs: bool,
    keep_empty: bool,
    extra_args: Vec<String>,
}

impl AnalyzerInvocation {
    /// New invocation of `program`, writing reports under `output_dir`
    /// (resolved relative to the workspace root). Plist output is on by
    /// default; "fail on bugs" is opt-in.
    pub fn new(program: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cdb: PathBuf::from(DATABASE_FILE_NAME),
            output_dir: output_dir.into(),
            plist: true,
            status_bugs: false,
            keep_empty: false,
            extra_args: Vec::new(),
        }
    }

    /// Request a non-zero analyzer exit when findings exist.
    pub fn status_bugs(mut self, enabled: bool) -> Self {
        self.status_bugs = enabled;
        self
    }

    /// Toggle plist diagnostic output.
    pub fn plist(mut self, enabled: bool) -> Self {
        self.plist = enabled;
        self
    }

    /// Keep the report directory even when no issues were reported.
    pub fn keep_empty(mut self, enabled: bool) -> Self {
        self.keep_empty = enabled;
        self
    }

    /// Override the compilation database path.
    pub fn cdb(mut self, path: impl Into<PathBuf>) -> Self {
        self.cdb = path.into();
        self
    }

    /// Append a pass-through argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Argument vector handed to the analyzer process.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--cdb".to_string(),
            self.cdb.display().to_string(),
            "--output".to_string(),
            self.output_dir.display().to_string(),
        ];
        if self.plist {
            args.push("--plist".to_string());
        }
        if self.status_bugs {
            args.push("--status-bugs".to_string());
        }
        if self.keep_empty {
            args.push("--keep-empty".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Run the analyzer against a prepared workspace, blocking until exit.
    ///
    /// Fails with [`ScenarioError::AnalyzerInvocation`] only when the binary
    /// cannot be located or started; a non-zero analyzer exit is a regular
    /// [`RunResult`].
    pub fn run(&self, workspace_root: &Path) -> ScenarioResult<RunResult> {
        let program = self.resolve_program()?;
        let args = self.to_args();
        debug!(program = %program.display(), ?args, "invoking analyzer");

        let started = Instant::now();
        let output = Command::new(&program)
            .args(&args)
            .current_dir(workspace_root)
            .output()
            .map_err(|error| ScenarioError::AnalyzerInvocation {
                program: self.program.clone(),
                reason: error.to_string(),
            })?;
        let duration = started.elapsed();

        let exit_code = output.status.code().unwrap_or(-1);
        let artifacts = collect_plists(&workspace_root.join(&self.output_dir))?;
        info!(
            exit_code,
            artifacts = artifacts.len(),
            elapsed_ms = duration.as_millis() as u64,
            "analyzer run finished"
        );

        Ok(RunResult {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration,
            artifacts,
        })
    }

    fn resolve_program(&self) -> ScenarioResult<PathBuf> {
        let candidate = Path::new(&self.program);
        // A bare name goes through PATH lookup; anything with a separator is
        // taken as a concrete path.
        if candidate.components().count() > 1 {
            if candidate.is_file() {
                Ok(candidate.to_path_buf())
            } else {
                Err(ScenarioError::AnalyzerInvocation {
                    program: self.program.clone(),
                    reason: "no such file".to_string(),
                })
            }
        } else {
            which::which(&self.program).map_err(|error| ScenarioError::AnalyzerInvocation {
                program: self.program.clone(),
                reason: error.to_string(),
            })
        }
    }
}

/// Collect plist diagnostic files under `dir`, recursively, in sorted order.
fn collect_plists(dir: &Path) -> ScenarioResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let pattern = format!(
        "{}/**/*.plist",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let matches = glob::glob(&pattern)
        .map_err(|error| ScenarioError::io(dir, io::Error::other(error.to_string())))?;

    let mut paths: Vec<PathBuf> = matches.filter_map(Result::ok).collect();
    paths.sort();
    Ok(paths)
}

/// Observed result of one analyzer run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    /// Plist diagnostic files the run left behind, sorted.
    pub artifacts: Vec<PathBuf>,
}

impl RunResult {
    /// True when the analyzer exited zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Exit-status class the evaluation compares against.
    pub fn exit_class(&self) -> ExitClass {
        ExitClass::from_exit_code(self.exit_code)
    }
}
