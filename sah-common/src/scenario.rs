//! Scenario pipeline and state machine.
//!
//! A scenario walks `Created → WorkspacePrepared → RecipeEmitted →
//! AnalyzerRan → Evaluated`; any setup or invocation failure jumps straight
//! to terminal `Failed` and short-circuits the remaining steps. Scenarios
//! are deterministic and idempotent per invocation, so there is no retry.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::errors::{ScenarioError, ScenarioResult};
use crate::invoke::{AnalyzerInvocation, RunResult};
use crate::outcome::{ExpectedOutcome, Verdict, evaluate};
use crate::workspace::Workspace;

/// Directory under the workspace root that analyzer output lands in.
pub const OUTPUT_DIR_NAME: &str = "output";

/// Pipeline position of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Created,
    WorkspacePrepared,
    RecipeEmitted,
    AnalyzerRan,
    Evaluated,
    Failed,
}

impl ScenarioState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Evaluated | Self::Failed)
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::WorkspacePrepared => "workspace-prepared",
            Self::RecipeEmitted => "recipe-emitted",
            Self::AnalyzerRan => "analyzer-ran",
            Self::Evaluated => "evaluated",
            Self::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

fn default_status_bugs() -> bool {
    true
}

/// Declarative scenario definition, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub id: String,
    /// Fixture source file supplied by the test corpus.
    pub fixture: PathBuf,
    /// Compiler override; falls back to the harness config.
    #[serde(default)]
    pub compiler: Option<String>,
    /// Analyzer override; falls back to the harness config.
    #[serde(default)]
    pub analyzer: Option<String>,
    /// Ask the analyzer to fail the run when findings exist.
    #[serde(default = "default_status_bugs")]
    pub status_bugs: bool,
    /// Keep the report directory even when no issues were reported.
    #[serde(default)]
    pub keep_empty: bool,
    pub expect: ExpectedOutcome,
}

impl ScenarioSpec {
    /// Minimal spec for a fixture expected to trip the analyzer.
    pub fn new(id: impl Into<String>, fixture: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            fixture: fixture.into(),
            compiler: None,
            analyzer: None,
            status_bugs: true,
            keep_empty: false,
            expect: ExpectedOutcome::findings(),
        }
    }

    pub fn with_expect(mut self, expect: ExpectedOutcome) -> Self {
        self.expect = expect;
        self
    }

    pub fn with_status_bugs(mut self, enabled: bool) -> Self {
        self.status_bugs = enabled;
        self
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Parse a spec from TOML text.
    pub fn from_toml_str(text: &str) -> ScenarioResult<Self> {
        toml::from_str(text).map_err(|error| ScenarioError::Spec(error.to_string()))
    }

    /// Load a spec from a TOML file.
    pub fn load(path: &Path) -> ScenarioResult<Self> {
        let text = fs::read_to_string(path).map_err(|error| ScenarioError::io(path, error))?;
        Self::from_toml_str(&text)
    }
}

/// Final report of one scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub scenario_id: String,
    pub state: ScenarioState,
    pub workspace_root: PathBuf,
    pub database_path: PathBuf,
    pub run: RunResult,
    pub verdict: Verdict,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.verdict.passed
    }
}

/// One scenario instance driving the full pipeline.
#[derive(Debug)]
pub struct Scenario {
    spec: ScenarioSpec,
    config: HarnessConfig,
    root: PathBuf,
    state: ScenarioState,
}

impl Scenario {
    /// Build a scenario; spec-level compiler/analyzer overrides take
    /// precedence over the harness config.
    pub fn new(spec: ScenarioSpec, config: HarnessConfig, root: impl Into<PathBuf>) -> Self {
        let mut config = config;
        if let Some(compiler) = &spec.compiler {
            config.compiler = compiler.clone();
        }
        if let Some(analyzer) = &spec.analyzer {
            config.analyzer = analyzer.clone();
        }
        Self {
            spec,
            config,
            root: root.into(),
            state: ScenarioState::Created,
        }
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    /// Drive the full pipeline. A setup or invocation failure parks the
    /// scenario in `Failed` and is returned as the error; an outcome
    /// mismatch is a regular report whose verdict did not pass.
    pub fn run(&mut self) -> ScenarioResult<ScenarioReport> {
        info!(scenario = %self.spec.id, root = %self.root.display(), "scenario started");
        let outcome = self.drive();
        if outcome.is_err() {
            self.state = ScenarioState::Failed;
        }
        outcome
    }

    fn drive(&mut self) -> ScenarioResult<ScenarioReport> {
        let workspace = Workspace::prepare(&self.root, &self.spec.fixture, &self.config)?;
        self.advance(ScenarioState::WorkspacePrepared);

        let database_path = workspace.emit_recipe()?;
        self.advance(ScenarioState::RecipeEmitted);

        let invocation = AnalyzerInvocation::new(&self.config.analyzer, OUTPUT_DIR_NAME)
            .status_bugs(self.spec.status_bugs)
            .keep_empty(self.spec.keep_empty);
        let run = invocation.run(workspace.root())?;
        self.advance(ScenarioState::AnalyzerRan);

        let verdict = evaluate(&self.spec.expect, &run);
        self.advance(ScenarioState::Evaluated);
        info!(
            scenario = %self.spec.id,
            passed = verdict.passed,
            detail = %verdict.detail,
            "scenario evaluated"
        );

        Ok(ScenarioReport {
            scenario_id: self.spec.id.clone(),
            state: self.state,
            workspace_root: workspace.root().to_path_buf(),
            database_path,
            run,
            verdict,
        })
    }

    fn advance(&mut self, next: ScenarioState) {
        debug!(scenario = %self.spec.id, from = %self.state, to = %next, "state transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ExitClass;
    use tempfile::tempdir;

    fn write_fixture(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_spec_toml_round_trip() {
        let spec = ScenarioSpec::from_toml_str(
            r#"
            id = "div-by-zero"
            fixture = "fixtures/div_by_zero.c"
            status_bugs = true

            [expect]
            exit = "findings_reported"
            min_diagnostics = 1
            "#,
        )
        .unwrap();

        assert_eq!(spec.id, "div-by-zero");
        assert!(spec.status_bugs);
        assert!(!spec.keep_empty);
        assert_eq!(spec.expect.exit, ExitClass::FindingsReported);
        assert_eq!(spec.expect.min_diagnostics, Some(1));
    }

    #[test]
    fn test_spec_defaults() {
        let spec = ScenarioSpec::from_toml_str(
            r#"
            id = "clean"
            fixture = "fixtures/clean.c"

            [expect]
            exit = "clean"
            "#,
        )
        .unwrap();
        assert!(spec.status_bugs);
        assert!(spec.compiler.is_none());
        assert!(spec.analyzer.is_none());
    }

    #[test]
    fn test_malformed_spec_is_a_spec_error() {
        assert!(matches!(
            ScenarioSpec::from_toml_str("id = "),
            Err(ScenarioError::Spec(_))
        ));
    }

    #[test]
    fn test_missing_fixture_parks_scenario_in_failed() {
        let dir = tempdir().unwrap();
        let spec = ScenarioSpec::new("broken", dir.path().join("absent.c"));
        let mut scenario =
            Scenario::new(spec, HarnessConfig::default(), dir.path().join("scenario"));

        let error = scenario.run().unwrap_err();
        assert!(matches!(error, ScenarioError::WorkspaceSetup { .. }));
        assert_eq!(scenario.state(), ScenarioState::Failed);
        assert!(scenario.state().is_terminal());
    }

    #[test]
    fn test_unresolvable_analyzer_parks_scenario_in_failed() {
        let dir = tempdir().unwrap();
        let fixture = write_fixture(dir.path(), "ok.c", "int x;\n");
        let spec = ScenarioSpec::new("no-analyzer", fixture)
            .with_analyzer("sah-definitely-not-a-real-analyzer");
        let mut scenario =
            Scenario::new(spec, HarnessConfig::default(), dir.path().join("scenario"));

        let error = scenario.run().unwrap_err();
        assert!(matches!(error, ScenarioError::AnalyzerInvocation { .. }));
        assert_eq!(scenario.state(), ScenarioState::Failed);
    }

    #[cfg(unix)]
    #[test]
    fn test_pipeline_reaches_evaluated_with_trivial_analyzer() {
        let dir = tempdir().unwrap();
        let fixture = write_fixture(dir.path(), "ok.c", "int x;\n");
        // `true` ignores the invocation contract but exercises the full
        // pipeline: it starts, exits zero, and emits nothing.
        let spec = ScenarioSpec::new("trivial", fixture)
            .with_analyzer("true")
            .with_expect(ExpectedOutcome::clean());
        let mut scenario =
            Scenario::new(spec, HarnessConfig::default(), dir.path().join("scenario"));

        let report = scenario.run().unwrap();
        assert_eq!(report.state, ScenarioState::Evaluated);
        assert!(report.passed());
        assert!(report.run.success());
        assert!(report.run.artifacts.is_empty());
        assert_eq!(report.database_path, dir.path().join("scenario/compile_commands.json"));
    }

    #[test]
    fn test_spec_overrides_win_over_config() {
        let spec = ScenarioSpec::new("override", "fixture.c").with_analyzer("special");
        let config = HarnessConfig::default().with_analyzer("generic");
        let scenario = Scenario::new(spec, config, "/tmp/root");
        assert_eq!(scenario.config.analyzer, "special");
        assert_eq!(scenario.state(), ScenarioState::Created);
    }
}
