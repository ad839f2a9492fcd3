//! End-to-end pipeline tests driven through the mock analyzer binary.
//!
//! These exercise the full prepare / emit / invoke / evaluate chain against
//! real child processes, using the committed fixture corpus.

mod common;

use sah_common::scenario::OUTPUT_DIR_NAME;
use sah_common::{
    AnalyzerInvocation, ExitClass, ExpectedOutcome, HarnessConfig, Scenario, ScenarioSpec,
    ScenarioState, Workspace, evaluate,
};
use tempfile::tempdir;

fn prepared_workspace(root: &std::path::Path, fixture_name: &str) -> Workspace {
    let workspace = Workspace::prepare(
        root,
        &common::fixture(fixture_name),
        &HarnessConfig::default(),
    )
    .expect("workspace preparation");
    workspace.emit_recipe().expect("recipe emission");
    workspace
}

fn mock_invocation() -> AnalyzerInvocation {
    AnalyzerInvocation::new(common::mock_analyzer_bin(), OUTPUT_DIR_NAME)
}

#[test]
fn test_buggy_fixture_fails_run_when_status_bugs_requested() {
    let dir = tempdir().unwrap();
    let workspace = prepared_workspace(&dir.path().join("ws"), "div_by_zero.c");

    let run = mock_invocation()
        .status_bugs(true)
        .run(workspace.root())
        .expect("analyzer should start");

    assert_ne!(run.exit_code, 0);
    assert_eq!(run.exit_class(), ExitClass::FindingsReported);
    assert!(!run.artifacts.is_empty(), "expected at least one plist diagnostic");
    assert!(run.artifacts.iter().all(|p| p.extension().is_some_and(|e| e == "plist")));

    let verdict = evaluate(&ExpectedOutcome::findings().with_min_diagnostics(1), &run);
    assert!(verdict.passed, "{}", verdict.detail);
}

#[test]
fn test_clean_fixture_exits_zero() {
    let dir = tempdir().unwrap();
    let workspace = prepared_workspace(&dir.path().join("ws"), "clean.c");

    let run = mock_invocation()
        .status_bugs(true)
        .run(workspace.root())
        .expect("analyzer should start");

    assert_eq!(run.exit_code, 0);
    assert!(run.artifacts.is_empty());
    assert!(evaluate(&ExpectedOutcome::clean(), &run).passed);
}

#[test]
fn test_without_status_bugs_diagnostics_are_still_emitted() {
    let dir = tempdir().unwrap();
    let workspace = prepared_workspace(&dir.path().join("ws"), "div_by_zero.c");

    let run = mock_invocation()
        .status_bugs(false)
        .run(workspace.root())
        .expect("analyzer should start");

    assert_eq!(run.exit_code, 0);
    assert!(!run.artifacts.is_empty());

    let verdict = evaluate(&ExpectedOutcome::clean().with_min_diagnostics(1), &run);
    assert!(verdict.passed, "{}", verdict.detail);
}

#[test]
fn test_assert_guarded_division_is_reachable_with_ndebug() {
    // The generated recipe compiles with -DNDEBUG, so the assert guard is
    // compiled away and the division is reported.
    let dir = tempdir().unwrap();
    let workspace = prepared_workspace(&dir.path().join("ws"), "guarded.c");

    let run = mock_invocation()
        .status_bugs(true)
        .run(workspace.root())
        .expect("analyzer should start");

    assert_ne!(run.exit_code, 0);
    assert!(!run.artifacts.is_empty());
}

#[test]
fn test_full_scenario_reaches_evaluated_and_passes() {
    let dir = tempdir().unwrap();
    let spec = ScenarioSpec::new("div-by-zero", common::fixture("div_by_zero.c"))
        .with_analyzer(common::mock_analyzer_bin())
        .with_expect(ExpectedOutcome::findings().with_min_diagnostics(1));

    let mut scenario = Scenario::new(spec, HarnessConfig::default(), dir.path().join("ws"));
    let report = scenario.run().expect("pipeline should complete");

    assert_eq!(report.state, ScenarioState::Evaluated);
    assert!(report.passed(), "{}", report.verdict.detail);
    assert!(report.database_path.is_file());
    assert!(report.workspace_root.join("run.sh").is_file());
}

#[test]
fn test_scenario_verdict_fails_on_mismatch_without_error() {
    // Expecting a clean exit from a buggy fixture is a failed verdict, not
    // a pipeline error.
    let dir = tempdir().unwrap();
    let spec = ScenarioSpec::new("mismatch", common::fixture("div_by_zero.c"))
        .with_analyzer(common::mock_analyzer_bin())
        .with_expect(ExpectedOutcome::clean());

    let mut scenario = Scenario::new(spec, HarnessConfig::default(), dir.path().join("ws"));
    let report = scenario.run().expect("pipeline should complete");

    assert_eq!(report.state, ScenarioState::Evaluated);
    assert!(!report.passed());
    assert!(report.verdict.detail.contains("expected clean"));
    assert!(report.verdict.clone().into_result().is_err());
}
