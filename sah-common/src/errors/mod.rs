//! Error taxonomy for scenario execution.
//!
//! Setup and invocation failures are fatal and short-circuit the pipeline.
//! An unexpected outcome is different in kind: the analyzer ran to
//! completion, but the observed result did not match the declared
//! expectation. It is reported as a scenario failure, never as a crash.

use std::path::{Path, PathBuf};

/// Error type for scenario harness operations
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// Bad root path, missing fixture, or permission failure during setup.
    #[error("workspace setup failed at '{}': {reason}", path.display())]
    WorkspaceSetup { path: PathBuf, reason: String },

    /// The compilation recipe is malformed or references state that does
    /// not hold in the workspace.
    #[error("compilation recipe rejected: {0}")]
    Recipe(String),

    /// A declarative scenario definition could not be parsed.
    #[error("invalid scenario spec: {0}")]
    Spec(String),

    /// The analyzer binary could not be located or started at all. This is
    /// distinct from the analyzer running and exiting non-zero.
    #[error("failed to invoke analyzer '{program}': {reason}")]
    AnalyzerInvocation { program: String, reason: String },

    /// The analyzer ran, but exit status or artifacts did not match the
    /// declared expectation.
    #[error("unexpected outcome: {0}")]
    UnexpectedOutcome(String),

    /// IO failure outside workspace setup (artifact collection, report
    /// directories, database emission).
    #[error("io error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for harness operations
pub type ScenarioResult<T> = Result<T, ScenarioError>;

impl ScenarioError {
    pub(crate) fn setup(path: &Path, reason: impl Into<String>) -> Self {
        Self::WorkspaceSetup {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl ScenarioError {
    /// True when the error belongs to the setup phase of the pipeline.
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::WorkspaceSetup { .. } | Self::Recipe(_) | Self::Spec(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_setup_display_names_path_and_reason() {
        let error = ScenarioError::setup(Path::new("/no/such/root"), "fixture source does not exist");
        let rendered = error.to_string();
        assert!(rendered.contains("/no/such/root"));
        assert!(rendered.contains("fixture source does not exist"));
    }

    #[test]
    fn test_invocation_error_is_not_setup() {
        let error = ScenarioError::AnalyzerInvocation {
            program: "analyze-build".to_string(),
            reason: "not found".to_string(),
        };
        assert!(!error.is_setup());
        assert!(error.to_string().contains("analyze-build"));
    }

    #[test]
    fn test_setup_classification() {
        assert!(ScenarioError::Recipe("missing source".into()).is_setup());
        assert!(ScenarioError::Spec("bad toml".into()).is_setup());
        assert!(!ScenarioError::UnexpectedOutcome("exit mismatch".into()).is_setup());
    }
}
