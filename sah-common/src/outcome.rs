//! Expected outcomes and verdict evaluation.
//!
//! Evaluation is a pure comparison between the declared expectation and the
//! observed run result. It never touches the filesystem and never inspects
//! diagnostic content; semantic checks on emitted artifacts belong to
//! whatever outer mechanism wants them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ScenarioError, ScenarioResult};
use crate::invoke::RunResult;

/// Classification of an analyzer exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitClass {
    /// The analyzer exited zero.
    Clean,
    /// The analyzer exited non-zero because findings were reported.
    FindingsReported,
}

impl ExitClass {
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            Self::Clean
        } else {
            Self::FindingsReported
        }
    }
}

impl fmt::Display for ExitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::FindingsReported => write!(f, "findings-reported"),
        }
    }
}

/// Declarative expectation for one scenario; immutable once defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedOutcome {
    /// Expected exit-status class.
    pub exit: ExitClass,
    /// Minimum number of plist diagnostics the run must leave behind.
    #[serde(default)]
    pub min_diagnostics: Option<usize>,
}

impl ExpectedOutcome {
    /// The analyzer should fail because it found at least one real bug.
    pub fn findings() -> Self {
        Self {
            exit: ExitClass::FindingsReported,
            min_diagnostics: None,
        }
    }

    /// The analyzer should exit zero.
    pub fn clean() -> Self {
        Self {
            exit: ExitClass::Clean,
            min_diagnostics: None,
        }
    }

    /// Additionally require at least `count` plist diagnostics.
    pub fn with_min_diagnostics(mut self, count: usize) -> Self {
        self.min_diagnostics = Some(count);
        self
    }
}

/// Outcome of comparing an expectation against an observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    /// Human-readable summary; on failure, an expected-vs-observed diff.
    pub detail: String,
}

impl Verdict {
    /// Lift a failed verdict into [`ScenarioError::UnexpectedOutcome`].
    pub fn into_result(self) -> ScenarioResult<()> {
        if self.passed {
            Ok(())
        } else {
            Err(ScenarioError::UnexpectedOutcome(self.detail))
        }
    }
}

/// Compare the declared expectation with the observed run result.
pub fn evaluate(expected: &ExpectedOutcome, observed: &RunResult) -> Verdict {
    let observed_class = observed.exit_class();
    let mut mismatches = Vec::new();

    if expected.exit != observed_class {
        mismatches.push(format!(
            "exit status: expected {}, observed {} (code {})",
            expected.exit, observed_class, observed.exit_code
        ));
    }

    if let Some(min) = expected.min_diagnostics
        && observed.artifacts.len() < min
    {
        mismatches.push(format!(
            "diagnostics: expected at least {} plist file(s), observed {}",
            min,
            observed.artifacts.len()
        ));
    }

    if mismatches.is_empty() {
        Verdict {
            passed: true,
            detail: format!("analyzer exit matched expectation ({observed_class})"),
        }
    } else {
        Verdict {
            passed: false,
            detail: mismatches.join("; "),
        }
    }
}
