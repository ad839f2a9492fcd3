//! Harness configuration.
//!
//! Process-wide state (the compiler identifier, the analyzer executable) is
//! captured once into an explicit value and passed into the pipeline, so
//! individual steps never consult the environment themselves. That keeps
//! every step deterministic and testable in isolation.

use std::env;

/// Compiler written into generated build scripts when `CC` is unset.
pub const DEFAULT_COMPILER: &str = "cc";

/// Analyzer driver invoked when `SAH_ANALYZER` is unset.
pub const DEFAULT_ANALYZER: &str = "analyze-build";

/// Explicit configuration for one scenario run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Compiler executable referenced by the generated build script and the
    /// compilation recipe.
    pub compiler: String,
    /// Static-analysis driver executable: a name resolved on `PATH` or a
    /// concrete path.
    pub analyzer: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            compiler: DEFAULT_COMPILER.to_string(),
            analyzer: DEFAULT_ANALYZER.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Capture `CC` and `SAH_ANALYZER` from the process environment. This is
    /// the only place the harness reads environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary lookup. Blank values fall back to
    /// the defaults, matching how an unset variable behaves.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            compiler: pick("CC", DEFAULT_COMPILER),
            analyzer: pick("SAH_ANALYZER", DEFAULT_ANALYZER),
        }
    }

    /// Override the compiler identifier.
    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    /// Override the analyzer executable.
    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = analyzer.into();
        self
    }
}
