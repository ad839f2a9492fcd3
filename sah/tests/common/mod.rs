//! Shared helpers for the integration suite.

use std::path::PathBuf;

/// Path of the mock analyzer binary built for this package.
pub fn mock_analyzer_bin() -> &'static str {
    env!("CARGO_BIN_EXE_sah-mock-analyzer")
}

/// Path of the `sah` binary built for this package.
#[allow(dead_code)]
pub fn sah_bin() -> &'static str {
    env!("CARGO_BIN_EXE_sah")
}

/// Path of a committed fixture source.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
