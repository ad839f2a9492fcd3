//! Report directory lifecycle.
//!
//! Each analyzer run owns a uniquely named, timestamped directory under a
//! parent hint. At the end of the run an empty directory is removed unless
//! the caller asked to keep it; a directory holding reports is always kept.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{info, warn};

use crate::errors::{ScenarioError, ScenarioResult};

static REPORT_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Upper bound on name-collision retries within one stamp.
const MAX_CREATE_ATTEMPTS: usize = 1000;

/// A report directory created for one analyzer run.
#[derive(Debug)]
pub struct ReportDirectory {
    path: PathBuf,
    keep_empty: bool,
}

impl ReportDirectory {
    /// Create a fresh report directory under `hint`, creating the parent
    /// when needed.
    pub fn create(hint: &Path, keep_empty: bool) -> ScenarioResult<Self> {
        fs::create_dir_all(hint).map_err(|error| ScenarioError::io(hint, error))?;

        let stamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let ordinal = REPORT_DIR_COUNTER.fetch_add(1, Ordering::SeqCst) + 1;
            let path = hint.join(format!("scan-{stamp}-{ordinal:03}"));
            match fs::create_dir(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "report directory created");
                    return Ok(Self { path, keep_empty });
                }
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(error) => return Err(ScenarioError::io(&path, error)),
            }
        }

        Err(ScenarioError::io(
            hint,
            io::Error::other("exhausted report directory names"),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Finish the run: remove the directory when it holds no report, unless
    /// keeping was requested. Returns whether the directory was kept.
    pub fn finalize(self) -> ScenarioResult<bool> {
        let mut entries =
            fs::read_dir(&self.path).map_err(|error| ScenarioError::io(&self.path, error))?;
        let empty = entries.next().is_none();

        if !empty {
            info!(path = %self.path.display(), "reports available");
            return Ok(true);
        }

        if self.keep_empty {
            warn!(path = %self.path.display(), "directory contains no report, but kept");
            return Ok(true);
        }

        fs::remove_dir(&self.path).map_err(|error| ScenarioError::io(&self.path, error))?;
        warn!(path = %self.path.display(), "removing directory because it contains no report");
        Ok(false)
    }
}
