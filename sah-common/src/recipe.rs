//! Compilation recipe handling.
//!
//! The recipe is a JSON compilation database: one entry per compiled file
//! carrying the working directory, the source path, and the exact argument
//! list. The rendered command line is the same line the generated build
//! script executes, so the analyzer's intercepted compilation sees the real
//! compiler flags.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{ScenarioError, ScenarioResult};
use crate::util::shell_split;

/// File name the database is persisted under inside a workspace.
pub const DATABASE_FILE_NAME: &str = "compile_commands.json";

/// One compilation database entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommand {
    /// Working directory the command runs from.
    pub directory: PathBuf,
    /// Compiled source, relative to `directory`.
    pub file: PathBuf,
    /// Full argument list, compiler first.
    pub arguments: Vec<String>,
}

impl CompileCommand {
    pub fn new(directory: PathBuf, file: PathBuf, arguments: Vec<String>) -> Self {
        Self {
            directory,
            file,
            arguments,
        }
    }

    /// Render the argument list as the shell line the build script runs.
    pub fn command_line(&self) -> String {
        self.arguments
            .iter()
            .map(|arg| shell_escape::escape(Cow::from(arg.as_str())).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Absolute path of the compiled source.
    pub fn source_path(&self) -> PathBuf {
        if self.file.is_absolute() {
            self.file.clone()
        } else {
            self.directory.join(&self.file)
        }
    }
}

/// Raw on-disk entry. `command`-form entries are accepted alongside
/// `arguments`-form ones, as existing databases use either.
#[derive(Debug, Deserialize)]
struct RawEntry {
    directory: PathBuf,
    file: PathBuf,
    #[serde(default)]
    arguments: Option<Vec<String>>,
    #[serde(default)]
    command: Option<String>,
}

/// An ordered set of compile commands, persisted as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CompilationDatabase {
    entries: Vec<CompileCommand>,
}

impl CompilationDatabase {
    /// Database holding a single entry.
    pub fn single(entry: CompileCommand) -> Self {
        Self {
            entries: vec![entry],
        }
    }

    pub fn entries(&self) -> &[CompileCommand] {
        &self.entries
    }

    /// Persist the database into the workspace root.
    ///
    /// Every referenced source file must already exist in the workspace;
    /// the analyzer re-drives compilation from this description and a
    /// dangling reference would only surface later, far from its cause.
    pub fn emit(&self, root: &Path) -> ScenarioResult<PathBuf> {
        for entry in &self.entries {
            let source = entry.source_path();
            if !source.is_file() {
                return Err(ScenarioError::Recipe(format!(
                    "recipe references missing source '{}'",
                    source.display()
                )));
            }
        }

        let path = root.join(DATABASE_FILE_NAME);
        let mut payload = serde_json::to_string_pretty(&self.entries)
            .map_err(|error| ScenarioError::Recipe(error.to_string()))?;
        payload.push('\n');
        fs::write(&path, payload).map_err(|error| ScenarioError::io(&path, error))?;

        debug!(path = %path.display(), entries = self.entries.len(), "compilation database emitted");
        Ok(path)
    }

    /// Load a database from disk. Entries carrying neither an `arguments`
    /// list nor a `command` string are skipped with a warning.
    pub fn load(path: &Path) -> ScenarioResult<Self> {
        let text = fs::read_to_string(path).map_err(|error| ScenarioError::io(path, error))?;
        let raw: Vec<RawEntry> = serde_json::from_str(&text).map_err(|error| {
            ScenarioError::Recipe(format!("malformed compilation database: {error}"))
        })?;

        let mut entries = Vec::with_capacity(raw.len());
        for entry in raw {
            let arguments = match (entry.arguments, entry.command) {
                (Some(arguments), _) if !arguments.is_empty() => arguments,
                (_, Some(command)) => {
                    let split = shell_split(&command);
                    if split.is_empty() {
                        warn!(file = %entry.file.display(), "skipping entry with blank command");
                        continue;
                    }
                    split
                }
                _ => {
                    warn!(file = %entry.file.display(), "skipping entry without a command");
                    continue;
                }
            };
            entries.push(CompileCommand::new(entry.directory, entry.file, arguments));
        }

        Ok(Self { entries })
    }
}
