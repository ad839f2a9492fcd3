//! Scenario workspace preparation.
//!
//! A workspace is an isolated directory tree created fresh per scenario. It
//! owns a `src/` subtree holding the fixture copy and a generated build
//! script. The script always exits zero: the analyzer intercepts the compile
//! step itself, so the wrapped compiler's status must never become the
//! build's status.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::HarnessConfig;
use crate::errors::{ScenarioError, ScenarioResult};
use crate::recipe::{CompilationDatabase, CompileCommand, DATABASE_FILE_NAME};

/// Source subdirectory inside the workspace.
pub const SRC_DIR: &str = "src";

/// Fixed name the fixture is copied under inside `src/`.
pub const SOURCE_FILE_NAME: &str = "broken.c";

/// Object file the generated script compiles into.
pub const OBJECT_FILE_NAME: &str = "broken.o";

/// Generated build script name.
pub const BUILD_SCRIPT_NAME: &str = "run.sh";

/// A prepared scenario workspace.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    compile: CompileCommand,
}

impl Workspace {
    /// Prepare a fresh workspace at `root` from a corpus fixture.
    ///
    /// Reproducible from the fixture and config alone: identical inputs into
    /// a fresh root produce byte-identical script and recipe content. A
    /// failed preparation leaves no partial artifacts behind.
    pub fn prepare(
        root: &Path,
        fixture: &Path,
        config: &HarnessConfig,
    ) -> ScenarioResult<Self> {
        // Validate everything before touching the filesystem.
        if !fixture.is_file() {
            return Err(ScenarioError::setup(fixture, "fixture source does not exist"));
        }
        for conflict in [SRC_DIR, BUILD_SCRIPT_NAME, DATABASE_FILE_NAME] {
            if root.join(conflict).exists() {
                return Err(ScenarioError::setup(
                    root,
                    format!("root already contains '{conflict}'"),
                ));
            }
        }

        let directory = std::path::absolute(root)
            .map_err(|error| ScenarioError::setup(root, error.to_string()))?;
        let compile = compile_command_for(directory, &config.compiler);

        let root_existed = root.exists();
        if let Err(error) = populate(root, fixture, &compile) {
            discard_partial(root, root_existed);
            return Err(error);
        }

        debug!(root = %root.display(), "workspace prepared");
        Ok(Self {
            root: root.to_path_buf(),
            compile,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the fixture copy inside the workspace.
    pub fn source_path(&self) -> PathBuf {
        self.root.join(SRC_DIR).join(SOURCE_FILE_NAME)
    }

    /// Path of the generated build script.
    pub fn build_script_path(&self) -> PathBuf {
        self.root.join(BUILD_SCRIPT_NAME)
    }

    /// Path the compilation database is emitted to.
    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE_NAME)
    }

    /// The compile command shared by the build script and the recipe.
    pub fn compile_command(&self) -> &CompileCommand {
        &self.compile
    }

    /// Emit the compilation database describing this workspace's build.
    pub fn emit_recipe(&self) -> ScenarioResult<PathBuf> {
        CompilationDatabase::single(self.compile.clone()).emit(&self.root)
    }
}

fn compile_command_for(directory: PathBuf, compiler: &str) -> CompileCommand {
    let source = format!("./{SRC_DIR}/{SOURCE_FILE_NAME}");
    let object = format!("./{SRC_DIR}/{OBJECT_FILE_NAME}");
    CompileCommand::new(
        directory,
        PathBuf::from(SRC_DIR).join(SOURCE_FILE_NAME),
        vec![
            compiler.to_string(),
            "-c".to_string(),
            source,
            "-o".to_string(),
            object,
            "-DNDEBUG".to_string(),
        ],
    )
}

fn populate(root: &Path, fixture: &Path, compile: &CompileCommand) -> ScenarioResult<()> {
    let src_dir = root.join(SRC_DIR);
    fs::create_dir_all(&src_dir)
        .map_err(|error| ScenarioError::setup(&src_dir, error.to_string()))?;

    let source = src_dir.join(SOURCE_FILE_NAME);
    fs::copy(fixture, &source)
        .map_err(|error| ScenarioError::setup(fixture, error.to_string()))?;

    let script_path = root.join(BUILD_SCRIPT_NAME);
    fs::write(&script_path, render_build_script(compile))
        .map_err(|error| ScenarioError::setup(&script_path, error.to_string()))?;
    mark_executable(&script_path)?;

    Ok(())
}

fn render_build_script(compile: &CompileCommand) -> String {
    // The compiler's exit status must not leak: the analyzer re-drives the
    // compile itself and only needs the recipe's flags to be real.
    format!("#!/bin/sh\n{}\nexit 0\n", compile.command_line())
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> ScenarioResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|error| ScenarioError::setup(path, error.to_string()))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> ScenarioResult<()> {
    Ok(())
}

fn discard_partial(root: &Path, root_existed: bool) {
    let _ = fs::remove_file(root.join(BUILD_SCRIPT_NAME));
    let _ = fs::remove_dir_all(root.join(SRC_DIR));
    if !root_existed {
        let _ = fs::remove_dir(root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_fixture(dir: &Path) -> PathBuf {
        let path = dir.join("div_by_zero.c");
        fs::write(&path, "int f(void) { return 1 / 0; }\n").unwrap();
        path
    }

    #[test]
    fn test_prepare_creates_expected_layout() {
        let dir = tempdir().unwrap();
        let fixture = write_fixture(dir.path());
        let root = dir.path().join("scenario");

        let workspace =
            Workspace::prepare(&root, &fixture, &HarnessConfig::default()).unwrap();

        assert!(workspace.source_path().is_file());
        let script = fs::read_to_string(workspace.build_script_path()).unwrap();
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("cc -c ./src/broken.c -o ./src/broken.o -DNDEBUG"));
        assert!(script.trim_end().ends_with("exit 0"));
    }

    #[cfg(unix)]
    #[test]
    fn test_build_script_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let fixture = write_fixture(dir.path());
        let root = dir.path().join("scenario");

        let workspace =
            Workspace::prepare(&root, &fixture, &HarnessConfig::default()).unwrap();
        let mode = fs::metadata(workspace.build_script_path())
            .unwrap()
            .permissions()
            .mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[test]
    fn test_script_and_recipe_share_one_command_line() {
        let dir = tempdir().unwrap();
        let fixture = write_fixture(dir.path());
        let root = dir.path().join("scenario");

        let workspace =
            Workspace::prepare(&root, &fixture, &HarnessConfig::default()).unwrap();
        workspace.emit_recipe().unwrap();

        let script = fs::read_to_string(workspace.build_script_path()).unwrap();
        let loaded = CompilationDatabase::load(&workspace.database_path()).unwrap();
        let recipe_line = loaded.entries()[0].command_line();
        assert!(script.lines().any(|line| line == recipe_line));
    }

    #[test]
    fn test_prepare_missing_fixture_leaves_no_artifacts() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("scenario");

        let error = Workspace::prepare(
            &root,
            &dir.path().join("no_such_fixture.c"),
            &HarnessConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(error, ScenarioError::WorkspaceSetup { .. }));
        assert!(!root.exists());
    }

    #[test]
    fn test_prepare_rejects_conflicting_root() {
        let dir = tempdir().unwrap();
        let fixture = write_fixture(dir.path());
        let root = dir.path().join("scenario");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(BUILD_SCRIPT_NAME), "#!/bin/sh\n").unwrap();

        let error =
            Workspace::prepare(&root, &fixture, &HarnessConfig::default()).unwrap_err();
        assert!(matches!(error, ScenarioError::WorkspaceSetup { .. }));
        // Pre-existing contents are untouched.
        assert!(root.join(BUILD_SCRIPT_NAME).exists());
    }

    #[test]
    fn test_prepare_is_idempotent_byte_for_byte() {
        let dir = tempdir().unwrap();
        let fixture = write_fixture(dir.path());
        let root = dir.path().join("scenario");
        let config = HarnessConfig::default().with_compiler("clang-19");

        let workspace = Workspace::prepare(&root, &fixture, &config).unwrap();
        workspace.emit_recipe().unwrap();
        let first_script = fs::read(workspace.build_script_path()).unwrap();
        let first_recipe = fs::read(workspace.database_path()).unwrap();

        fs::remove_dir_all(&root).unwrap();

        let workspace = Workspace::prepare(&root, &fixture, &config).unwrap();
        workspace.emit_recipe().unwrap();
        assert_eq!(first_script, fs::read(workspace.build_script_path()).unwrap());
        assert_eq!(first_recipe, fs::read(workspace.database_path()).unwrap());
    }
}
