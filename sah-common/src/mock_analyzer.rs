//! Deterministic mock analysis driver.
//!
//! Honors the analyzer invocation contract without shipping a real analysis
//! engine: it loads the compilation database, re-reads each listed source,
//! flags literal division-by-zero expressions, writes one plist report per
//! finding, and reports the bounded finding count as its exit status when
//! "fail on bugs" was requested. Intended for CI and integration tests where
//! a real driver is unavailable.
//!
//! Assertion modeling is deliberately shallow: a division that appears after
//! an `assert(` guard in the same file only counts when `NDEBUG` is defined
//! in the entry's arguments, i.e. when the guard compiles away.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::errors::{ScenarioError, ScenarioResult};
use crate::recipe::CompilationDatabase;
use crate::report_dir::ReportDirectory;

/// Exit status cap when reporting the finding count.
const MAX_EXIT_FINDINGS: usize = 125;

/// Checker name attached to division findings.
pub const DIVIDE_ZERO_CHECK: &str = "core.DivideZero";

/// One defect located in a fixture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Source path as listed in the database entry.
    pub file: PathBuf,
    /// 1-based line of the defect.
    pub line: usize,
    /// 1-based column of the defect.
    pub column: usize,
    pub check_name: String,
    pub description: String,
}

/// Options mirrored from the mock analyzer command line.
#[derive(Debug, Clone)]
pub struct MockAnalyzerOptions {
    pub cdb: PathBuf,
    pub output: PathBuf,
    pub plist: bool,
    pub status_bugs: bool,
    pub keep_empty: bool,
}

/// Run one analysis pass and return the process exit status to use.
pub fn run(options: &MockAnalyzerOptions) -> ScenarioResult<i32> {
    if !options.cdb.is_file() {
        return Err(ScenarioError::Recipe(
            "compilation database is missing".to_string(),
        ));
    }
    let database = CompilationDatabase::load(&options.cdb)?;
    let report_dir = ReportDirectory::create(&options.output, options.keep_empty)?;

    let mut findings = Vec::new();
    let mut failures = 0usize;
    for entry in database.entries() {
        let source = entry.source_path();
        match fs::read_to_string(&source) {
            Ok(text) => {
                let ndebug = defines_ndebug(&entry.arguments);
                let found = scan_source(&entry.file, &text, ndebug);
                debug!(file = %entry.file.display(), count = found.len(), ndebug, "source scanned");
                findings.extend(found);
            }
            Err(error) => {
                warn!(file = %source.display(), %error, "analysis failed");
                record_failure(report_dir.path(), &source, &error)?;
                failures += 1;
            }
        }
    }

    if options.plist {
        for (index, finding) in findings.iter().enumerate() {
            write_plist_report(report_dir.path(), index, finding)?;
        }
    }

    let kept = report_dir.finalize()?;
    info!(
        findings = findings.len(),
        failures, kept, "analysis complete"
    );

    Ok(if options.status_bugs {
        findings.len().min(MAX_EXIT_FINDINGS) as i32
    } else {
        0
    })
}

/// True when the argument list defines the `NDEBUG` macro.
pub fn defines_ndebug(arguments: &[String]) -> bool {
    let mut iter = arguments.iter().peekable();
    while let Some(arg) = iter.next() {
        if arg == "-DNDEBUG" || arg.starts_with("-DNDEBUG=") {
            return true;
        }
        if arg == "-D"
            && let Some(next) = iter.peek()
            && (next.as_str() == "NDEBUG" || next.starts_with("NDEBUG="))
        {
            return true;
        }
    }
    false
}

fn division_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/\s*0\s*([;,)\]]|$)").expect("hardcoded pattern"))
}

fn assert_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\bassert\s*\(").expect("hardcoded pattern"))
}

/// Scan one source for literal division-by-zero expressions.
pub fn scan_source(file: &Path, text: &str, ndebug: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut assert_seen = false;

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*') {
            continue;
        }

        if assert_pattern().is_match(line) {
            assert_seen = true;
        }

        for matched in division_pattern().find_iter(line) {
            if assert_seen && !ndebug {
                // The guard is compiled in and constrains the path.
                continue;
            }
            findings.push(Finding {
                file: file.to_path_buf(),
                line: index + 1,
                column: matched.start() + 1,
                check_name: DIVIDE_ZERO_CHECK.to_string(),
                description: "Division by zero".to_string(),
            });
        }
    }

    findings
}

/// Render one finding as a plist diagnostic document.
pub fn render_plist(finding: &Finding) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
 <key>files</key>
 <array>
  <string>{file}</string>
 </array>
 <key>diagnostics</key>
 <array>
  <dict>
   <key>description</key><string>{description}</string>
   <key>category</key><string>Logic error</string>
   <key>type</key><string>{description}</string>
   <key>check_name</key><string>{check}</string>
   <key>location</key>
   <dict>
    <key>line</key><integer>{line}</integer>
    <key>col</key><integer>{column}</integer>
    <key>file</key><integer>0</integer>
   </dict>
  </dict>
 </array>
</dict>
</plist>
"#,
        file = xml_escape(&finding.file.display().to_string()),
        description = xml_escape(&finding.description),
        check = xml_escape(&finding.check_name),
        line = finding.line,
        column = finding.column,
    )
}

fn write_plist_report(dir: &Path, index: usize, finding: &Finding) -> ScenarioResult<PathBuf> {
    let path = dir.join(format!("report-{:03}.plist", index + 1));
    fs::write(&path, render_plist(finding)).map_err(|error| ScenarioError::io(&path, error))?;
    Ok(path)
}

/// Record an analysis failure for post-mortem inspection instead of
/// aborting the whole run.
fn record_failure(report_dir: &Path, source: &Path, error: &io::Error) -> ScenarioResult<()> {
    let failures_dir = report_dir.join("failures");
    fs::create_dir_all(&failures_dir)
        .map_err(|error| ScenarioError::io(&failures_dir, error))?;

    let stem = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("source");
    let path = failures_dir.join(format!("{stem}.info.txt"));
    let body = format!("{}\nOther Error\n{}\n", source.display(), error);
    fs::write(&path, body).map_err(|error| ScenarioError::io(&path, error))
}

fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
