// src/verify.rs

//! Post-install verification
//!
//! After `make install`, the installed tool is exercised directly:
//! 1. locate it on the search path and make sure the one found is the one
//!    under `<prefix>/bin`
//! 2. check its `--version` output names the expected version
//! 3. run each fixture script through it and compare stdout byte for byte
//!
//! The first failing step aborts with a [`VerifyError`]; nothing is retried.

use crate::recipe::{BuildSpec, Fixture, TestSection};
use regex::Regex;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;
use tracing::{debug, info};

/// Verification failures
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("{name} not found on search path {search_path}")]
    MissingExecutable { name: String, search_path: String },

    #[error("Found {found}, expected an executable in {expected}")]
    IdentityMismatch { expected: PathBuf, found: PathBuf },

    #[error("Version output does not match {pattern}: {output}")]
    VersionMismatch { pattern: String, output: String },

    #[error("Output of {input} differs from {expected_file}")]
    OutputMismatch {
        input: PathBuf,
        expected_file: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("{command} exited with {status}: {stderr}")]
    ProcessFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Failed to read fixture {path}: {source}")]
    Fixture {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid version pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Everything verification needs to know about an install
#[derive(Debug, Clone)]
pub struct VerifyContext {
    /// Executable name
    pub executable: String,
    /// Flag that prints the version
    pub version_flag: String,
    /// Version the install must report
    pub version: String,
    /// Install prefix
    pub prefix: PathBuf,
    /// Directories searched for the executable
    pub search_path: OsString,
    /// Directory fixture paths are relative to
    pub work_dir: PathBuf,
    /// Script/expected-output pairs
    pub fixtures: Vec<Fixture>,
}

impl VerifyContext {
    /// Context for a resolved build
    ///
    /// The search path is `<prefix>/bin` followed by the caller's `PATH`.
    pub fn for_spec(test: &TestSection, spec: &BuildSpec, work_dir: impl Into<PathBuf>) -> Self {
        let mut dirs = vec![spec.bin_dir()];
        if let Some(path) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&path));
        }
        let search_path = std::env::join_paths(&dirs)
            .unwrap_or_else(|_| spec.bin_dir().into_os_string());

        Self {
            executable: test.executable.clone(),
            version_flag: test.version_flag.clone(),
            version: spec.version.to_string(),
            prefix: spec.prefix.clone(),
            search_path,
            work_dir: work_dir.into(),
            fixtures: test.fixtures.clone(),
        }
    }

    /// `<prefix>/bin`
    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }
}

/// Outcome of a successful verification
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    /// The executable that was exercised
    pub executable: PathBuf,
    /// First line of its version output
    pub version_line: String,
    /// Fixture inputs that produced the expected output
    pub fixtures_checked: Vec<PathBuf>,
}

/// Verify an installed tool
pub fn verify_install(ctx: &VerifyContext) -> Result<VerifyReport, VerifyError> {
    info!("test: Ensuring use of the installed executable");
    let executable = locate(ctx)?;

    info!("test: Checking version");
    let version_line = check_version(ctx, &executable)?;

    info!("test: Ensuring {} runs", ctx.executable);
    let mut fixtures_checked = Vec::new();
    for fixture in &ctx.fixtures {
        fixtures_checked.push(check_fixture(ctx, &executable, fixture)?);
    }

    Ok(VerifyReport {
        executable,
        version_line,
        fixtures_checked,
    })
}

fn locate(ctx: &VerifyContext) -> Result<PathBuf, VerifyError> {
    let found = which::which_in(&ctx.executable, Some(&ctx.search_path), &ctx.work_dir).map_err(|_| {
        VerifyError::MissingExecutable {
            name: ctx.executable.clone(),
            search_path: ctx.search_path.to_string_lossy().to_string(),
        }
    })?;
    debug!("Found {}", found.display());

    let expected = ctx.bin_dir();
    if found.parent() != Some(expected.as_path()) {
        return Err(VerifyError::IdentityMismatch { expected, found });
    }
    Ok(found)
}

fn run(executable: &Path, arg: impl AsRef<std::ffi::OsStr>) -> Result<Output, VerifyError> {
    let arg = arg.as_ref();
    let command = format!("{} {}", executable.display(), arg.to_string_lossy());
    debug!("Running {}", command);

    let output = Command::new(executable)
        .arg(arg)
        .output()
        .map_err(|source| VerifyError::Spawn {
            command: command.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(VerifyError::ProcessFailed {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(output)
}

fn check_version(ctx: &VerifyContext, executable: &Path) -> Result<String, VerifyError> {
    let output = run(executable, &ctx.version_flag)?;

    let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    let pattern = format!(
        "{}(.+){}",
        regex::escape(&ctx.executable),
        regex::escape(&ctx.version)
    );
    let re = Regex::new(&pattern)?;

    match re.find(&combined) {
        Some(m) => {
            let line_start = combined[..m.start()].rfind('\n').map_or(0, |i| i + 1);
            let line = combined[line_start..].lines().next().unwrap_or_default();
            Ok(line.to_string())
        }
        None => Err(VerifyError::VersionMismatch {
            pattern,
            output: combined,
        }),
    }
}

fn check_fixture(
    ctx: &VerifyContext,
    executable: &Path,
    fixture: &Fixture,
) -> Result<PathBuf, VerifyError> {
    let input = ctx.work_dir.join(&fixture.input);
    let expected_file = ctx.work_dir.join(&fixture.expected);

    let output = run(executable, &input)?;
    let expected = std::fs::read(&expected_file).map_err(|source| VerifyError::Fixture {
        path: expected_file.clone(),
        source,
    })?;

    if output.stdout != expected {
        return Err(VerifyError::OutputMismatch {
            input,
            expected_file,
            expected: String::from_utf8_lossy(&expected).to_string(),
            actual: String::from_utf8_lossy(&output.stdout).to_string(),
        });
    }
    Ok(input)
}
