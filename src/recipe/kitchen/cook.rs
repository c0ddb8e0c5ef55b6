// src/recipe/kitchen/cook.rs

//! Cook: the actual build execution for a single recipe

use crate::error::{Error, Result};
use crate::recipe::format::{PatchSource, Recipe};
use crate::recipe::spec::BuildSpec;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

use super::archive::{apply_patch, extract_archive};
use super::Kitchen;

/// A single cook operation
pub struct Cook<'a> {
    pub(super) kitchen: &'a Kitchen,
    pub(super) recipe: &'a Recipe,
    pub(super) spec: &'a BuildSpec,
    /// Temporary build directory
    pub(super) build_dir: TempDir,
    /// Source directory within build_dir
    pub(super) source_dir: PathBuf,
    /// Arguments passed to configure after `--prefix`
    pub(super) configure_args: Vec<String>,
    /// Names of patches applied, in order
    pub(super) patches_applied: Vec<String>,
    /// Build log accumulator
    pub(super) log: String,
    /// Warnings
    pub(super) warnings: Vec<String>,
}

impl<'a> Cook<'a> {
    pub(super) fn new(kitchen: &'a Kitchen, recipe: &'a Recipe, spec: &'a BuildSpec) -> Result<Self> {
        let build_dir = tempfile::Builder::new()
            .prefix(&format!("{}-{}-", spec.name, spec.version))
            .tempdir()
            .map_err(|e| Error::IoError(format!("Failed to create build directory: {}", e)))?;

        let source_dir = build_dir.path().join("source");
        fs::create_dir_all(&source_dir)?;

        Ok(Self {
            kitchen,
            recipe,
            spec,
            build_dir,
            source_dir,
            configure_args: Vec::new(),
            patches_applied: Vec::new(),
            log: String::new(),
            warnings: Vec::new(),
        })
    }

    /// Phase 1: Prep - fetch the archive and remote patches
    pub(super) fn prep(&mut self) -> Result<()> {
        let archive_path = self.kitchen.fetch_archive(self.recipe, &self.spec.version)?;

        let local_archive = self
            .build_dir
            .path()
            .join(self.recipe.archive_filename(&self.spec.version));
        fs::copy(&archive_path, &local_archive)?;
        self.log_line(&format!("Fetched source: {}", local_archive.display()));

        let recipe = self.recipe;
        for patch in recipe.applicable_patches(self.spec) {
            if let Some(PatchSource::Remote { url, checksum }) = patch.source(recipe) {
                let checksum = checksum.ok_or_else(|| {
                    Error::ParseError(format!("Remote patch {} has no checksum", url))
                })?;
                let path = self.kitchen.fetch_source(&[url.to_string()], checksum)?;
                let local_path = self.patches_dir().join(patch.name());
                fs::create_dir_all(self.patches_dir())?;
                fs::copy(&path, &local_path)?;
                self.log_line(&format!("Fetched patch: {}", url));
            }
        }

        Ok(())
    }

    fn patches_dir(&self) -> PathBuf {
        self.build_dir.path().join("patches")
    }

    /// Phase 2a: Unpack sources
    pub(super) fn unpack(&mut self) -> Result<()> {
        let archive_path = self
            .build_dir
            .path()
            .join(self.recipe.archive_filename(&self.spec.version));

        extract_archive(&archive_path, &self.source_dir)?;
        self.log_line(&format!("Extracted source to {}", self.source_dir.display()));

        // Archives usually carry a single top-level directory
        let entries: Vec<_> = fs::read_dir(&self.source_dir)?
            .filter_map(|e| e.ok())
            .collect();

        if entries.len() == 1 && entries[0].file_type().map(|t| t.is_dir()).unwrap_or(false) {
            self.source_dir = entries[0].path();
            debug!("Source directory: {}", self.source_dir.display());
        }

        Ok(())
    }

    /// Phase 2b: Apply patches that hold for this build, in declaration order
    pub(super) fn patch(&mut self) -> Result<()> {
        let recipe = self.recipe;
        for patch in recipe.applicable_patches(self.spec) {
            let patch_path = match patch.source(recipe) {
                Some(PatchSource::Local(path)) => path,
                Some(PatchSource::Remote { .. }) => self.patches_dir().join(patch.name()),
                None => {
                    return Err(Error::ParseError("Patch has neither file nor url".to_string()));
                }
            };

            if !patch_path.exists() {
                return Err(Error::NotFound(format!(
                    "Patch file not found: {}",
                    patch_path.display()
                )));
            }

            info!("Applying patch: {}", patch.name());
            apply_patch(&self.source_dir, &patch_path, patch.strip)?;
            self.log_line(&format!("Applied patch: {}", patch.name()));
            self.patches_applied.push(patch.name().to_string());
        }

        Ok(())
    }

    /// Out-of-tree build directory
    fn work_dir(&self) -> PathBuf {
        match &self.recipe.build.directory {
            Some(dir) => self.source_dir.join(dir),
            None => self.source_dir.clone(),
        }
    }

    /// Environment for configure and make
    fn build_env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();

        if let Some((cc, cxx)) = self.spec.compiler.drivers() {
            if std::env::var_os("CC").is_none() {
                env.push(("CC".to_string(), cc.to_string()));
            }
            if std::env::var_os("CXX").is_none() {
                env.push(("CXX".to_string(), cxx.to_string()));
            }
        }

        for (key, value) in &self.recipe.build.environment {
            env.push((key.clone(), self.spec.substitute(value)));
        }

        env
    }

    /// Phase 3: run configure
    pub(super) fn configure(&mut self) -> Result<()> {
        let work_dir = self.work_dir();
        fs::create_dir_all(&work_dir)?;

        self.configure_args = self.recipe.configure_args(self.spec);
        let script = self.source_dir.join("configure");

        let mut args = vec![format!("--prefix={}", self.spec.prefix.display())];
        args.extend(self.configure_args.iter().cloned());

        self.run_build_step("configure", script.as_os_str(), &args, &work_dir)
    }

    /// Phase 4: run make
    pub(super) fn build(&mut self) -> Result<()> {
        let args = vec![make_jobs_arg(self.recipe.build.jobs, self.kitchen.config.jobs)];
        self.run_build_step("build", OsStr::new("make"), &args, &self.work_dir())
    }

    /// Phase 5: run make check; failures are recorded as warnings
    pub(super) fn check(&mut self) -> Result<()> {
        let args = vec!["check".to_string()];
        if let Err(e) = self.run_build_step("check", OsStr::new("make"), &args, &self.work_dir()) {
            self.warnings.push(format!("Tests failed: {}", e));
        }
        Ok(())
    }

    /// Phase 6: run make install into the prefix
    pub(super) fn install(&mut self) -> Result<()> {
        fs::create_dir_all(&self.spec.prefix)?;
        let args = vec!["install".to_string()];
        self.run_build_step("install", OsStr::new("make"), &args, &self.work_dir())
    }

    /// Keep the build directory on disk and return its path
    pub(super) fn keep(self) -> PathBuf {
        self.build_dir.keep()
    }

    /// Run a build step
    fn run_build_step(
        &mut self,
        phase: &str,
        program: &OsStr,
        args: &[String],
        work_dir: &Path,
    ) -> Result<()> {
        info!("Running {} phase", phase);
        debug!("Command: {} {}", program.to_string_lossy(), args.join(" "));

        let output = Command::new(program)
            .args(args)
            .current_dir(work_dir)
            .envs(self.build_env())
            .output()
            .map_err(|e| Error::BuildFailed {
                phase: phase.to_string(),
                message: format!("Failed to run {}: {}", program.to_string_lossy(), e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        self.log_build_output(phase, &stdout, &stderr);

        if !output.status.success() {
            return Err(Error::BuildFailed {
                phase: phase.to_string(),
                message: format!("exit code {:?}\nstderr: {}", output.status.code(), stderr),
            });
        }

        Ok(())
    }

    fn log_line(&mut self, line: &str) {
        self.log.push_str(line);
        self.log.push('\n');
    }

    /// Log build step output (stdout/stderr) with a phase header
    fn log_build_output(&mut self, phase: &str, stdout: &str, stderr: &str) {
        self.log_line(&format!("=== {} ===", phase));
        if !stdout.is_empty() {
            self.log.push_str(stdout);
            self.log.push('\n');
        }
        if !stderr.is_empty() {
            self.log.push_str(stderr);
            self.log.push('\n');
        }
    }
}

/// `-j<n>` for make; the recipe's setting wins and zero becomes one
fn make_jobs_arg(recipe_jobs: Option<u32>, kitchen_jobs: u32) -> String {
    format!("-j{}", recipe_jobs.unwrap_or(kitchen_jobs).max(1))
}
