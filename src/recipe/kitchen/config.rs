// src/recipe/kitchen/config.rs

//! Configuration types for the Kitchen build system

use crate::verify::VerifyReport;
use std::path::PathBuf;

/// Configuration for the Kitchen
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// Directory for downloaded sources and remote patches
    pub source_cache: PathBuf,
    /// Number of parallel make jobs
    pub jobs: u32,
    /// Keep build directory after completion (for debugging)
    pub keep_builddir: bool,
    /// Run `make check` after building; failures become warnings
    pub run_checks: bool,
    /// Run the recipe's post-install verification after `make install`
    pub run_tests: bool,
    /// Directory holding test fixtures; the recipe directory when unset
    pub work_dir: Option<PathBuf>,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);

        let source_cache = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("m4-recipe")
            .join("sources");

        Self {
            source_cache,
            jobs,
            keep_builddir: false,
            run_checks: false,
            run_tests: true,
            work_dir: None,
        }
    }
}

impl KitchenConfig {
    /// Configuration with an explicit source cache
    pub fn with_source_cache(source_cache: impl Into<PathBuf>) -> Self {
        Self {
            source_cache: source_cache.into(),
            ..Self::default()
        }
    }
}

/// Result of cooking a recipe
#[derive(Debug)]
pub struct CookResult {
    /// Install prefix the package was installed into
    pub prefix: PathBuf,
    /// Arguments passed to configure after `--prefix`
    pub configure_args: Vec<String>,
    /// Names of patches applied, in order
    pub patches_applied: Vec<String>,
    /// Build log
    pub log: String,
    /// Warnings generated during build
    pub warnings: Vec<String>,
    /// Build directory, when kept
    pub build_dir: Option<PathBuf>,
    /// Post-install verification (if run_tests was enabled)
    pub verification: Option<VerifyReport>,
}
