// src/commands/cook.rs

//! Cook command - build packages from recipes

use super::resolve;
use crate::cli::SpecArgs;
use anyhow::{Context, Result};
use m4_recipe::recipe::{validate_recipe, Kitchen, KitchenConfig};
use std::path::PathBuf;
use tracing::info;

/// Kitchen overrides from the command line
#[derive(Debug, Default)]
pub struct CookOptions {
    pub source_cache: Option<String>,
    pub jobs: Option<u32>,
    pub keep_builddir: bool,
    pub run_checks: bool,
    pub no_test: bool,
    pub work_dir: Option<String>,
}

impl CookOptions {
    fn kitchen_config(&self) -> KitchenConfig {
        let mut config = KitchenConfig {
            keep_builddir: self.keep_builddir,
            run_checks: self.run_checks,
            run_tests: !self.no_test,
            work_dir: self.work_dir.as_ref().map(PathBuf::from),
            ..Default::default()
        };
        if let Some(cache) = &self.source_cache {
            config.source_cache = PathBuf::from(cache);
        }
        if let Some(j) = self.jobs {
            config.jobs = j;
        }
        config
    }
}

/// Fetch sources for a build without building
pub fn cmd_fetch(args: &SpecArgs, source_cache: Option<String>) -> Result<()> {
    let (recipe, spec) = resolve(args, true)?;
    let options = CookOptions {
        source_cache,
        ..Default::default()
    };
    let kitchen = Kitchen::new(options.kitchen_config());

    println!("Fetching sources for {}...", spec);
    let sources = kitchen
        .fetch(&recipe, &spec)
        .with_context(|| format!("Failed to fetch sources for {}", recipe.package.name))?;

    println!("\n[COMPLETE] Fetched {} source file(s):", sources.len());
    for source in &sources {
        println!("  - {}", source.display());
    }

    if kitchen.sources_cached(&recipe, &spec) {
        println!("\n[OK] All sources are cached. Ready for offline build.");
    }
    Ok(())
}

/// Cook a package from a recipe
pub fn cmd_cook(args: &SpecArgs, options: CookOptions) -> Result<()> {
    let (recipe, spec) = resolve(args, true)?;

    let warnings = validate_recipe(&recipe).with_context(|| "Recipe validation failed")?;
    for warning in &warnings {
        println!("Warning: {}", warning);
    }

    let kitchen = Kitchen::new(options.kitchen_config());

    println!("Cooking {}", spec);
    println!("  - Prefix: {}", spec.prefix.display());
    println!("  - {} parallel jobs", kitchen.config().jobs);
    if kitchen.sources_cached(&recipe, &spec) {
        println!("  - Sources already cached (offline build possible)");
    }

    let result = kitchen
        .cook(&recipe, &spec)
        .with_context(|| format!("Failed to cook {}", spec))?;

    info!("Cooked {} into {}", spec.name, result.prefix.display());

    println!("\n[COMPLETE] Installed {} into {}", spec.name, result.prefix.display());
    if !result.patches_applied.is_empty() {
        println!("Patches applied:");
        for patch in &result.patches_applied {
            println!("  - {}", patch);
        }
    }
    println!("Configure arguments:");
    for arg in &result.configure_args {
        println!("  {}", arg);
    }
    if let Some(report) = &result.verification {
        println!(
            "[OK] Verified {} ({})",
            report.executable.display(),
            report.version_line
        );
    }
    if let Some(dir) = &result.build_dir {
        println!("Build directory kept at {}", dir.display());
    }
    for warning in &result.warnings {
        println!("Warning: {}", warning);
    }

    Ok(())
}
