// src/recipe/kitchen/mod.rs

//! Kitchen: fetching, building, and installing recipes
//!
//! The Kitchen runs the Autotools pipeline for a resolved [`BuildSpec`]:
//! - Fetching the source archive and remote patches into a checksum-keyed cache
//! - Extracting and patching sources
//! - Running configure, make, (make check), and make install
//! - Verifying the installed tool against the recipe's fixtures

mod archive;
mod config;
mod cook;

pub use archive::{apply_patch, extract_archive, verify_file_checksum, Downloader};
pub use config::{CookResult, KitchenConfig};
pub use cook::Cook;

use crate::error::{Error, Result};
use crate::hash::Checksum;
use crate::recipe::format::{PatchSource, Recipe};
use crate::recipe::spec::BuildSpec;
use crate::verify::{verify_install, VerifyContext};
use crate::version::Version;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// The Kitchen: where recipes are cooked
pub struct Kitchen {
    pub(crate) config: KitchenConfig,
}

impl Kitchen {
    /// Create a new Kitchen with the given configuration
    pub fn new(config: KitchenConfig) -> Self {
        Self { config }
    }

    /// Create a Kitchen with default configuration
    pub fn with_defaults() -> Self {
        Self::new(KitchenConfig::default())
    }

    /// The kitchen's configuration
    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    /// Cook a recipe for a resolved build and install it into the spec's prefix
    ///
    /// ## Cooking Process
    /// 1. **Prep**: Fetch the source archive and remote patches (network)
    /// 2. **Unpack**: Extract sources and apply applicable patches
    /// 3. **Configure**: `configure --prefix=<prefix> <recipe args>`
    /// 4. **Build**: `make -j<jobs>`
    /// 5. **Check**: `make check` (optional, failures are warnings)
    /// 6. **Install**: `make install`
    /// 7. **Test**: Post-install verification (optional)
    pub fn cook(&self, recipe: &Recipe, spec: &BuildSpec) -> Result<CookResult> {
        info!("Cooking {}", spec);

        let mut cook = Cook::new(self, recipe, spec)?;

        info!("Prep: fetching ingredients...");
        cook.prep()?;

        info!("Unpacking and patching sources...");
        cook.unpack()?;
        cook.patch()?;

        info!("Configuring...");
        cook.configure()?;

        info!("Simmering: running build...");
        cook.build()?;

        if self.config.run_checks {
            cook.check()?;
        }

        info!("Installing into {}", spec.prefix.display());
        cook.install()?;

        let verification = match (&recipe.test, self.config.run_tests) {
            (Some(test), true) => {
                let work_dir = self
                    .config
                    .work_dir
                    .clone()
                    .unwrap_or_else(|| recipe.recipe_dir.clone());
                let ctx = VerifyContext::for_spec(test, spec, work_dir);
                Some(verify_install(&ctx)?)
            }
            (None, true) => {
                cook.warnings.push("Recipe has no [test] section; skipping verification".to_string());
                None
            }
            (_, false) => None,
        };

        let log = std::mem::take(&mut cook.log);
        let warnings = std::mem::take(&mut cook.warnings);
        let configure_args = std::mem::take(&mut cook.configure_args);
        let patches_applied = std::mem::take(&mut cook.patches_applied);

        let build_dir = if self.config.keep_builddir {
            let path = cook.keep();
            info!("Build directory kept at {}", path.display());
            Some(path)
        } else {
            None
        };

        Ok(CookResult {
            prefix: spec.prefix.clone(),
            configure_args,
            patches_applied,
            log,
            warnings,
            build_dir,
            verification,
        })
    }

    /// Fetch sources for a build without building
    ///
    /// Downloads and verifies the source archive for the spec's version and
    /// every remote patch that applies to the spec.
    ///
    /// # Returns
    /// A list of paths to the fetched and cached source files.
    pub fn fetch(&self, recipe: &Recipe, spec: &BuildSpec) -> Result<Vec<PathBuf>> {
        info!("Fetching sources for {}", spec);

        let mut fetched = vec![self.fetch_archive(recipe, &spec.version)?];

        for patch in recipe.applicable_patches(spec) {
            if let Some(PatchSource::Remote { url, checksum }) = patch.source(recipe) {
                let checksum = checksum.ok_or_else(|| {
                    Error::ParseError(format!("Remote patch {} has no checksum", url))
                })?;
                info!("Fetching patch: {}", url);
                fetched.push(self.fetch_source(&[url.to_string()], checksum)?);
            }
        }

        info!("Fetched {} source file(s) for {}", fetched.len(), spec.name);
        Ok(fetched)
    }

    /// Check if all sources for a build are already cached
    pub fn sources_cached(&self, recipe: &Recipe, spec: &BuildSpec) -> bool {
        let Some(entry) = recipe.version_entry(&spec.version) else {
            return false;
        };
        if !self.cache_path(&entry.checksum).exists() {
            return false;
        }

        recipe.applicable_patches(spec).iter().all(|patch| {
            match patch.source(recipe) {
                Some(PatchSource::Remote { checksum: Some(checksum), .. }) => {
                    self.cache_path(checksum).exists()
                }
                Some(PatchSource::Remote { checksum: None, .. }) => false,
                _ => true,
            }
        })
    }

    /// Fetch the upstream archive for a declared version
    pub(crate) fn fetch_archive(&self, recipe: &Recipe, version: &Version) -> Result<PathBuf> {
        let entry = recipe.version_entry(version).ok_or_else(|| {
            Error::NotFound(format!("{} has no version {}", recipe.package.name, version))
        })?;
        self.fetch_source(&recipe.source_urls(version), &entry.checksum)
    }

    fn cache_path(&self, checksum: &Checksum) -> PathBuf {
        self.config.source_cache.join(checksum.cache_key())
    }

    /// Fetch a source file into the cache
    ///
    /// URLs are tried in order until one yields content with the expected
    /// checksum. Content is only moved into the cache after verification.
    pub(crate) fn fetch_source(&self, urls: &[String], checksum: &Checksum) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.source_cache)?;

        let cached_path = self.cache_path(checksum);

        if cached_path.exists() {
            debug!("Using cached source: {}", cached_path.display());
            match verify_file_checksum(&cached_path, checksum) {
                Ok(()) => return Ok(cached_path),
                Err(e) => {
                    warn!("Cached file invalid ({}), re-downloading", e);
                    fs::remove_file(&cached_path)?;
                }
            }
        }

        let downloader = Downloader::new()?;
        let temp_path = self
            .config
            .source_cache
            .join(format!("{}.tmp", checksum.cache_key()));

        let mut last_error = Error::NotFound("No source URLs given".to_string());
        for url in urls {
            let result = downloader
                .download_file(url, &temp_path)
                .and_then(|()| verify_file_checksum(&temp_path, checksum));

            match result {
                Ok(()) => {
                    fs::rename(&temp_path, &cached_path)?;
                    return Ok(cached_path);
                }
                Err(e) => {
                    warn!("Fetching {} failed: {}", url, e);
                    if temp_path.exists() {
                        fs::remove_file(&temp_path)?;
                    }
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
