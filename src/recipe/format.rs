// src/recipe/format.rs

//! Recipe file format definitions
//!
//! Recipes are TOML files that describe how to fetch, patch, configure,
//! build, and verify a single Autotools package. Everything that varies with
//! the build (patches, dependencies, configure arguments) is gated by a
//! `when` predicate evaluated against a [`BuildSpec`].

use crate::hash::Checksum;
use crate::recipe::condition::Condition;
use crate::recipe::configure::{self, ConfigureRule};
use crate::recipe::spec::BuildSpec;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// GNU mirrors tried in order when a recipe lists none
pub const DEFAULT_GNU_MIRRORS: &[&str] = &[
    "https://ftpmirror.gnu.org",
    "https://ftp.gnu.org/gnu",
    "https://mirrors.kernel.org/gnu",
];

/// A complete recipe for building a package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Package metadata
    pub package: PackageSection,

    /// Where source archives come from
    pub source: SourceSection,

    /// Declared versions, each bound to a checksum
    #[serde(default)]
    pub versions: Vec<VersionEntry>,

    /// Patches, applied in declaration order
    #[serde(default)]
    pub patches: Vec<PatchDef>,

    /// Boolean build toggles
    #[serde(default)]
    pub variants: BTreeMap<String, VariantDef>,

    /// Conditional dependencies on other packages
    #[serde(default)]
    pub dependencies: Vec<DependencyDef>,

    /// Build directory and environment
    #[serde(default)]
    pub build: BuildSection,

    /// Configure-argument rules, evaluated in declaration order
    #[serde(default)]
    pub configure: Vec<ConfigureRule>,

    /// Post-install verification (optional)
    #[serde(default)]
    pub test: Option<TestSection>,

    /// Directory the recipe was loaded from; local paths resolve against it
    #[serde(skip)]
    pub recipe_dir: PathBuf,
}

impl Recipe {
    /// Upstream archive URLs for a version, one per mirror
    pub fn source_urls(&self, version: &Version) -> Vec<String> {
        let path = self.mirror_path(version);
        let mirrors: Vec<&str> = if self.source.mirrors.is_empty() {
            DEFAULT_GNU_MIRRORS.to_vec()
        } else {
            self.source.mirrors.iter().map(String::as_str).collect()
        };
        mirrors
            .into_iter()
            .map(|mirror| format!("{}/{}", mirror.trim_end_matches('/'), path))
            .collect()
    }

    fn mirror_path(&self, version: &Version) -> String {
        self.source
            .mirror_path
            .replace("%(name)s", &self.package.name)
            .replace("%(version)s", version.as_str())
    }

    /// Get the archive filename for a version
    pub fn archive_filename(&self, version: &Version) -> String {
        self.mirror_path(version)
            .split('/')
            .next_back()
            .unwrap_or("source.tar.gz")
            .to_string()
    }

    /// Look up the declaration of a version
    pub fn version_entry(&self, version: &Version) -> Option<&VersionEntry> {
        self.versions.iter().find(|entry| &entry.version == version)
    }

    /// The version built when none is requested
    ///
    /// The first version marked `preferred`, otherwise the highest declared.
    pub fn default_version(&self) -> Option<&Version> {
        self.versions
            .iter()
            .find(|entry| entry.preferred)
            .or_else(|| self.versions.iter().max_by(|a, b| a.version.cmp(&b.version)))
            .map(|entry| &entry.version)
    }

    /// Patches that apply to a build, in declaration order
    pub fn applicable_patches(&self, spec: &BuildSpec) -> Vec<&PatchDef> {
        self.patches
            .iter()
            .filter(|patch| patch.when.satisfied_by(spec))
            .collect()
    }

    /// Dependencies active for a build
    pub fn active_dependencies(&self, spec: &BuildSpec) -> Vec<&DependencyDef> {
        self.dependencies
            .iter()
            .filter(|dep| dep.when.satisfied_by(spec))
            .collect()
    }

    /// Ordered configure arguments for a build
    pub fn configure_args(&self, spec: &BuildSpec) -> Vec<String> {
        configure::configure_args(&self.configure, spec)
    }

    /// Resolve a recipe-relative path
    pub fn local_path(&self, relative: &str) -> PathBuf {
        let path = Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.recipe_dir.join(path)
        }
    }
}

/// Package metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    /// Package name
    pub name: String,

    /// Short description
    #[serde(default)]
    pub summary: Option<String>,

    /// Project homepage
    #[serde(default)]
    pub homepage: Option<String>,

    /// License identifier
    #[serde(default)]
    pub license: Option<String>,
}

/// Source archive locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Archive path below each mirror, e.g. `m4/m4-%(version)s.tar.gz`
    pub mirror_path: String,

    /// Mirror base URLs; GNU mirrors when empty
    #[serde(default)]
    pub mirrors: Vec<String>,
}

/// One declared version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: Version,

    /// Checksum of the upstream archive
    pub checksum: Checksum,

    /// Build this version by default
    #[serde(default)]
    pub preferred: bool,
}

/// A patch and the builds it applies to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchDef {
    /// Patch file, relative to the recipe directory
    #[serde(default)]
    pub file: Option<String>,

    /// Remote patch URL
    #[serde(default)]
    pub url: Option<String>,

    /// Checksum, required for remote patches
    #[serde(default)]
    pub checksum: Option<Checksum>,

    /// Leading path components to strip (`patch -p`)
    #[serde(default = "default_strip")]
    pub strip: u32,

    /// Applicability predicate
    #[serde(default)]
    pub when: Condition,
}

fn default_strip() -> u32 {
    1
}

/// Where a patch comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchSource<'a> {
    /// File shipped alongside the recipe
    Local(PathBuf),
    /// Downloaded and checksum-verified
    Remote {
        url: &'a str,
        checksum: Option<&'a Checksum>,
    },
}

impl PatchDef {
    /// Resolve the patch source against a recipe
    ///
    /// Returns `None` when the patch names neither a file nor a URL.
    pub fn source<'a>(&'a self, recipe: &Recipe) -> Option<PatchSource<'a>> {
        match (&self.file, &self.url) {
            (Some(file), _) => Some(PatchSource::Local(recipe.local_path(file))),
            (None, Some(url)) => Some(PatchSource::Remote {
                url,
                checksum: self.checksum.as_ref(),
            }),
            (None, None) => None,
        }
    }

    /// Name for display and for the download cache
    pub fn name(&self) -> &str {
        let location = self.file.as_deref().or(self.url.as_deref()).unwrap_or("");
        location.rsplit('/').next().unwrap_or(location)
    }
}

/// A boolean build toggle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantDef {
    /// Value when the request does not set it
    pub default: bool,

    #[serde(default)]
    pub description: Option<String>,
}

/// A dependency on another package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyDef {
    /// Package name
    pub name: String,

    /// The dependency is active only when this holds
    #[serde(default)]
    pub when: Condition,
}

/// Build section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSection {
    /// Out-of-tree build directory, relative to the source root
    #[serde(default)]
    pub directory: Option<String>,

    /// Parallel make jobs (overrides the kitchen default)
    #[serde(default)]
    pub jobs: Option<u32>,

    /// Extra environment for configure and make
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

/// Post-install verification section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSection {
    /// Installed executable name
    pub executable: String,

    /// Flag that prints the version
    #[serde(default = "default_version_flag")]
    pub version_flag: String,

    /// Input/expected-output pairs, relative to the work directory
    #[serde(default)]
    pub fixtures: Vec<Fixture>,
}

fn default_version_flag() -> String {
    "--version".to_string()
}

/// Script run through the installed tool and its expected stdout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub input: String,
    pub expected: String,
}
