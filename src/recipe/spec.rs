// src/recipe/spec.rs

//! Build specifications: the resolved input every recipe behavior reads
//!
//! A [`SpecRequest`] is what a user asks for (`@1.4.18 +sigsegv %gcc`),
//! possibly leaving things open. [`Concretizer`] fills the gaps from the
//! recipe's declarations and the host, producing a [`BuildSpec`] that is
//! passed explicitly to configure-argument assembly, patch selection, and
//! verification.

use crate::error::{Error, Result};
use crate::recipe::condition::{tokenize, Token};
use crate::recipe::format::Recipe;
use crate::version::{Version, VersionRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Compiler identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compiler {
    /// Family name as used in `%family` terms (gcc, clang, intel, arm, fj, ...)
    pub family: String,
    /// Compiler version, when known
    #[serde(default)]
    pub version: Option<Version>,
}

impl Compiler {
    /// A compiler of the given family with unknown version
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            version: None,
        }
    }

    /// Set the compiler version
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// C and C++ driver names for this family
    pub fn drivers(&self) -> Option<(&'static str, &'static str)> {
        match self.family.as_str() {
            "gcc" => Some(("gcc", "g++")),
            "clang" => Some(("clang", "clang++")),
            "intel" => Some(("icc", "icpc")),
            "arm" => Some(("armclang", "armclang++")),
            "fj" => Some(("fcc", "FCC")),
            _ => None,
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new("gcc")
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.family)?;
        if let Some(v) = &self.version {
            write!(f, "@{}", v)?;
        }
        Ok(())
    }
}

/// Platform, operating system release, and target identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    /// Kernel family (`linux`, `darwin`, ...)
    pub platform: String,
    /// OS release name (`ubuntu22.04`, `sierra`, `mojave`, ...)
    pub os: String,
    /// CPU target (`x86_64`, `aarch64`, ...)
    pub target: String,
}

impl Architecture {
    pub fn new(platform: impl Into<String>, os: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            os: os.into(),
            target: target.into(),
        }
    }

    /// Detect the host architecture
    pub fn detect() -> Self {
        let platform = match std::env::consts::OS {
            "macos" => "darwin".to_string(),
            other => other.to_string(),
        };
        let os = match platform.as_str() {
            "linux" => linux_release().unwrap_or_else(|| platform.clone()),
            "darwin" => macos_release().unwrap_or_else(|| platform.clone()),
            _ => platform.clone(),
        };
        Self {
            platform,
            os,
            target: std::env::consts::ARCH.to_string(),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "platform={} os={} target={}", self.platform, self.os, self.target)
    }
}

/// `ID` + `VERSION_ID` from /etc/os-release, e.g. `ubuntu22.04`
fn linux_release() -> Option<String> {
    let content = std::fs::read_to_string("/etc/os-release").ok()?;
    parse_os_release(&content)
}

fn parse_os_release(content: &str) -> Option<String> {
    let mut id = None;
    let mut version = None;
    for line in content.lines() {
        if let Some(v) = line.strip_prefix("ID=") {
            id = Some(v.trim_matches('"').to_string());
        } else if let Some(v) = line.strip_prefix("VERSION_ID=") {
            version = Some(v.trim_matches('"').to_string());
        }
    }
    let id = id?;
    Some(match version {
        Some(v) => format!("{}{}", id, v),
        None => id,
    })
}

/// macOS release codename from `sw_vers -productVersion`
fn macos_release() -> Option<String> {
    let output = std::process::Command::new("sw_vers")
        .arg("-productVersion")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    macos_codename(String::from_utf8_lossy(&output.stdout).trim()).map(str::to_string)
}

fn macos_codename(product_version: &str) -> Option<&'static str> {
    let mut parts = product_version.split('.');
    let major = parts.next()?;
    let minor = parts.next().unwrap_or("0");
    let name = match (major, minor) {
        ("10", "12") => "sierra",
        ("10", "13") => "highsierra",
        ("10", "14") => "mojave",
        ("10", "15") => "catalina",
        ("11", _) => "bigsur",
        ("12", _) => "monterey",
        ("13", _) => "ventura",
        ("14", _) => "sonoma",
        ("15", _) => "sequoia",
        _ => return None,
    };
    Some(name)
}

/// A fully resolved build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Package name
    pub name: String,
    /// The one version selected for this build
    pub version: Version,
    /// Every declared variant with its resolved value
    pub variants: BTreeMap<String, bool>,
    pub compiler: Compiler,
    pub arch: Architecture,
    /// Install prefix
    pub prefix: PathBuf,
    /// Install prefixes of active dependencies, by package name
    #[serde(default)]
    pub dependencies: BTreeMap<String, PathBuf>,
}

impl BuildSpec {
    /// Resolved value of a variant (undeclared variants read as disabled)
    pub fn variant(&self, name: &str) -> bool {
        self.variants.get(name).copied().unwrap_or(false)
    }

    /// Install prefix of a dependency, if it is active in this build
    pub fn dependency_prefix(&self, name: &str) -> Option<&Path> {
        self.dependencies.get(name).map(PathBuf::as_path)
    }

    /// `<prefix>/bin`
    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    /// Substitute `%(...)s` placeholders
    ///
    /// Known names: `name`, `version`, `prefix`, and `<dep>.prefix` for each
    /// active dependency. Unknown placeholders are left as written.
    pub fn substitute(&self, template: &str) -> String {
        let mut result = template.replace("%(name)s", &self.name);
        result = result.replace("%(version)s", self.version.as_str());
        result = result.replace("%(prefix)s", &self.prefix.to_string_lossy());
        for (dep, prefix) in &self.dependencies {
            result = result.replace(&format!("%({}.prefix)s", dep), &prefix.to_string_lossy());
        }
        result
    }
}

impl fmt::Display for BuildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)?;
        for (name, enabled) in &self.variants {
            write!(f, "{}{}", if *enabled { "+" } else { "~" }, name)?;
        }
        write!(f, "{} {}", self.compiler, self.arch)
    }
}

/// An abstract build request, as typed on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecRequest {
    pub name: Option<String>,
    pub version: Option<VersionRange>,
    pub variants: BTreeMap<String, bool>,
    pub compiler: Option<Compiler>,
    pub platform: Option<String>,
    pub os: Option<String>,
    pub target: Option<String>,
}

impl SpecRequest {
    /// Parse a spec string such as `m4@1.4.18+sigsegv%gcc@9.3.0 os=sierra`
    pub fn parse(s: &str) -> Result<Self> {
        let mut request = SpecRequest::default();

        for token in tokenize(s)? {
            match token {
                Token::Name(name) => {
                    if request.name.replace(name).is_some() {
                        return Err(Error::InvalidSpec("Spec names more than one package".to_string()));
                    }
                }
                Token::Version(range) => {
                    if request.version.replace(range).is_some() {
                        return Err(Error::InvalidSpec("Spec has more than one version".to_string()));
                    }
                }
                Token::Variant { name, enabled } => {
                    if let Some(previous) = request.variants.insert(name.clone(), enabled)
                        && previous != enabled
                    {
                        return Err(Error::InvalidSpec(format!(
                            "Variant '{}' is both enabled and disabled",
                            name
                        )));
                    }
                }
                Token::Compiler { family, version } => {
                    let version = match version {
                        None => None,
                        Some(VersionRange::Exact(v)) => Some(v),
                        Some(range) => {
                            return Err(Error::InvalidSpec(format!(
                                "Compiler version must be a single version, got '{}'",
                                range
                            )));
                        }
                    };
                    let compiler = Compiler { family, version };
                    if request.compiler.replace(compiler).is_some() {
                        return Err(Error::InvalidSpec("Spec has more than one compiler".to_string()));
                    }
                }
                Token::KeyValue { key, value } => {
                    let slot = match key.as_str() {
                        "platform" => &mut request.platform,
                        "os" => &mut request.os,
                        "target" => &mut request.target,
                        _ => {
                            return Err(Error::InvalidSpec(format!("Unknown spec key '{}'", key)));
                        }
                    };
                    *slot = Some(value);
                }
                Token::Not(_) => {
                    return Err(Error::InvalidSpec("Negation is only allowed in predicates".to_string()));
                }
            }
        }

        Ok(request)
    }
}

/// Resolves a [`SpecRequest`] against a recipe into a [`BuildSpec`]
pub struct Concretizer<'a> {
    recipe: &'a Recipe,
    arch: Architecture,
    compiler: Compiler,
    install_root: PathBuf,
    require_dependencies: bool,
}

/// Anchor a caller-supplied path at the current directory
fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| {
        Error::InvalidSpec(format!("Cannot resolve path {}: {}", path.display(), e))
    })
}

impl<'a> Concretizer<'a> {
    /// Create a concretizer using the detected host and the default compiler
    pub fn new(recipe: &'a Recipe, install_root: impl Into<PathBuf>) -> Self {
        Self {
            recipe,
            arch: Architecture::detect(),
            compiler: Compiler::default(),
            install_root: install_root.into(),
            require_dependencies: true,
        }
    }

    /// Whether every active dependency must be given an install prefix
    ///
    /// Consumers that never read dependency prefixes (verification, patch
    /// listing) turn this off; active dependencies without a prefix are
    /// then left out of [`BuildSpec::dependencies`].
    pub fn require_dependencies(mut self, required: bool) -> Self {
        self.require_dependencies = required;
        self
    }

    /// Override the host architecture used for unspecified fields
    pub fn with_arch(mut self, arch: Architecture) -> Self {
        self.arch = arch;
        self
    }

    /// Override the compiler used when the request names none
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Resolve a request into a concrete build
    ///
    /// `prefix` overrides the default `<install_root>/<name>-<version>`.
    /// `dependencies` must provide an install prefix for every dependency
    /// whose `when` predicate holds for the resolved build, unless
    /// [`Concretizer::require_dependencies`] is off. Relative prefixes are
    /// made absolute against the current directory.
    pub fn concretize(
        &self,
        request: &SpecRequest,
        prefix: Option<PathBuf>,
        dependencies: &BTreeMap<String, PathBuf>,
    ) -> Result<BuildSpec> {
        let name = &self.recipe.package.name;
        if let Some(requested) = &request.name
            && requested != name
        {
            return Err(Error::InvalidSpec(format!(
                "Spec is for '{}' but the recipe builds '{}'",
                requested, name
            )));
        }

        let version = match &request.version {
            Some(range) => self
                .recipe
                .versions
                .iter()
                .map(|entry| &entry.version)
                .filter(|v| range.contains(v))
                .max()
                .cloned()
                .ok_or_else(|| {
                    Error::InvalidSpec(format!("No declared version of {} satisfies @{}", name, range))
                })?,
            None => self
                .recipe
                .default_version()
                .cloned()
                .ok_or_else(|| Error::InvalidSpec(format!("Recipe {} declares no versions", name)))?,
        };

        let mut variants: BTreeMap<String, bool> = self
            .recipe
            .variants
            .iter()
            .map(|(name, def)| (name.clone(), def.default))
            .collect();
        for (variant, enabled) in &request.variants {
            match variants.get_mut(variant) {
                Some(slot) => *slot = *enabled,
                None => {
                    return Err(Error::InvalidSpec(format!(
                        "Recipe {} has no variant '{}'",
                        name, variant
                    )));
                }
            }
        }

        let arch = Architecture {
            platform: request.platform.clone().unwrap_or_else(|| self.arch.platform.clone()),
            os: request.os.clone().unwrap_or_else(|| self.arch.os.clone()),
            target: request.target.clone().unwrap_or_else(|| self.arch.target.clone()),
        };

        let prefix = prefix
            .unwrap_or_else(|| self.install_root.join(format!("{}-{}", name, version)));
        let prefix = absolute(&prefix)?;

        let mut spec = BuildSpec {
            name: name.clone(),
            version,
            variants,
            compiler: request.compiler.clone().unwrap_or_else(|| self.compiler.clone()),
            arch,
            prefix,
            dependencies: BTreeMap::new(),
        };

        let mut resolved = BTreeMap::new();
        for dep in self.recipe.active_dependencies(&spec) {
            match dependencies.get(&dep.name) {
                Some(dep_prefix) => {
                    resolved.insert(dep.name.clone(), absolute(dep_prefix)?);
                }
                None if self.require_dependencies => {
                    return Err(Error::InvalidSpec(format!(
                        "{} requires {} but no install prefix was given for it",
                        spec, dep.name
                    )));
                }
                None => debug!("No install prefix for {}, leaving it unresolved", dep.name),
            }
        }
        spec.dependencies = resolved;

        for extra in dependencies.keys().filter(|d| !spec.dependencies.contains_key(*d)) {
            debug!("Ignoring prefix for inactive dependency {}", extra);
        }

        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::parser::parse_recipe;

    const RECIPE: &str = r#"
[package]
name = "m4"

[source]
mirror_path = "m4/m4-%(version)s.tar.gz"

[[versions]]
version = "1.4.18"
checksum = "sha256:ab2633921a5cd38e48797bf5521ad259bdc4b979078034a3b790d7fec5493fab"

[[versions]]
version = "1.4.17"
checksum = "sha256:3ce725133ee552b8b4baca7837fb772940b25e81b2a9dc92537aeaf733538c9e"

[variants.sigsegv]
default = true

[[dependencies]]
name = "libsigsegv"
when = "+sigsegv"
"#;

    fn deps() -> BTreeMap<String, PathBuf> {
        let mut deps = BTreeMap::new();
        deps.insert("libsigsegv".to_string(), PathBuf::from("/opt/libsigsegv"));
        deps
    }

    fn concretizer(recipe: &Recipe) -> Concretizer<'_> {
        Concretizer::new(recipe, "/opt")
            .with_arch(Architecture::new("linux", "ubuntu22.04", "x86_64"))
    }

    #[test]
    fn test_parse_spec_request() {
        let r = SpecRequest::parse("m4@1.4.18+sigsegv%gcc@9.3.0 platform=darwin os=sierra").unwrap();
        assert_eq!(r.name.as_deref(), Some("m4"));
        assert_eq!(r.version, Some(VersionRange::parse("1.4.18").unwrap()));
        assert_eq!(r.variants.get("sigsegv"), Some(&true));
        let compiler = r.compiler.unwrap();
        assert_eq!(compiler.family, "gcc");
        assert_eq!(compiler.version, Some(Version::parse("9.3.0").unwrap()));
        assert_eq!(r.platform.as_deref(), Some("darwin"));
        assert_eq!(r.os.as_deref(), Some("sierra"));
    }

    #[test]
    fn test_parse_spec_request_errors() {
        assert!(SpecRequest::parse("m4 m4").is_err());
        assert!(SpecRequest::parse("@1 @2").is_err());
        assert!(SpecRequest::parse("+sigsegv ~sigsegv").is_err());
        assert!(SpecRequest::parse("%gcc@8:9").is_err());
        assert!(SpecRequest::parse("!%gcc").is_err());
        assert!(SpecRequest::parse("arch=x86").is_err());
    }

    #[test]
    fn test_concretize_defaults() {
        let recipe = parse_recipe(RECIPE).unwrap();
        let spec = concretizer(&recipe)
            .concretize(&SpecRequest::default(), None, &deps())
            .unwrap();

        assert_eq!(spec.version.as_str(), "1.4.18");
        assert!(spec.variant("sigsegv"));
        assert_eq!(spec.compiler.family, "gcc");
        assert_eq!(spec.arch.platform, "linux");
        assert_eq!(spec.prefix, PathBuf::from("/opt/m4-1.4.18"));
        assert_eq!(spec.dependency_prefix("libsigsegv"), Some(Path::new("/opt/libsigsegv")));
    }

    #[test]
    fn test_concretize_request_overrides() {
        let recipe = parse_recipe(RECIPE).unwrap();
        let request = SpecRequest::parse("@1.4.17 ~sigsegv %clang os=rhel8").unwrap();
        let spec = concretizer(&recipe)
            .concretize(&request, Some(PathBuf::from("/tmp/m4")), &deps())
            .unwrap();

        assert_eq!(spec.version.as_str(), "1.4.17");
        assert!(!spec.variant("sigsegv"));
        assert_eq!(spec.compiler.family, "clang");
        assert_eq!(spec.arch.os, "rhel8");
        assert_eq!(spec.prefix, PathBuf::from("/tmp/m4"));
        // Inactive dependency is dropped
        assert!(spec.dependencies.is_empty());
    }

    #[test]
    fn test_concretize_version_range_picks_highest() {
        let recipe = parse_recipe(RECIPE).unwrap();
        let request = SpecRequest::parse("@1.4:").unwrap();
        let spec = concretizer(&recipe).concretize(&request, None, &deps()).unwrap();
        assert_eq!(spec.version.as_str(), "1.4.18");
    }

    #[test]
    fn test_concretize_errors() {
        let recipe = parse_recipe(RECIPE).unwrap();
        let c = concretizer(&recipe);

        let unknown_version = SpecRequest::parse("@1.4.19").unwrap();
        assert!(matches!(
            c.concretize(&unknown_version, None, &deps()),
            Err(Error::InvalidSpec(_))
        ));

        let unknown_variant = SpecRequest::parse("+debug").unwrap();
        assert!(c.concretize(&unknown_variant, None, &deps()).is_err());

        let wrong_name = SpecRequest::parse("autoconf").unwrap();
        assert!(c.concretize(&wrong_name, None, &deps()).is_err());

        // +sigsegv (default) without a libsigsegv prefix
        assert!(c
            .concretize(&SpecRequest::default(), None, &BTreeMap::new())
            .is_err());
    }

    #[test]
    fn test_concretize_without_required_dependencies() {
        let recipe = parse_recipe(RECIPE).unwrap();
        let spec = concretizer(&recipe)
            .require_dependencies(false)
            .concretize(&SpecRequest::default(), None, &BTreeMap::new())
            .unwrap();

        assert!(spec.variant("sigsegv"));
        assert!(spec.dependencies.is_empty());
        assert_eq!(recipe.active_dependencies(&spec).len(), 1);

        // Given prefixes are still used
        let spec = concretizer(&recipe)
            .require_dependencies(false)
            .concretize(&SpecRequest::default(), None, &deps())
            .unwrap();
        assert_eq!(spec.dependency_prefix("libsigsegv"), Some(Path::new("/opt/libsigsegv")));
    }

    #[test]
    fn test_concretize_relative_prefixes_made_absolute() {
        let recipe = parse_recipe(RECIPE).unwrap();
        let cwd = std::env::current_dir().unwrap();
        let mut relative_deps = BTreeMap::new();
        relative_deps.insert("libsigsegv".to_string(), PathBuf::from("deps/libsigsegv"));

        let spec = concretizer(&recipe)
            .concretize(
                &SpecRequest::default(),
                Some(PathBuf::from("install/m4")),
                &relative_deps,
            )
            .unwrap();

        assert!(spec.prefix.is_absolute());
        assert_eq!(spec.prefix, cwd.join("install/m4"));
        assert_eq!(spec.bin_dir(), cwd.join("install/m4/bin"));
        assert_eq!(
            spec.dependency_prefix("libsigsegv"),
            Some(cwd.join("deps/libsigsegv").as_path())
        );
    }

    #[test]
    fn test_substitute() {
        let recipe = parse_recipe(RECIPE).unwrap();
        let spec = concretizer(&recipe)
            .concretize(&SpecRequest::default(), None, &deps())
            .unwrap();

        assert_eq!(
            spec.substitute("--with-libsigsegv-prefix=%(libsigsegv.prefix)s"),
            "--with-libsigsegv-prefix=/opt/libsigsegv"
        );
        assert_eq!(spec.substitute("%(name)s-%(version)s"), "m4-1.4.18");
        assert_eq!(spec.substitute("%(unknown)s"), "%(unknown)s");
    }

    #[test]
    fn test_build_spec_display() {
        let recipe = parse_recipe(RECIPE).unwrap();
        let spec = concretizer(&recipe)
            .concretize(&SpecRequest::default(), None, &deps())
            .unwrap();
        assert_eq!(
            spec.to_string(),
            "m4@1.4.18+sigsegv%gcc platform=linux os=ubuntu22.04 target=x86_64"
        );
    }

    #[test]
    fn test_parse_os_release() {
        let content = "NAME=\"Ubuntu\"\nID=ubuntu\nVERSION_ID=\"22.04\"\n";
        assert_eq!(parse_os_release(content).as_deref(), Some("ubuntu22.04"));
        assert_eq!(parse_os_release("ID=arch\n").as_deref(), Some("arch"));
        assert_eq!(parse_os_release("NAME=x\n"), None);
    }

    #[test]
    fn test_macos_codename() {
        assert_eq!(macos_codename("10.12.6"), Some("sierra"));
        assert_eq!(macos_codename("10.13"), Some("highsierra"));
        assert_eq!(macos_codename("10.14.6"), Some("mojave"));
        assert_eq!(macos_codename("10.15.7"), Some("catalina"));
        assert_eq!(macos_codename("14.2.1"), Some("sonoma"));
        assert_eq!(macos_codename("9.0"), None);
    }

    #[test]
    fn test_compiler_drivers() {
        assert_eq!(Compiler::new("clang").drivers(), Some(("clang", "clang++")));
        assert_eq!(Compiler::new("fj").drivers(), Some(("fcc", "FCC")));
        assert_eq!(Compiler::new("nvhpc").drivers(), None);
    }
}
