// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use m4_recipe::recipe::{
    parse_recipe_file, Architecture, BuildSpec, Compiler, Concretizer, Recipe, SpecRequest,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix handed to the concretizer for libsigsegv
pub const LIBSIGSEGV_PREFIX: &str = "/opt/libsigsegv";

/// The recipe shipped in recipes/m4
pub fn shipped_recipe() -> Recipe {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("recipes/m4/recipe.toml");
    parse_recipe_file(&path).unwrap()
}

/// Directory holding the shipped recipe and its data/ fixtures
pub fn recipe_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("recipes/m4")
}

/// Resolve a spec string against the shipped recipe on the given platform/OS
pub fn concretize(recipe: &Recipe, spec: &str, platform: &str, os: &str) -> BuildSpec {
    let mut deps = BTreeMap::new();
    deps.insert("libsigsegv".to_string(), PathBuf::from(LIBSIGSEGV_PREFIX));

    Concretizer::new(recipe, "/opt")
        .with_arch(Architecture::new(platform, os, "x86_64"))
        .with_compiler(Compiler::new("gcc"))
        .concretize(&SpecRequest::parse(spec).unwrap(), None, &deps)
        .unwrap()
}

/// Write an executable shell script
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Install a stand-in m4 into `<prefix>/bin`
///
/// `--version` prints `version_line`; any other invocation prints the
/// contents of `output`.
#[cfg(unix)]
pub fn install_fake_m4(prefix: &Path, version_line: &str, output: &Path) -> PathBuf {
    let path = prefix.join("bin").join("m4");
    write_script(
        &path,
        &format!(
            "if [ \"$1\" = \"--version\" ]; then\n  echo '{}'\n  exit 0\nfi\ncat '{}'",
            version_line,
            output.display()
        ),
    );
    path
}

/// Copy the shipped data/ fixtures into `work_dir/data`
pub fn copy_fixtures(work_dir: &Path) {
    let data = work_dir.join("data");
    fs::create_dir_all(&data).unwrap();
    for name in ["hello.m4", "hello.out"] {
        fs::copy(recipe_dir().join("data").join(name), data.join(name)).unwrap();
    }
}
