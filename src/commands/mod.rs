// src/commands/mod.rs
//! Command handlers for the m4-recipe CLI

mod cook;
mod recipe;

pub use cook::{cmd_cook, cmd_fetch, CookOptions};
pub use recipe::{cmd_args, cmd_patches, cmd_show, cmd_validate};
pub use test::cmd_test;

use crate::cli::SpecArgs;
use anyhow::{anyhow, Context, Result};
use m4_recipe::recipe::{parse_recipe_file, BuildSpec, Concretizer, Recipe, SpecRequest};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Load a recipe file
pub(crate) fn load_recipe(path: &str) -> Result<Recipe> {
    let path = Path::new(path);
    parse_recipe_file(path).with_context(|| format!("Failed to parse recipe: {}", path.display()))
}

/// Root under which builds are installed when no --prefix is given
pub(crate) fn default_install_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("m4-recipe")
}

/// Parse a NAME=PREFIX dependency argument
pub(crate) fn parse_dep(arg: &str) -> Result<(String, PathBuf)> {
    match arg.split_once('=') {
        Some((name, prefix)) if !name.is_empty() && !prefix.is_empty() => {
            Ok((name.to_string(), PathBuf::from(prefix)))
        }
        _ => Err(anyhow!("Invalid dependency '{}', expected NAME=PREFIX", arg)),
    }
}

/// Load the recipe and resolve the requested build
///
/// Commands that pass dependency prefixes on to the build (`args`, `fetch`,
/// `cook`) set `require_dependencies`; the others accept an unresolved one.
pub(crate) fn resolve(args: &SpecArgs, require_dependencies: bool) -> Result<(Recipe, BuildSpec)> {
    let recipe = load_recipe(&args.recipe.recipe)?;

    let request = SpecRequest::parse(&args.spec)
        .with_context(|| format!("Invalid spec: {}", args.spec))?;

    let deps = args
        .deps
        .iter()
        .map(|d| parse_dep(d))
        .collect::<Result<BTreeMap<_, _>>>()?;

    let spec = Concretizer::new(&recipe, default_install_root())
        .require_dependencies(require_dependencies)
        .concretize(&request, args.prefix.as_ref().map(PathBuf::from), &deps)
        .with_context(|| format!("Cannot build {} as requested", recipe.package.name))?;

    Ok((recipe, spec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dep() {
        let (name, prefix) = parse_dep("libsigsegv=/opt/libsigsegv").unwrap();
        assert_eq!(name, "libsigsegv");
        assert_eq!(prefix, PathBuf::from("/opt/libsigsegv"));

        assert!(parse_dep("libsigsegv").is_err());
        assert!(parse_dep("=/opt").is_err());
        assert!(parse_dep("libsigsegv=").is_err());
    }
}
