// src/commands/recipe.rs

//! Recipe inspection commands: show, validate, args, patches

use super::{load_recipe, resolve};
use crate::cli::SpecArgs;
use anyhow::{Context, Result};
use m4_recipe::recipe::{validate_recipe, PatchSource};

/// Show recipe metadata
pub fn cmd_show(recipe_path: &str, json: bool) -> Result<()> {
    let recipe = load_recipe(recipe_path)?;

    if json {
        let out = serde_json::to_string_pretty(&recipe).context("Failed to serialize recipe")?;
        println!("{}", out);
        return Ok(());
    }

    println!("Package: {}", recipe.package.name);
    if let Some(summary) = &recipe.package.summary {
        println!("Summary: {}", summary);
    }
    if let Some(homepage) = &recipe.package.homepage {
        println!("Homepage: {}", homepage);
    }

    println!("\nVersions:");
    let default = recipe.default_version();
    for entry in &recipe.versions {
        let marker = if Some(&entry.version) == default { " (default)" } else { "" };
        println!("  {}{}  {}", entry.version, marker, entry.checksum);
    }

    if !recipe.variants.is_empty() {
        println!("\nVariants:");
        for (name, variant) in &recipe.variants {
            println!(
                "  {} [default: {}]  {}",
                name,
                variant.default,
                variant.description.as_deref().unwrap_or("")
            );
        }
    }

    if !recipe.dependencies.is_empty() {
        println!("\nDependencies:");
        for dep in &recipe.dependencies {
            println!("  {}  when: {}", dep.name, display_when(&dep.when.to_string()));
        }
    }

    if !recipe.patches.is_empty() {
        println!("\nPatches:");
        for patch in &recipe.patches {
            println!("  {}  when: {}", patch.name(), display_when(&patch.when.to_string()));
        }
    }

    if let Some(dir) = &recipe.build.directory {
        println!("\nBuild directory: {}", dir);
    }

    Ok(())
}

fn display_when(when: &str) -> &str {
    if when.is_empty() { "always" } else { when }
}

/// Validate a recipe and print its warnings
pub fn cmd_validate(recipe_path: &str) -> Result<()> {
    let recipe = load_recipe(recipe_path)?;
    let warnings = validate_recipe(&recipe).with_context(|| "Recipe validation failed")?;

    for warning in &warnings {
        println!("Warning: {}", warning);
    }

    println!("Recipe validation passed");
    if warnings.is_empty() {
        println!("[OK] No issues found");
    } else {
        println!("[OK] {} warning(s)", warnings.len());
    }
    Ok(())
}

/// Print configure arguments, one per line
pub fn cmd_args(args: &SpecArgs) -> Result<()> {
    let (recipe, spec) = resolve(args, true)?;
    for arg in recipe.configure_args(&spec) {
        println!("{}", arg);
    }
    Ok(())
}

/// Print applicable patches in application order
pub fn cmd_patches(args: &SpecArgs) -> Result<()> {
    let (recipe, spec) = resolve(args, false)?;
    for patch in recipe.applicable_patches(&spec) {
        match patch.source(&recipe) {
            Some(PatchSource::Local(path)) => println!("{}", path.display()),
            Some(PatchSource::Remote { url, .. }) => println!("{}", url),
            None => println!("{}", patch.name()),
        }
    }
    Ok(())
}
