// src/recipe/parser.rs

//! Recipe file parsing

use crate::error::{Error, Result};
use crate::recipe::format::Recipe;
use std::collections::HashSet;
use std::path::Path;

/// Parse a recipe from a TOML string
pub fn parse_recipe(content: &str) -> Result<Recipe> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid recipe: {}", e)))
}

/// Parse a recipe from a file
///
/// Local patch and fixture paths resolve relative to the file's directory.
pub fn parse_recipe_file(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::IoError(format!("Failed to read recipe file {}: {}", path.display(), e)))?;

    let mut recipe = parse_recipe(&content)?;
    recipe.recipe_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(recipe)
}

/// Validate a recipe for completeness and correctness
///
/// Hard errors are returned as `Err`; soft problems as warnings.
pub fn validate_recipe(recipe: &Recipe) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if recipe.package.name.is_empty() {
        return Err(Error::ParseError("Recipe package name cannot be empty".to_string()));
    }
    if recipe.versions.is_empty() {
        return Err(Error::ParseError("Recipe declares no versions".to_string()));
    }
    if !recipe.source.mirror_path.contains("%(version)s") {
        return Err(Error::ParseError(format!(
            "Source mirror_path '{}' does not contain %(version)s",
            recipe.source.mirror_path
        )));
    }

    let mut seen = HashSet::new();
    for entry in &recipe.versions {
        if !seen.insert(entry.version.as_str()) {
            return Err(Error::ParseError(format!("Version {} declared twice", entry.version)));
        }
    }
    if recipe.versions.iter().filter(|e| e.preferred).count() > 1 {
        warnings.push("More than one version marked preferred; the first wins".to_string());
    }

    for patch in &recipe.patches {
        match (&patch.file, &patch.url) {
            (Some(_), Some(_)) => {
                return Err(Error::ParseError(format!(
                    "Patch {} has both file and url",
                    patch.name()
                )));
            }
            (None, None) => {
                return Err(Error::ParseError("Patch has neither file nor url".to_string()));
            }
            (None, Some(url)) => {
                if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("file://")) {
                    return Err(Error::ParseError(format!("Unsupported patch URL: {}", url)));
                }
                if patch.checksum.is_none() {
                    return Err(Error::ParseError(format!("Remote patch {} has no checksum", url)));
                }
            }
            (Some(file), None) => {
                if !recipe.recipe_dir.as_os_str().is_empty() && !recipe.local_path(file).exists() {
                    warnings.push(format!("Patch file {} not found", file));
                }
            }
        }
    }

    // Predicates may only reference declared variants
    let conditions = recipe
        .patches
        .iter()
        .map(|p| &p.when)
        .chain(recipe.dependencies.iter().map(|d| &d.when))
        .chain(recipe.configure.iter().map(|c| &c.when));
    for condition in conditions {
        for name in condition.variant_names() {
            if !recipe.variants.contains_key(name) {
                return Err(Error::ParseError(format!(
                    "Predicate '{}' references undeclared variant '{}'",
                    condition, name
                )));
            }
        }
    }

    if recipe.package.summary.is_none() {
        warnings.push("Missing package summary".to_string());
    }
    if recipe.package.homepage.is_none() {
        warnings.push("Missing package homepage".to_string());
    }
    if recipe.configure.is_empty() {
        warnings.push("No configure arguments declared".to_string());
    }
    if recipe.test.is_none() {
        warnings.push("No [test] section; installs cannot be verified".to_string());
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[package]
name = "m4"

[source]
mirror_path = "m4/m4-%(version)s.tar.gz"

[[versions]]
version = "1.4.18"
checksum = "sha256:ab2633921a5cd38e48797bf5521ad259bdc4b979078034a3b790d7fec5493fab"
"#;

    #[test]
    fn test_parse_valid_recipe() {
        let recipe = parse_recipe(MINIMAL).unwrap();
        assert_eq!(recipe.package.name, "m4");
        assert_eq!(recipe.versions.len(), 1);
        assert!(recipe.patches.is_empty());
    }

    #[test]
    fn test_parse_invalid_recipe() {
        let content = "this is not valid toml at all {}";
        assert!(parse_recipe(content).is_err());
    }

    #[test]
    fn test_parse_bad_checksum() {
        let content = MINIMAL.replace("sha256:ab26", "md5:ab26");
        assert!(parse_recipe(&content).is_err());
    }

    #[test]
    fn test_parse_bad_predicate() {
        let content = format!("{}\n[[configure]]\narg = \"x\"\nwhen = \"+\"\n", MINIMAL);
        assert!(parse_recipe(&content).is_err());
    }

    #[test]
    fn test_validate_empty_name() {
        let content = MINIMAL.replace("name = \"m4\"", "name = \"\"");
        let recipe = parse_recipe(&content).unwrap();
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_remote_patch_without_checksum() {
        let content = format!("{}\n[[patches]]\nurl = \"https://example.org/a.patch\"\n", MINIMAL);
        let recipe = parse_recipe(&content).unwrap();
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_undeclared_variant() {
        let content = format!("{}\n[[dependencies]]\nname = \"libsigsegv\"\nwhen = \"+sigsegv\"\n", MINIMAL);
        let recipe = parse_recipe(&content).unwrap();
        assert!(validate_recipe(&recipe).is_err());

        let declared = format!("{}\n[variants.sigsegv]\ndefault = true\n", content);
        let recipe = parse_recipe(&declared).unwrap();
        assert!(validate_recipe(&recipe).is_ok());
    }

    #[test]
    fn test_validate_duplicate_version() {
        let duplicate = format!(
            "{}\n[[versions]]\nversion = \"1.4.18\"\nchecksum = \"sha256:ab2633921a5cd38e48797bf5521ad259bdc4b979078034a3b790d7fec5493fab\"\n",
            MINIMAL
        );
        let recipe = parse_recipe(&duplicate).unwrap();
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_warnings() {
        let recipe = parse_recipe(MINIMAL).unwrap();
        let warnings = validate_recipe(&recipe).unwrap();
        assert!(warnings.iter().any(|w| w.contains("summary")));
        assert!(warnings.iter().any(|w| w.contains("configure")));
        assert!(warnings.iter().any(|w| w.contains("[test]")));
    }

    #[test]
    fn test_parse_recipe_file_sets_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipe.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let recipe = parse_recipe_file(&path).unwrap();
        assert_eq!(recipe.recipe_dir, dir.path());
        assert_eq!(recipe.local_path("data/hello.m4"), dir.path().join("data/hello.m4"));
    }
}
