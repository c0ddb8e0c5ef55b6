// src/recipe/mod.rs

//! Recipe system for building packages from source
//!
//! Recipes define how to build an Autotools package from source, including:
//! - Declared versions and their checksums
//! - Patches and the builds they apply to
//! - Variants and conditional dependencies
//! - Configure arguments as a table of `(arg, when)` rules
//! - A post-install smoke test
//!
//! # Culinary Terminology
//!
//! - **Recipe**: The build specification (like a recipe card)
//! - **Cook**: Build a package from a recipe
//! - **Kitchen**: The build pipeline
//! - **Prep**: Fetch and prepare sources
//!
//! # Example Recipe
//!
//! ```toml
//! [package]
//! name = "m4"
//!
//! [source]
//! mirror_path = "m4/m4-%(version)s.tar.gz"
//!
//! [[versions]]
//! version = "1.4.18"
//! checksum = "sha256:ab2633921a5cd38e48797bf5521ad259bdc4b979078034a3b790d7fec5493fab"
//!
//! [variants.sigsegv]
//! default = true
//!
//! [[dependencies]]
//! name = "libsigsegv"
//! when = "+sigsegv"
//!
//! [[configure]]
//! arg = "--with-libsigsegv-prefix=%(libsigsegv.prefix)s"
//! when = "+sigsegv"
//! ```

pub mod condition;
pub mod configure;
mod format;
pub mod kitchen;
pub mod parser;
pub mod spec;

pub use condition::{Condition, Term};
pub use configure::{configure_args, ConfigureRule};
pub use format::{
    BuildSection, DependencyDef, Fixture, PackageSection, PatchDef, PatchSource, Recipe,
    SourceSection, TestSection, VariantDef, VersionEntry, DEFAULT_GNU_MIRRORS,
};
pub use kitchen::{Cook, CookResult, Kitchen, KitchenConfig};
pub use parser::{parse_recipe, parse_recipe_file, validate_recipe};
pub use spec::{Architecture, BuildSpec, Compiler, Concretizer, SpecRequest};
