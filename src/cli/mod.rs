// src/cli/mod.rs
//! CLI definitions for m4-recipe
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! Inspection:
//! - `show` - Recipe metadata, versions, variants, patches
//! - `validate` - Parse and validate a recipe
//! - `args` - Configure arguments for a build
//! - `patches` - Patches that apply to a build
//!
//! Building:
//! - `fetch` - Download and verify sources
//! - `cook` - Fetch, patch, configure, build, install, and test
//! - `test` - Verify an existing install

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Default recipe location
pub const DEFAULT_RECIPE: &str = "recipes/m4/recipe.toml";

#[derive(Parser)]
#[command(name = "m4-recipe")]
#[command(author = "m4-recipe Contributors")]
#[command(version)]
#[command(about = "Build and verify GNU M4 from its recipe", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Recipe file selection
#[derive(Args, Debug, Clone)]
pub struct RecipeArgs {
    /// Path to the recipe file
    #[arg(short, long, default_value = DEFAULT_RECIPE)]
    pub recipe: String,
}

/// Build selection shared by every command that needs a resolved build
#[derive(Args, Debug, Clone)]
pub struct SpecArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,

    /// Build spec, e.g. "@1.4.18 +sigsegv %gcc os=ubuntu22.04"
    #[arg(short, long, default_value = "")]
    pub spec: String,

    /// Install prefix of a dependency, as NAME=PREFIX (repeatable)
    #[arg(long = "dep", value_name = "NAME=PREFIX")]
    pub deps: Vec<String>,

    /// Install prefix (default: <data dir>/m4-recipe/<name>-<version>)
    #[arg(short, long)]
    pub prefix: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show recipe metadata, versions, variants, dependencies, and patches
    Show {
        #[command(flatten)]
        recipe: RecipeArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse and validate a recipe
    Validate {
        #[command(flatten)]
        recipe: RecipeArgs,
    },

    /// Print the configure arguments for a build, one per line
    Args {
        #[command(flatten)]
        spec: SpecArgs,
    },

    /// Print the patches that apply to a build, in application order
    Patches {
        #[command(flatten)]
        spec: SpecArgs,
    },

    /// Download and checksum-verify sources and remote patches
    Fetch {
        #[command(flatten)]
        spec: SpecArgs,

        /// Directory for caching downloaded sources
        #[arg(long)]
        source_cache: Option<String>,
    },

    /// Build and install a package from its recipe
    ///
    /// Runs fetch, unpack, patch, configure, make, and make install, then
    /// verifies the installed tool unless --no-test is given.
    Cook {
        #[command(flatten)]
        spec: SpecArgs,

        /// Directory for caching downloaded sources
        #[arg(long)]
        source_cache: Option<String>,

        /// Number of parallel build jobs
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        jobs: Option<u32>,

        /// Keep build directory after completion (for debugging)
        #[arg(long)]
        keep_builddir: bool,

        /// Run `make check` before installing
        #[arg(long)]
        check: bool,

        /// Skip post-install verification
        #[arg(long)]
        no_test: bool,

        /// Directory holding test fixtures (default: the recipe directory)
        #[arg(long)]
        work_dir: Option<String>,
    },

    /// Verify an installed tool against the recipe's test fixtures
    Test {
        #[command(flatten)]
        spec: SpecArgs,

        /// Directory holding test fixtures (default: current directory)
        #[arg(long)]
        work_dir: Option<String>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
