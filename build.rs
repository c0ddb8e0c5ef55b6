// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: recipe path
fn recipe_arg() -> Arg {
    Arg::new("recipe")
        .short('r')
        .long("recipe")
        .value_name("PATH")
        .default_value("recipes/m4/recipe.toml")
        .help("Path to the recipe file")
}

/// Common arguments: build selection
fn spec_args() -> Vec<Arg> {
    vec![
        recipe_arg(),
        Arg::new("spec")
            .short('s')
            .long("spec")
            .default_value("")
            .help("Build spec, e.g. \"@1.4.18 +sigsegv %gcc os=ubuntu22.04\""),
        Arg::new("dep")
            .long("dep")
            .value_name("NAME=PREFIX")
            .action(ArgAction::Append)
            .help("Install prefix of a dependency (repeatable)"),
        Arg::new("prefix")
            .short('p')
            .long("prefix")
            .help("Install prefix"),
    ]
}

fn source_cache_arg() -> Arg {
    Arg::new("source_cache")
        .long("source-cache")
        .help("Directory for caching downloaded sources")
}

fn work_dir_arg() -> Arg {
    Arg::new("work_dir")
        .long("work-dir")
        .help("Directory holding test fixtures")
}

fn build_cli() -> Command {
    Command::new("m4-recipe")
        .version(env!("CARGO_PKG_VERSION"))
        .author("m4-recipe Contributors")
        .about("Build and verify GNU M4 from its recipe")
        .subcommand_required(true)
        .subcommand(
            Command::new("show")
                .about("Show recipe metadata, versions, variants, dependencies, and patches")
                .arg(recipe_arg())
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Output as JSON")),
        )
        .subcommand(
            Command::new("validate")
                .about("Parse and validate a recipe")
                .arg(recipe_arg()),
        )
        .subcommand(
            Command::new("args")
                .about("Print the configure arguments for a build, one per line")
                .args(spec_args()),
        )
        .subcommand(
            Command::new("patches")
                .about("Print the patches that apply to a build, in application order")
                .args(spec_args()),
        )
        .subcommand(
            Command::new("fetch")
                .about("Download and checksum-verify sources and remote patches")
                .args(spec_args())
                .arg(source_cache_arg()),
        )
        .subcommand(
            Command::new("cook")
                .about("Build and install a package from its recipe")
                .args(spec_args())
                .arg(source_cache_arg())
                .arg(Arg::new("jobs").short('j').long("jobs").help("Number of parallel build jobs"))
                .arg(
                    Arg::new("keep_builddir")
                        .long("keep-builddir")
                        .action(ArgAction::SetTrue)
                        .help("Keep build directory after completion"),
                )
                .arg(
                    Arg::new("check")
                        .long("check")
                        .action(ArgAction::SetTrue)
                        .help("Run `make check` before installing"),
                )
                .arg(
                    Arg::new("no_test")
                        .long("no-test")
                        .action(ArgAction::SetTrue)
                        .help("Skip post-install verification"),
                )
                .arg(work_dir_arg()),
        )
        .subcommand(
            Command::new("test")
                .about("Verify an installed tool against the recipe's test fixtures")
                .args(spec_args())
                .arg(work_dir_arg())
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Output the report as JSON")),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("m4-recipe.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
