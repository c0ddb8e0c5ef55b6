// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command output (args, JSON reports)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Show { recipe, json } => commands::cmd_show(&recipe.recipe, json),
        Commands::Validate { recipe } => commands::cmd_validate(&recipe.recipe),
        Commands::Args { spec } => commands::cmd_args(&spec),
        Commands::Patches { spec } => commands::cmd_patches(&spec),
        Commands::Fetch { spec, source_cache } => commands::cmd_fetch(&spec, source_cache),
        Commands::Cook {
            spec,
            source_cache,
            jobs,
            keep_builddir,
            check,
            no_test,
            work_dir,
        } => commands::cmd_cook(
            &spec,
            commands::CookOptions {
                source_cache,
                jobs,
                keep_builddir,
                run_checks: check,
                no_test,
                work_dir,
            },
        ),
        Commands::Test { spec, work_dir, json } => commands::cmd_test(&spec, work_dir, json),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "m4-recipe", &mut std::io::stdout());
            Ok(())
        }
    }
}
