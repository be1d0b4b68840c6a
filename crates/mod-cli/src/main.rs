//! modctl
//!
//! Command-line interface for resolving, installing and checking mods.

mod cli;
mod commands;
mod error;

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let workspace = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Some(cmd) => execute_command(cmd, workspace),
        None => {
            println!("{} mod dependency manager", "modctl".green().bold());
            println!();
            println!("Run {} for available commands.", "modctl --help".cyan());
            Ok(())
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG`; `--verbose` forces DEBUG.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        tracing::debug!("Verbose mode enabled");
    }
}

fn execute_command(cmd: Commands, workspace: PathBuf) -> Result<()> {
    match cmd {
        Commands::Install { update, mirror } => {
            commands::run_install(&workspace, update, mirror.as_deref())
        }
        Commands::Resolve { fetch, mirror } => {
            commands::run_resolve(&workspace, fetch, mirror.as_deref())
        }
        Commands::Tree => commands::run_tree(&workspace),
        Commands::Check { vars } => commands::run_check(&workspace, &vars),
    }
}
