//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// modctl - Resolve, install and check mods and their resources
#[derive(Parser, Debug)]
#[command(name = "modctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace directory (defaults to the current directory)
    #[arg(short = 'C', long = "workspace", global = true, env = "MODCTL_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Install the mods required by the workspace
    ///
    /// Versions recorded in the lock file are reused unless --update is given.
    ///
    /// Examples:
    ///   modctl install                  # Install from the lock
    ///   modctl install --update         # Re-resolve to the newest versions
    ///   modctl install --mirror ./repos # Install from local repositories
    Install {
        /// Ignore the lock and re-resolve every dependency
        #[arg(long)]
        update: bool,

        /// Directory of mod repositories to use instead of the network
        #[arg(long)]
        mirror: Option<PathBuf>,
    },

    /// Resolve the dependency tree against installed mods
    Resolve {
        /// Fetch versions that are not installed yet
        #[arg(long)]
        fetch: bool,

        /// Directory of mod repositories to fetch from
        #[arg(long)]
        mirror: Option<PathBuf>,
    },

    /// Print the control and benchmark tree
    Tree,

    /// Decode every mod of the workspace and report diagnostics
    Check {
        /// Variable override, as name=value (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_flags() {
        let cli = Cli::parse_from(["modctl", "install", "--update"]);
        assert_eq!(
            cli.command,
            Some(Commands::Install {
                update: true,
                mirror: None
            })
        );
        assert!(!cli.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["modctl", "tree", "--verbose", "-C", "/tmp/ws"]);
        assert_eq!(cli.command, Some(Commands::Tree));
        assert!(cli.verbose);
        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ws")));
    }

    #[test]
    fn test_repeated_vars() {
        let cli = Cli::parse_from(["modctl", "check", "--var", "a=1", "--var", "b=x"]);
        assert_eq!(
            cli.command,
            Some(Commands::Check {
                vars: vec!["a=1".to_string(), "b=x".to_string()]
            })
        );
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
