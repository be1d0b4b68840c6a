//! Check command implementation

use std::path::Path;

use colored::Colorize;
use mod_config::parse_variable_overrides;
use mod_install::Workspace;

use crate::error::{CliError, Result};

/// Run the check command
pub fn run_check(path: &Path, vars: &[String]) -> Result<()> {
    if let Some(bad) = vars.iter().find(|pair| !pair.contains('=')) {
        return Err(CliError::user(format!(
            "invalid variable '{bad}', expected NAME=VALUE"
        )));
    }
    let variables = parse_variable_overrides(vars.iter().map(String::as_str));

    let workspace = match Workspace::load_with_variables(path, variables) {
        Ok(workspace) => workspace,
        Err(e) => {
            let e = CliError::from(e);
            if let Some(diagnostics) = e.diagnostics() {
                for diagnostic in diagnostics.iter() {
                    eprintln!("  {} {}", "x".red(), diagnostic);
                }
            }
            return Err(e);
        }
    };

    let root = workspace.root_mod();
    println!(
        "{} {} ({} resources)",
        "ok".green().bold(),
        root.name.cyan(),
        root.resources.len()
    );
    for dependency in workspace.dependencies() {
        println!(
            "{} {}@{} ({} resources)",
            "ok".green().bold(),
            dependency.full_name.cyan(),
            dependency.version_label(),
            dependency.resources.len()
        );
    }
    println!();
    println!(
        "{} {} mods, {} tree nodes",
        "Checked:".dimmed(),
        workspace.dependencies().len() + 1,
        workspace.tree().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VARIABLE_MOD: &str = r#"
variable "region" {}

query "q" {
  sql = "select '${var.region}'"
}
"#;

    #[test]
    fn test_check_requires_variable() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("main.mp"), VARIABLE_MOD).unwrap();

        let err = run_check(temp.path(), &[]).unwrap_err();
        assert!(err.diagnostics().is_some());
        assert!(err.to_string().contains("region"), "{err}");
    }

    #[test]
    fn test_check_with_variable() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("main.mp"), VARIABLE_MOD).unwrap();

        assert!(run_check(temp.path(), &["region=eu".to_string()]).is_ok());
    }

    #[test]
    fn test_check_rejects_malformed_variable() {
        let temp = TempDir::new().unwrap();
        let err = run_check(temp.path(), &["region".to_string()]).unwrap_err();
        assert!(err.to_string().contains("expected NAME=VALUE"));
    }
}
