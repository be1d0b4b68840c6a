//! Tree command implementation

use std::path::Path;

use colored::Colorize;
use mod_config::NodeKind;
use mod_install::Workspace;

use crate::error::Result;

/// Run the tree command
pub fn run_tree(path: &Path) -> Result<()> {
    let workspace = Workspace::load(path)?;
    let tree = workspace.tree();

    let mut lines = Vec::new();
    tree.walk(|name, depth| {
        let indent = "  ".repeat(depth);
        let label = match tree.kind(name) {
            Some(NodeKind::Mod) => name.bold().to_string(),
            Some(NodeKind::Benchmark) => name.cyan().to_string(),
            _ => name.to_string(),
        };
        match tree.title(name) {
            Some(title) => lines.push(format!("{indent}{label} {}", title.dimmed())),
            None => lines.push(format!("{indent}{label}")),
        }
    });
    for line in lines {
        println!("{line}");
    }
    Ok(())
}
