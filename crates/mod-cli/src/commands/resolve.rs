//! Resolve command implementation

use std::path::Path;

use colored::Colorize;
use mod_config::NameConvention;
use mod_fs::WorkspaceLayout;
use mod_install::{
    InstallOptions, InstalledCatalog, Installer, Resolution, read_root_definition, read_settings,
    resolve_dependencies,
};

use super::{mod_source, pick_mirror};
use crate::error::{CliError, Result};

/// Run the resolve command
pub fn run_resolve(path: &Path, fetch: bool, mirror: Option<&Path>) -> Result<()> {
    let layout = WorkspaceLayout::new(path)?;
    let settings = read_settings(&layout)?;
    let naming = NameConvention::from_settings(&settings);
    let root = read_root_definition(&layout, &naming)?;

    let resolution = if fetch {
        let mirror = pick_mirror(mirror, settings.mirror.as_ref());
        let source = mod_source(mirror.as_deref());
        let options = InstallOptions {
            mirror,
            ..InstallOptions::default()
        };
        let installer = Installer::new(&layout, &source, naming.clone(), options);
        let mut catalog = InstalledCatalog::with_installer(&layout, naming, &installer);
        resolve_dependencies(&mut catalog, &[root])
    } else {
        let mut catalog = InstalledCatalog::new(&layout, naming);
        resolve_dependencies(&mut catalog, &[root])
    };

    print_resolution(&resolution);

    if resolution.is_complete() {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "{} mod(s) could not be resolved",
            resolution.unresolved.len()
        )))
    }
}

fn print_resolution(resolution: &Resolution) {
    println!("{}", "Resolved".bold());
    if resolution.resolved.is_empty() {
        println!("  {}", "None".dimmed());
    }
    for key in resolution.resolved.keys() {
        println!("  {} {}", "+".green(), key.cyan());
    }

    if !resolution.unresolved.is_empty() {
        println!();
        println!("{}", "Unresolved".bold());
        for (name, unresolved) in &resolution.unresolved {
            println!("  {} {}: {}", "x".red(), name.cyan(), unresolved.reason);
        }
    }
}
