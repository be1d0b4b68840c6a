//! Install command implementation

use std::path::Path;

use colored::Colorize;
use mod_config::NameConvention;
use mod_fs::WorkspaceLayout;
use mod_install::{InstallOptions, Installer, read_root_definition, read_settings};

use super::{mod_source, pick_mirror};
use crate::error::Result;

/// Run the install command
pub fn run_install(path: &Path, update: bool, mirror: Option<&Path>) -> Result<()> {
    let layout = WorkspaceLayout::new(path)?;
    let settings = read_settings(&layout)?;
    let naming = NameConvention::from_settings(&settings);
    let root = read_root_definition(&layout, &naming)?;

    let mirror = pick_mirror(mirror, settings.mirror.as_ref());
    let source = mod_source(mirror.as_deref());
    let options = InstallOptions {
        update,
        mirror,
        ..InstallOptions::default()
    };

    if root.dependencies().is_empty() {
        println!("{} has no dependencies", root.name.cyan());
        return Ok(());
    }

    let report = Installer::new(&layout, &source, naming, options).install_dependencies(&root)?;

    println!("{}", "Installed mods".bold());
    println!();
    for (name, reference) in &report.dependencies {
        let fetched = report.fetched.contains(reference);
        let marker = if fetched { "+".green() } else { "=".dimmed() };
        println!("  {} {}@{}", marker, name.cyan(), reference.version_label());
    }
    println!();
    println!(
        "{} {} mods, {} fetched",
        "Done:".green().bold(),
        report.dependencies.len(),
        report.fetched.len()
    );
    Ok(())
}
