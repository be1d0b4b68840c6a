//! Known mod versions
//!
//! The resolver never touches the disk or the network itself. It asks a
//! [`ModCatalog`] which versions of a mod are known, and to fetch one when
//! none is.

use std::collections::BTreeMap;

use mod_config::constraint::{NameConvention, VersionConstraint, parse_tag_version};
use mod_config::modfile::parse_mod_definition;
use mod_config::Mod;
use mod_fs::{NormalizedPath, SourceFile, WorkspaceLayout, io};
use semver::Version;
use tracing::debug;

use crate::error::{Error, Result};
use crate::installer::Installer;

/// File holding the `mod` block of a mod directory.
pub const MOD_DEFINITION_FILE: &str = "mod.mp";

/// Source of candidate mod versions for the resolver.
pub trait ModCatalog {
    /// Every known version of `full_name`, with its declared requirements.
    fn versions(&mut self, full_name: &str) -> Result<Vec<Mod>>;

    /// Make a version satisfying `constraint` known, returning it.
    fn fetch(&mut self, constraint: &VersionConstraint) -> Result<Mod>;
}

/// Read the `mod` block of the mod stored in `dir`.
///
/// A directory without a definition file is a mod with no requirements.
pub(crate) fn load_definition(
    dir: &NormalizedPath,
    full_name: &str,
    version: Option<Version>,
    naming: &NameConvention,
) -> Result<Mod> {
    let path = dir.join(MOD_DEFINITION_FILE);
    let shell = match io::read_text_if_exists(&path)? {
        Some(content) => parse_mod_definition(&SourceFile::new(path, content), naming)?,
        None => Mod::new(short_name(full_name)),
    };
    let mut shell = shell.with_full_name(full_name).with_dir(dir.clone());
    shell.version = version;
    Ok(shell)
}

/// Last segment of a full mod name.
pub(crate) fn short_name(full_name: &str) -> &str {
    full_name.rsplit('/').next().unwrap_or(full_name)
}

/// A fixed set of mods held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    mods: BTreeMap<String, Vec<Mod>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `m` known under its full name.
    pub fn add(&mut self, m: Mod) {
        self.mods.entry(m.full_name.clone()).or_default().push(m);
    }

    pub fn with(mut self, m: Mod) -> Self {
        self.add(m);
        self
    }
}

impl ModCatalog for InMemoryCatalog {
    fn versions(&mut self, full_name: &str) -> Result<Vec<Mod>> {
        Ok(self.mods.get(full_name).cloned().unwrap_or_default())
    }

    fn fetch(&mut self, constraint: &VersionConstraint) -> Result<Mod> {
        Err(Error::VersionNotFound {
            name: constraint.name.clone(),
            constraint: constraint.version_string.clone(),
        })
    }
}

/// Mods installed below a workspace's mods directory.
///
/// Missing versions are fetched through an [`Installer`] when one is given.
pub struct InstalledCatalog<'a> {
    layout: &'a WorkspaceLayout,
    naming: NameConvention,
    installer: Option<&'a Installer<'a>>,
}

impl<'a> InstalledCatalog<'a> {
    /// Catalog of what is installed, never fetching.
    pub fn new(layout: &'a WorkspaceLayout, naming: NameConvention) -> Self {
        Self {
            layout,
            naming,
            installer: None,
        }
    }

    /// Catalog fetching missing versions with `installer`.
    pub fn with_installer(
        layout: &'a WorkspaceLayout,
        naming: NameConvention,
        installer: &'a Installer<'a>,
    ) -> Self {
        Self {
            layout,
            naming,
            installer: Some(installer),
        }
    }
}

impl ModCatalog for InstalledCatalog<'_> {
    fn versions(&mut self, full_name: &str) -> Result<Vec<Mod>> {
        let mut found = Vec::new();
        for label in self.layout.installed_labels(full_name)? {
            let dir = self.layout.install_dir(full_name, &label);
            found.push(load_definition(
                &dir,
                full_name,
                parse_tag_version(&label),
                &self.naming,
            )?);
        }
        debug!(mod_name = full_name, versions = found.len(), "scanned installed versions");
        Ok(found)
    }

    fn fetch(&mut self, constraint: &VersionConstraint) -> Result<Mod> {
        match self.installer {
            Some(installer) => installer.fetch(constraint),
            None => Err(Error::NotInstalled {
                name: constraint.name.clone(),
                constraint: constraint.version_string.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mod_test_utils::mods::{mod_block, write_mod_dir};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_installed_versions_are_scanned() {
        let temp = TempDir::new().unwrap();
        let layout = WorkspaceLayout::new(temp.path()).unwrap();
        let full_name = "github.com/turbot/m1";

        let text = mod_block("m1", &[("github.com/turbot/m2", "^1.0")]);
        write_mod_dir(layout.install_dir(full_name, "1.0.0").to_native().as_path(), &text, &[]);
        write_mod_dir(layout.install_dir(full_name, "main").to_native().as_path(), &text, &[]);

        let mut catalog = InstalledCatalog::new(&layout, NameConvention::default());
        let versions = catalog.versions(full_name).unwrap();

        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, Some(Version::new(1, 0, 0)));
        assert_eq!(versions[0].full_name, full_name);
        assert_eq!(versions[0].dependencies()[0].name, "github.com/turbot/m2");
        assert_eq!(versions[1].version, None);
    }

    #[test]
    fn test_fetch_without_installer_fails() {
        let temp = TempDir::new().unwrap();
        let layout = WorkspaceLayout::new(temp.path()).unwrap();
        let mut catalog = InstalledCatalog::new(&layout, NameConvention::default());

        let constraint = VersionConstraint::parse("m1@1.0").unwrap();
        assert!(matches!(
            catalog.fetch(&constraint),
            Err(Error::NotInstalled { .. })
        ));
        assert!(catalog.versions("github.com/turbot/m1").unwrap().is_empty());
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("github.com/turbot/aws"), "aws");
        assert_eq!(short_name("aws"), "aws");
    }
}
