//! Workspace state layout
//!
//! A workspace keeps its internal state below `<root>/.modctl`:
//!
//! ```text
//! <root>/
//!   mod.mp
//!   .modctl/
//!     settings.toml
//!     mods/
//!       mods.lock.json
//!       github.com/org/name@1.2.0/
//!       github.com/org/other@main/
//! ```

use crate::{Error, NormalizedPath, Result, StatePath};
use std::fs;

/// Resolved locations of everything a workspace stores on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    root: NormalizedPath,
}

impl WorkspaceLayout {
    /// Create a layout for an existing workspace root.
    pub fn new(root: impl Into<NormalizedPath>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::MissingRoot {
                path: root.to_native(),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn state_dir(&self) -> NormalizedPath {
        self.root.join(StatePath::StateDir.as_str())
    }

    /// Directory holding installed dependency mods.
    pub fn mods_dir(&self) -> NormalizedPath {
        self.state_dir().join(StatePath::ModsDir.as_str())
    }

    pub fn lock_path(&self) -> NormalizedPath {
        self.mods_dir().join(StatePath::LockFile.as_str())
    }

    pub fn settings_path(&self) -> NormalizedPath {
        self.state_dir().join(StatePath::SettingsFile.as_str())
    }

    pub fn mod_file(&self) -> NormalizedPath {
        self.root.join(StatePath::ModFile.as_str())
    }

    /// Install directory for one version (or branch) of a mod.
    pub fn install_dir(&self, full_name: &str, version_label: &str) -> NormalizedPath {
        self.mods_dir().join(&format!("{full_name}@{version_label}"))
    }

    /// List the version labels installed for `full_name`, sorted.
    ///
    /// A label is whatever follows the `@` of an install directory: a
    /// semantic version for tagged releases or a branch name.
    pub fn installed_labels(&self, full_name: &str) -> Result<Vec<String>> {
        let install_base = self.mods_dir().join(full_name);
        let (Some(parent), Some(base_name)) = (install_base.parent(), install_base.file_name())
        else {
            return Ok(Vec::new());
        };
        if !parent.is_dir() {
            return Ok(Vec::new());
        }

        let prefix = format!("{base_name}@");
        let native = parent.to_native();
        let mut labels = Vec::new();
        for entry in fs::read_dir(&native).map_err(|e| Error::io(&native, e))? {
            let entry = entry.map_err(|e| Error::io(&native, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            if let Some(label) = file_name.to_string_lossy().strip_prefix(&prefix) {
                labels.push(label.to_string());
            }
        }
        labels.sort();
        Ok(labels)
    }
}
