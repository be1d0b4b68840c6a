//! Mod directory fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::git::{Files, repo_with_releases};

/// Text of a `mod` block requiring the given `(full name, version)` pairs.
pub fn mod_block(name: &str, requires: &[(&str, &str)]) -> String {
    if requires.is_empty() {
        return format!("mod \"{name}\" {{\n  title = \"{name}\"\n}}\n");
    }
    let mut body = String::new();
    for (dep, version) in requires {
        body.push_str(&format!("    mod \"{dep}\" {{\n      version = \"{version}\"\n    }}\n"));
    }
    format!("mod \"{name}\" {{\n  title = \"{name}\"\n  require {{\n{body}  }}\n}}\n")
}

/// Write `mod.mp` plus extra files into `dir`.
pub fn write_mod_dir(dir: &Path, mod_text: &str, files: Files<'_>) {
    fs::create_dir_all(dir)
        .unwrap_or_else(|e| panic!("write_mod_dir: failed to create {}: {e}", dir.display()));
    fs::write(dir.join("mod.mp"), mod_text)
        .unwrap_or_else(|e| panic!("write_mod_dir: failed to write mod.mp: {e}"));
    for (relative, content) in files {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("write_mod_dir: failed to create {}: {e}", parent.display())
            });
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("write_mod_dir: failed to write {}: {e}", path.display()));
    }
}

/// A temporary directory of git repositories addressed by full mod name.
pub struct Mirror {
    dir: TempDir,
}

impl Mirror {
    /// # Panics
    /// Panics if the temporary directory cannot be created.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap_or_else(|e| panic!("Mirror::new: {e}")),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Publish a mod with one tagged commit per `(tag, mod.mp text)` release.
    pub fn publish(&self, full_name: &str, releases: &[(&str, &str)]) -> PathBuf {
        let path = self.dir.path().join(full_name);
        let owned: Vec<(&str, [(&str, &str); 1])> = releases
            .iter()
            .map(|(tag, text)| (*tag, [("mod.mp", *text)]))
            .collect();
        let borrowed: Vec<(&str, Files<'_>)> =
            owned.iter().map(|(tag, files)| (*tag, &files[..])).collect();
        repo_with_releases(&path, &borrowed);
        path
    }
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}
