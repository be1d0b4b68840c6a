//! Workspace lock file
//!
//! The lock records, for every mod that declares dependencies, which version
//! each dependency was resolved to and under which constraint:
//!
//! ```json
//! {
//!   "local": {
//!     "github.com/turbot/aws": { "version": "1.2.0", "constraint": "^1.0" }
//!   }
//! }
//! ```
//!
//! Only tagged releases are locked. Branches and local paths always install
//! whatever they currently point at.

use std::collections::BTreeMap;

use mod_config::constraint::parse_version_req;
use mod_fs::{ConfigStore, WorkspaceLayout};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// One locked dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub version: Version,
    /// Constraint text the version was resolved for
    pub constraint: String,
}

/// `parent -> dependency -> entry`, persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceLock {
    entries: BTreeMap<String, BTreeMap<String, LockEntry>>,
}

impl WorkspaceLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the lock of a workspace. A missing file is an empty lock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptLock`] when an entry's version does not
    /// satisfy its own recorded constraint.
    pub fn load(layout: &WorkspaceLayout) -> Result<Self> {
        let lock: Self = ConfigStore::new().load_or_default(&layout.lock_path())?;
        lock.validate()?;
        debug!(parents = lock.entries.len(), entries = lock.len(), "loaded workspace lock");
        Ok(lock)
    }

    fn validate(&self) -> Result<()> {
        for (parent, dependencies) in &self.entries {
            for (name, entry) in dependencies {
                let satisfied = parse_version_req(&entry.constraint)
                    .is_some_and(|req| req.matches(&entry.version));
                if !satisfied {
                    return Err(Error::CorruptLock {
                        parent: parent.clone(),
                        name: name.clone(),
                        version: entry.version.clone(),
                        constraint: entry.constraint.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Write the lock atomically.
    pub fn save(&self, layout: &WorkspaceLayout) -> Result<()> {
        let path = layout.lock_path();
        ConfigStore::new().save(&path, self)?;
        debug!(path = %path, entries = self.len(), "saved workspace lock");
        Ok(())
    }

    pub fn get(&self, parent: &str, dependency: &str) -> Option<&LockEntry> {
        self.entries.get(parent)?.get(dependency)
    }

    /// Record the version `dependency` of `parent` resolved to.
    pub fn add(
        &mut self,
        parent: impl Into<String>,
        dependency: impl Into<String>,
        version: Version,
        constraint: impl Into<String>,
    ) {
        self.entries.entry(parent.into()).or_default().insert(
            dependency.into(),
            LockEntry {
                version,
                constraint: constraint.into(),
            },
        );
    }

    /// Drop every entry recorded for `parent`.
    pub fn remove_parent(&mut self, parent: &str) {
        self.entries.remove(parent);
    }

    /// Every locked version of `dependency`, across parents.
    pub fn versions_of(&self, dependency: &str) -> Vec<&Version> {
        let mut versions: Vec<&Version> = self
            .entries
            .values()
            .filter_map(|deps| deps.get(dependency))
            .map(|entry| &entry.version)
            .collect();
        versions.sort();
        versions.dedup();
        versions
    }

    /// Iterate `(parent, dependency, entry)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &LockEntry)> {
        self.entries.iter().flat_map(|(parent, deps)| {
            deps.iter()
                .map(move |(name, entry)| (parent.as_str(), name.as_str(), entry))
        })
    }

    /// Number of locked dependencies.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
