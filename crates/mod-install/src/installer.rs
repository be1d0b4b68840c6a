//! Mod installation
//!
//! Installs the dependency tree of a mod into the workspace's mods
//! directory. Every direct dependency is resolved (lock first), fetched,
//! and then its own requirements are gathered into one dependency map
//! shared by the whole tree, so a mod required from several places is
//! installed once, at the highest version every requirer accepts.
//!
//! The lock is rebuilt on every run from the references actually installed,
//! so requirements a mod no longer declares drop out of it. Entries of
//! dependencies that failed to install are carried over unchanged.

use std::collections::BTreeMap;
use std::path::PathBuf;

use mod_config::constraint::{NameConvention, VersionConstraint};
use mod_config::Mod;
use mod_fs::{NormalizedPath, WorkspaceLayout};
use mod_git::ModSource;
use semver::Version;
use tracing::{debug, info, warn};

use crate::catalog::load_definition;
use crate::error::{Error, Result};
use crate::lock::WorkspaceLock;
use crate::reference::{ReferenceKind, ResolvedReference, find_tag, select_reference};

/// Version of the running tool.
pub fn tool_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 0, 0))
}

/// Options for an install run.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Checked against the `require { tool = ... }` of the root mod
    pub tool_version: Version,
    /// Ignore the lock and re-resolve to the newest satisfying versions
    pub update: bool,
    /// Local mirror of mod repositories, used instead of the network
    pub mirror: Option<PathBuf>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            tool_version: tool_version(),
            update: false,
            mirror: None,
        }
    }
}

/// What an install run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// The converged dependency map, by full name
    pub dependencies: BTreeMap<String, ResolvedReference>,
    /// References fetched during this run
    pub fetched: Vec<ResolvedReference>,
}

#[derive(Default)]
struct InstallState {
    /// Lock found on disk, consulted before listing sources
    previous: WorkspaceLock,
    /// Lock rebuilt from what this run installs
    lock: WorkspaceLock,
    dependencies: BTreeMap<String, ResolvedReference>,
    /// Every constraint seen for a dependency, with the mod declaring it
    requirers: BTreeMap<String, Vec<(String, VersionConstraint)>>,
    fetched: Vec<ResolvedReference>,
    errors: Vec<Error>,
}

/// Installs mods into a workspace from a [`ModSource`].
pub struct Installer<'a> {
    layout: &'a WorkspaceLayout,
    source: &'a dyn ModSource,
    naming: NameConvention,
    options: InstallOptions,
}

impl<'a> Installer<'a> {
    pub fn new(
        layout: &'a WorkspaceLayout,
        source: &'a dyn ModSource,
        naming: NameConvention,
        options: InstallOptions,
    ) -> Self {
        Self {
            layout,
            source,
            naming,
            options,
        }
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    /// Install the dependency tree of `root` and rewrite the lock.
    ///
    /// # Errors
    ///
    /// [`Error::ToolVersion`] before anything is installed when the running
    /// tool is too old. Otherwise every failure in the tree is collected into
    /// one [`Error::Install`]; dependencies that did install stay installed
    /// and locked.
    pub fn install_dependencies(&self, root: &Mod) -> Result<InstallReport> {
        self.check_tool_version(root)?;

        let previous = if self.options.update {
            info!("update requested, ignoring lock");
            WorkspaceLock::new()
        } else {
            WorkspaceLock::load(self.layout)?
        };

        let mut state = InstallState {
            previous,
            ..InstallState::default()
        };
        let mut chain = vec![root.full_name.clone()];
        self.install_tree(root, &mut state, &mut chain);

        state.lock.save(self.layout)?;
        info!(
            mod_name = %root.full_name,
            dependencies = state.dependencies.len(),
            fetched = state.fetched.len(),
            errors = state.errors.len(),
            "install finished"
        );

        if !state.errors.is_empty() {
            return Err(Error::Install {
                errors: state.errors,
            });
        }
        Ok(InstallReport {
            dependencies: state.dependencies,
            fetched: state.fetched,
        })
    }

    fn check_tool_version(&self, root: &Mod) -> Result<()> {
        match &root.require.tool {
            Some(required) if !required.matches(&self.options.tool_version) => {
                Err(Error::ToolVersion {
                    mod_name: root.name.clone(),
                    required: required.to_string(),
                    running: self.options.tool_version.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn install_tree(
        &self,
        parent: &Mod,
        state: &mut InstallState,
        chain: &mut Vec<String>,
    ) {
        for dependency in parent.dependencies() {
            match self.install_dependency(&parent.full_name, dependency, state) {
                Ok(Some(installed)) => {
                    // Cycles are reported by the resolver, not followed here
                    if chain.contains(&installed.full_name) {
                        continue;
                    }
                    chain.push(installed.full_name.clone());
                    self.install_tree(&installed, state, chain);
                    chain.pop();
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        parent = %parent.full_name,
                        dependency = %dependency,
                        error = %e,
                        "dependency failed"
                    );
                    if let Some(entry) = state.previous.get(&parent.full_name, &dependency.name) {
                        let entry = entry.clone();
                        state.lock.add(
                            &parent.full_name,
                            &dependency.name,
                            entry.version,
                            entry.constraint,
                        );
                    }
                    state.errors.push(e);
                }
            }
        }
    }

    /// Install one dependency. Returns the installed mod when its own
    /// requirements still need installing.
    fn install_dependency(
        &self,
        parent: &str,
        dependency: &VersionConstraint,
        state: &mut InstallState,
    ) -> Result<Option<Mod>> {
        let requirer = (parent.to_string(), dependency.clone());

        if let Some(existing) = state.dependencies.get(&dependency.name) {
            if existing.satisfies(dependency) {
                debug!(dependency = %dependency, installed = %existing, "already satisfied");
                self.lock_reference(parent, dependency, existing, &mut state.lock);
                state
                    .requirers
                    .entry(dependency.name.clone())
                    .or_default()
                    .push(requirer);
                return Ok(None);
            }
        }

        let reference = self.resolve_reference(parent, dependency, &state.previous)?;

        let superseded = state.dependencies.get(&dependency.name);
        if let Some(existing) = superseded {
            // Highest wins, provided every earlier requirer accepts it
            let newer = reference.version > existing.version;
            let accepted = state
                .requirers
                .get(&dependency.name)
                .into_iter()
                .flatten()
                .all(|(_, constraint)| reference.satisfies(constraint));
            if !(newer && accepted) {
                return Err(Error::IncompatibleVersion {
                    parent: parent.to_string(),
                    name: dependency.name.clone(),
                    installed: existing.version_label(),
                    required: dependency.version_string.clone(),
                });
            }
            info!(
                dependency = %dependency.name,
                from = %existing,
                to = %reference,
                "upgrading shared dependency"
            );
        }

        let superseded = superseded.is_some();
        let dir = self.materialize(&reference, state)?;
        if superseded {
            self.forget_requirements(&dependency.name, state);
        }
        let requirers = state.requirers.entry(dependency.name.clone()).or_default();
        requirers.push(requirer);
        for (requirer, constraint) in requirers.iter() {
            self.lock_reference(requirer, constraint, &reference, &mut state.lock);
        }
        state
            .dependencies
            .insert(dependency.name.clone(), reference.clone());

        let installed =
            load_definition(&dir, &reference.name, reference.version.clone(), &self.naming)?;
        Ok(Some(installed))
    }

    /// Drop what a superseded version of `parent` required.
    ///
    /// Dependencies left without any requirer go too, recursively. Their
    /// install directories stay on disk.
    fn forget_requirements(&self, parent: &str, state: &mut InstallState) {
        state.lock.remove_parent(parent);
        state.previous.remove_parent(parent);

        let mut orphaned = Vec::new();
        for (name, requirers) in state.requirers.iter_mut() {
            requirers.retain(|(requirer, _)| requirer != parent);
            if requirers.is_empty() {
                orphaned.push(name.clone());
            }
        }
        for name in orphaned {
            state.requirers.remove(&name);
            if let Some(dropped) = state.dependencies.remove(&name) {
                debug!(dependency = %dropped, superseded = parent, "no longer required");
            }
            self.forget_requirements(&name, state);
        }
    }

    fn lock_reference(
        &self,
        parent: &str,
        constraint: &VersionConstraint,
        reference: &ResolvedReference,
        lock: &mut WorkspaceLock,
    ) {
        if let (ReferenceKind::Tag, Some(version)) = (reference.kind, &reference.version) {
            lock.add(
                parent,
                &reference.name,
                version.clone(),
                &constraint.version_string,
            );
        }
    }

    /// Bind `dependency` to a concrete reference, consulting the lock first.
    pub fn resolve_reference(
        &self,
        parent: &str,
        dependency: &VersionConstraint,
        lock: &WorkspaceLock,
    ) -> Result<ResolvedReference> {
        if let Some(path) = &dependency.file_path {
            let native = if path.is_absolute() {
                path.clone()
            } else {
                self.layout.root().to_native().join(path)
            };
            if !native.is_dir() {
                return Err(Error::MissingLocalPath {
                    name: dependency.name.clone(),
                    path: native.display().to_string(),
                });
            }
            return Ok(ResolvedReference::local(&dependency.name, native));
        }

        if !dependency.is_branch() && !self.options.update {
            if let Some(entry) = lock.get(parent, &dependency.name) {
                if !dependency.matches(&entry.version) {
                    return Err(Error::LockMismatch {
                        parent: parent.to_string(),
                        name: dependency.name.clone(),
                        locked: entry.version.clone(),
                        required: dependency.version_string.clone(),
                    });
                }
                debug!(dependency = %dependency, locked = %entry.version, "using locked version");
                return self.locked_reference(&dependency.name, &entry.version);
            }
        }

        let refs = self.source.list_refs(&dependency.name)?;
        select_reference(dependency, &refs)
    }

    /// Reference for a locked version, without listing the source when it is
    /// already installed.
    fn locked_reference(&self, name: &str, version: &Version) -> Result<ResolvedReference> {
        let label = version.to_string();
        if self.layout.install_dir(name, &label).is_dir() {
            return Ok(ResolvedReference::tag(name, version.clone(), label));
        }
        let refs = self.source.list_refs(name)?;
        find_tag(name, version, &refs).ok_or_else(|| Error::VersionNotFound {
            name: name.to_string(),
            constraint: format!("={version}"),
        })
    }

    /// Put `reference` on disk, returning its directory.
    fn materialize(
        &self,
        reference: &ResolvedReference,
        state: &mut InstallState,
    ) -> Result<NormalizedPath> {
        let Some(remote) = reference.remote_ref() else {
            let path = reference.file_path.clone().unwrap_or_default();
            return Ok(NormalizedPath::from(path));
        };

        let dir = self.layout.install_dir(&reference.name, &reference.version_label());
        if dir.is_dir() {
            debug!(reference = %reference, "already installed");
            return Ok(dir);
        }

        let native = dir.to_native();
        if let Err(e) = self.source.fetch(&reference.name, &remote, &native) {
            if native.exists() {
                // Leave no half-cloned directory behind
                if let Err(cleanup) = std::fs::remove_dir_all(&native) {
                    warn!(dir = %dir, error = %cleanup, "failed to remove partial install");
                }
            }
            return Err(e.into());
        }
        info!(reference = %reference, dir = %dir, "installed");
        state.fetched.push(reference.clone());
        Ok(dir)
    }

    /// Fetch the best reference for `dependency` outside of a full install.
    pub fn fetch(&self, dependency: &VersionConstraint) -> Result<Mod> {
        let reference = if dependency.is_local() {
            self.resolve_reference("", dependency, &WorkspaceLock::new())?
        } else {
            select_reference(dependency, &self.source.list_refs(&dependency.name)?)?
        };
        let mut state = InstallState::default();
        let dir = self.materialize(&reference, &mut state)?;
        load_definition(&dir, &reference.name, reference.version, &self.naming)
    }
}
