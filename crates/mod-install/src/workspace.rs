//! Loading a whole workspace
//!
//! A workspace is a root mod plus every installed mod it depends on,
//! transitively. Dependencies are decoded first, deepest first, so that each
//! mod decodes with the resources of its own dependencies in scope.

use std::collections::BTreeMap;

use hcl::Value;
use mod_config::constraint::{NameConvention, VersionConstraint, parse_tag_version};
use mod_config::modfile::parse_mod_definition;
use mod_config::{
    BlockRegistry, Mod, ParseOptions, QualifiedName, Resource, ResourceProvider, ResourceTree,
    load_mod_dir,
};
use mod_fs::{ConfigStore, NormalizedPath, Settings, SourceFile, WorkspaceLayout, io};
use semver::Version;
use tracing::{debug, info};

use crate::catalog::load_definition;
use crate::error::{Error, Result};
use crate::lock::WorkspaceLock;

/// Read `.modctl/settings.toml`, defaulting when absent.
pub fn read_settings(layout: &WorkspaceLayout) -> Result<Settings> {
    Ok(ConfigStore::new().load_or_default(&layout.settings_path())?)
}

/// Read the `mod` block of the workspace root.
///
/// A workspace without `mod.mp` is the default `local` mod with no
/// requirements.
pub fn read_root_definition(layout: &WorkspaceLayout, naming: &NameConvention) -> Result<Mod> {
    let path = layout.mod_file();
    let root = match io::read_text_if_exists(&path)? {
        Some(content) => parse_mod_definition(&SourceFile::new(path, content), naming)?,
        None => Mod::default_local(),
    };
    Ok(root.with_dir(layout.root().clone()))
}

/// A decoded workspace.
#[derive(Debug)]
pub struct Workspace {
    layout: WorkspaceLayout,
    settings: Settings,
    lock: WorkspaceLock,
    root: Mod,
    /// Every dependency mod, each after its own dependencies
    dependencies: Vec<Mod>,
    tree: ResourceTree,
}

impl Workspace {
    /// Load the workspace at `root` with the variables from its settings.
    pub fn load(root: impl Into<NormalizedPath>) -> Result<Self> {
        Self::load_with_variables(root, BTreeMap::new())
    }

    /// Load the workspace at `root`, `variables` overriding settings.
    ///
    /// # Errors
    ///
    /// [`Error::NotInstalled`] when a required mod is missing from the mods
    /// directory, or the decode errors of the first mod that fails.
    pub fn load_with_variables(
        root: impl Into<NormalizedPath>,
        variables: BTreeMap<String, Value>,
    ) -> Result<Self> {
        let layout = WorkspaceLayout::new(root)?;
        let settings = read_settings(&layout)?;
        let lock = WorkspaceLock::load(&layout)?;
        let naming = NameConvention::from_settings(&settings);
        let registry = BlockRegistry::with_builtins();

        let shell = read_root_definition(&layout, &naming)?;
        let mut loader = DependencyLoader {
            layout: &layout,
            lock: &lock,
            registry: &registry,
            options: ParseOptions {
                variables: BTreeMap::new(),
                naming: naming.clone(),
            },
            loaded: BTreeMap::new(),
            order: Vec::new(),
            loading: Vec::new(),
        };
        let direct = loader.load_dependencies(&shell)?;

        let mut options = ParseOptions::from_settings(&settings);
        options.variables.extend(variables);
        let root = {
            let direct_mods: Vec<&Mod> = direct.iter().map(|key| &loader.loaded[key]).collect();
            load_mod_dir(layout.root(), &registry, &options, &direct_mods)?
        };
        let root = root.with_full_name(shell.full_name.clone());

        let DependencyLoader {
            mut loaded, order, ..
        } = loader;
        let dependencies: Vec<Mod> = order.iter().filter_map(|key| loaded.remove(key)).collect();

        let tree = {
            let refs: Vec<&Mod> = dependencies.iter().collect();
            ResourceTree::build(&root, &refs)?
        };

        info!(
            root = %root.name,
            dependencies = dependencies.len(),
            resources = root.resources.len(),
            "loaded workspace"
        );
        Ok(Self {
            layout,
            settings,
            lock,
            root,
            dependencies,
            tree,
        })
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn lock(&self) -> &WorkspaceLock {
        &self.lock
    }

    pub fn root_mod(&self) -> &Mod {
        &self.root
    }

    /// Dependency mods, each listed after its own dependencies.
    pub fn dependencies(&self) -> &[Mod] {
        &self.dependencies
    }

    pub fn tree(&self) -> &ResourceTree {
        &self.tree
    }

    /// Find a mod by short name.
    pub fn find_mod(&self, name: &str) -> Option<&Mod> {
        std::iter::once(&self.root)
            .chain(&self.dependencies)
            .find(|m| m.name == name)
    }
}

impl ResourceProvider for Workspace {
    fn resource(&self, name: &QualifiedName) -> Option<&Resource> {
        self.find_mod(&name.mod_name)?.resource(name)
    }
}

struct DependencyLoader<'a> {
    layout: &'a WorkspaceLayout,
    lock: &'a WorkspaceLock,
    registry: &'a BlockRegistry,
    options: ParseOptions,
    /// Decoded mods by install directory
    loaded: BTreeMap<String, Mod>,
    order: Vec<String>,
    loading: Vec<String>,
}

impl DependencyLoader<'_> {
    /// Decode the dependencies of `parent`, returning their keys.
    fn load_dependencies(&mut self, parent: &Mod) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for dependency in parent.dependencies() {
            let (dir, version) = self.locate(&parent.full_name, dependency)?;
            let key = dir.as_str().to_string();
            if self.loaded.contains_key(&key) {
                keys.push(key);
                continue;
            }
            if self.loading.contains(&key) {
                return Err(Error::CircularDependency {
                    cycle: format!("{} -> {}", self.loading.join(" -> "), key),
                });
            }

            let shell = load_definition(&dir, &dependency.name, version, &self.options.naming)?;
            self.loading.push(key.clone());
            let nested = self.load_dependencies(&shell)?;
            self.loading.pop();

            let decoded = {
                let nested_mods: Vec<&Mod> = nested.iter().map(|k| &self.loaded[k]).collect();
                load_mod_dir(&dir, self.registry, &self.options, &nested_mods)?
            };
            let mut decoded = decoded.with_full_name(dependency.name.clone());
            decoded.version = shell.version;
            debug!(
                mod_name = %decoded.full_name,
                version = %decoded.version_label(),
                resources = decoded.resources.len(),
                "loaded dependency mod"
            );

            self.loaded.insert(key.clone(), decoded);
            self.order.push(key.clone());
            keys.push(key);
        }
        Ok(keys)
    }

    /// Install directory of the version of `dependency` to load.
    fn locate(
        &self,
        parent: &str,
        dependency: &VersionConstraint,
    ) -> Result<(NormalizedPath, Option<Version>)> {
        let not_installed = || Error::NotInstalled {
            name: dependency.name.clone(),
            constraint: dependency.version_string.clone(),
        };

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
            return Ok((NormalizedPath::from(native), None));
        }

        if let Some(branch) = &dependency.branch {
            let dir = self.layout.install_dir(&dependency.name, branch);
            return if dir.is_dir() {
                Ok((dir, None))
            } else {
                Err(not_installed())
            };
        }

        if let Some(entry) = self.lock.get(parent, &dependency.name) {
            let dir = self
                .layout
                .install_dir(&dependency.name, &entry.version.to_string());
            if dir.is_dir() && dependency.matches(&entry.version) {
                return Ok((dir, Some(entry.version.clone())));
            }
        }

        let best = self
            .layout
            .installed_labels(&dependency.name)?
            .into_iter()
            .filter_map(|label| parse_tag_version(&label).map(|v| (v, label)))
            .filter(|(version, _)| dependency.matches(version))
            .max_by(|(a, _), (b, _)| a.cmp(b));
        match best {
            Some((version, label)) => Ok((
                self.layout.install_dir(&dependency.name, &label),
                Some(version),
            )),
            None => Err(not_installed()),
        }
    }
}
