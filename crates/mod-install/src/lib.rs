//! Dependency resolution and installation for modctl
//!
//! - **Resolution**: [`resolve_dependencies`] walks declared requirements
//!   against a [`ModCatalog`] and partitions mods into resolved and
//!   unresolved
//! - **Installation**: [`Installer`] fetches the dependency tree of a mod
//!   from a [`mod_git::ModSource`] and records it in the [`WorkspaceLock`]
//! - **Loading**: [`Workspace`] decodes a root mod together with every
//!   installed dependency and builds its resource tree

pub mod catalog;
pub mod error;
pub mod installer;
pub mod lock;
pub mod reference;
pub mod resolver;
pub mod workspace;

pub use catalog::{InMemoryCatalog, InstalledCatalog, ModCatalog};
pub use error::{Error, Result};
pub use installer::{InstallOptions, InstallReport, Installer, tool_version};
pub use lock::{LockEntry, WorkspaceLock};
pub use reference::{ReferenceKind, ResolvedReference, select_reference};
pub use resolver::{Resolution, Unresolved, resolve_dependencies};
pub use workspace::{Workspace, read_root_definition, read_settings};
