//! Mod configuration for modctl
//!
//! This crate turns `*.mp` configuration files into typed resources:
//!
//! - **Version constraints**: `name@version` references to other mods
//! - **Parsing**: HCL blocks checked against a [`BlockRegistry`]
//! - **Decoding**: a fixpoint loop that evaluates blocks once the resources
//!   they reference are known, see [`RunContext`]
//! - **Resource tree**: controls and benchmarks arranged under their mods
//! - **Runtime dependencies**: query arguments filled from dashboard inputs
//!   at execution time
//!
//! # Example
//!
//! ```ignore
//! use mod_config::{BlockRegistry, ParseOptions, load_mod};
//! use mod_fs::SourceFile;
//!
//! let registry = BlockRegistry::with_builtins();
//! let files = vec![SourceFile::new("main.mp", "query \"q\" { sql = \"select 1\" }")];
//! let decoded = load_mod(&files, &registry, &ParseOptions::default(), &[])?;
//! assert_eq!(decoded.resources.len(), 1);
//! ```

pub mod constraint;
pub(crate) mod decode;
pub mod diagnostic;
pub mod error;
pub(crate) mod eval;
pub mod graph;
pub mod loader;
pub mod modfile;
pub mod name;
pub mod parser;
pub mod registry;
pub mod resource;
pub mod run_context;
pub mod runtime;
pub mod tree;

pub use constraint::{NameConvention, VersionConstraint, parse_tag_version, parse_version_req};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use graph::DependencyGraph;
pub use loader::{load_mod, load_mod_dir, parse_variable_overrides};
pub use modfile::{Mod, Require, parse_mod_definition};
pub use name::{Location, PropertyPath, QualifiedName, ResourceKind};
pub use registry::BlockRegistry;
pub use resource::{
    Benchmark, Control, Dashboard, HclResource, Input, Panel, Query, Resource, ResourceMap,
    TreeItem,
};
pub use run_context::{BlockState, ParseOptions, RunContext};
pub use runtime::{InputValues, PreparedCall, ResourceProvider, prepare_control, prepare_panel};
pub use tree::{NodeKind, ResourceTree, TreePath};
