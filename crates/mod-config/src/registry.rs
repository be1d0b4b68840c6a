//! Block type registry
//!
//! Maps configuration block types and reference prefixes to resource kinds.
//! A registry is an ordinary value owned by whoever drives a decode, so
//! independent decodes (and tests) never share block definitions.

use std::collections::{BTreeMap, BTreeSet};

use crate::name::ResourceKind;

/// Known block types, reference prefixes and runtime-resolvable kinds.
///
/// # Example
///
/// ```
/// use mod_config::{BlockRegistry, ResourceKind};
///
/// let registry = BlockRegistry::with_builtins();
/// assert_eq!(registry.block_kind("variable"), Some(ResourceKind::Variable));
/// assert_eq!(registry.reference_kind("var"), Some(ResourceKind::Variable));
/// assert!(registry.is_runtime(ResourceKind::Input));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    /// Top-level block identifier to kind
    blocks: BTreeMap<String, ResourceKind>,
    /// Reference prefix (`var`, `query`, ...) to kind
    references: BTreeMap<String, ResourceKind>,
    /// Kinds whose values are only known at execution time
    runtime: BTreeSet<ResourceKind>,
    /// Block identifiers accepted as dashboard panels
    panels: BTreeSet<String>,
}

impl BlockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry knowing every built-in block type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_block("mod", ResourceKind::Mod);
        registry.register_block("variable", ResourceKind::Variable);
        registry.register_block("locals", ResourceKind::Local);
        for kind in [
            ResourceKind::Query,
            ResourceKind::Control,
            ResourceKind::Benchmark,
            ResourceKind::Dashboard,
            ResourceKind::Input,
        ] {
            registry.register_block(kind.as_str(), kind);
        }
        for kind in [
            ResourceKind::Variable,
            ResourceKind::Local,
            ResourceKind::Query,
            ResourceKind::Control,
            ResourceKind::Benchmark,
            ResourceKind::Dashboard,
            ResourceKind::Input,
        ] {
            registry.register_reference(kind.as_str(), kind);
        }
        registry.register_runtime(ResourceKind::Input);
        for panel in ["table", "chart", "card"] {
            registry.register_panel(panel);
        }
        registry
    }

    /// Register a top-level block type. Replaces an existing registration.
    pub fn register_block(&mut self, identifier: impl Into<String>, kind: ResourceKind) {
        self.blocks.insert(identifier.into(), kind);
    }

    pub fn register_reference(&mut self, prefix: impl Into<String>, kind: ResourceKind) {
        self.references.insert(prefix.into(), kind);
    }

    pub fn register_runtime(&mut self, kind: ResourceKind) {
        self.runtime.insert(kind);
    }

    pub fn register_panel(&mut self, identifier: impl Into<String>) {
        self.panels.insert(identifier.into());
    }

    /// Kind declared by a top-level block identifier.
    pub fn block_kind(&self, identifier: &str) -> Option<ResourceKind> {
        self.blocks.get(identifier).copied()
    }

    /// Kind named by a reference prefix.
    pub fn reference_kind(&self, prefix: &str) -> Option<ResourceKind> {
        self.references.get(prefix).copied()
    }

    /// Whether references to `kind` are bound at execution time.
    pub fn is_runtime(&self, kind: ResourceKind) -> bool {
        self.runtime.contains(&kind)
    }

    pub fn is_panel(&self, identifier: &str) -> bool {
        self.panels.contains(identifier)
    }

    /// Reference prefixes, sorted.
    pub fn reference_prefixes(&self) -> impl Iterator<Item = &str> {
        self.references.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
