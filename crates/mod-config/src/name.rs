//! Resource names and reference paths

use std::fmt;

use crate::registry::BlockRegistry;

/// Scope qualifier restricting a reference to the enclosing resource.
pub const SELF_SCOPE: &str = "self";

/// Where a block was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub block: String,
}

impl Location {
    pub fn new(file: impl Into<String>, block: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            block: block.into(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.file, self.block)
    }
}

/// Every kind of resource a mod can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Mod,
    Variable,
    Local,
    Query,
    Control,
    Benchmark,
    Dashboard,
    Input,
}

impl ResourceKind {
    /// Name used in references and qualified names (`var`, `query`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mod => "mod",
            Self::Variable => "var",
            Self::Local => "local",
            Self::Query => "query",
            Self::Control => "control",
            Self::Benchmark => "benchmark",
            Self::Dashboard => "dashboard",
            Self::Input => "input",
        }
    }

    /// Whether resources of this kind take part in the control tree.
    pub fn is_tree_item(&self) -> bool {
        matches!(self, Self::Control | Self::Benchmark)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource name qualified by its mod: `mod.kind.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub mod_name: String,
    pub kind: ResourceKind,
    pub name: String,
}

impl QualifiedName {
    pub fn new(mod_name: impl Into<String>, kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            mod_name: mod_name.into(),
            kind,
            name: name.into(),
        }
    }

    /// Parse `mod.kind.name`. Everything after the second dot is the name.
    pub fn parse(text: &str, registry: &BlockRegistry) -> Option<Self> {
        let mut parts = text.splitn(3, '.');
        let mod_name = parts.next()?;
        let kind = registry.reference_kind(parts.next()?)?;
        let name = parts.next()?;
        if mod_name.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(mod_name, kind, name))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.mod_name, self.kind, self.name)
    }
}

/// A structured reference: `[self.][mod.]item_type.name[.property...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPath {
    pub scope: Option<String>,
    pub mod_name: Option<String>,
    pub kind: ResourceKind,
    pub name: String,
    pub property: Vec<String>,
}

impl PropertyPath {
    /// Interpret the segments of a traversal.
    ///
    /// `dependency_mods` lists the mod names that may prefix a reference.
    /// Returns `None` when the segments do not name a resource.
    pub fn from_segments(
        segments: &[String],
        registry: &BlockRegistry,
        dependency_mods: &[String],
    ) -> Option<Self> {
        let (scope, rest) = match segments.split_first() {
            Some((first, rest)) if first == SELF_SCOPE => (Some(first.clone()), rest),
            _ => (None, segments),
        };
        let (mod_name, rest) = match rest.split_first() {
            Some((first, rest))
                if scope.is_none()
                    && registry.reference_kind(first).is_none()
                    && dependency_mods.contains(first) =>
            {
                (Some(first.clone()), rest)
            }
            _ => (None, rest),
        };
        let [item_type, name, property @ ..] = rest else {
            return None;
        };
        let kind = registry.reference_kind(item_type)?;
        Some(Self {
            scope,
            mod_name,
            kind,
            name: name.clone(),
            property: property.to_vec(),
        })
    }

    /// Parse a dotted reference string.
    pub fn parse(text: &str, registry: &BlockRegistry, dependency_mods: &[String]) -> Option<Self> {
        let segments: Vec<String> = text.split('.').map(str::to_string).collect();
        Self::from_segments(&segments, registry, dependency_mods)
    }

    pub fn is_self_scoped(&self) -> bool {
        self.scope.as_deref() == Some(SELF_SCOPE)
    }

    /// The resource this path points at, relative to `current_mod`.
    pub fn resource(&self, current_mod: &str) -> QualifiedName {
        let mod_name = self.mod_name.as_deref().unwrap_or(current_mod);
        QualifiedName::new(mod_name, self.kind, self.name.clone())
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.scope {
            write!(f, "{scope}.")?;
        }
        if let Some(mod_name) = &self.mod_name {
            write!(f, "{mod_name}.")?;
        }
        write!(f, "{}.{}", self.kind, self.name)?;
        for segment in &self.property {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn segments(text: &str) -> Vec<String> {
        text.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_qualified_name_round_trip() {
        let registry = BlockRegistry::with_builtins();
        let name = QualifiedName::parse("m1.input.overview.region", &registry).unwrap();
        assert_eq!(name.kind, ResourceKind::Input);
        assert_eq!(name.name, "overview.region");
        assert_eq!(name.to_string(), "m1.input.overview.region");

        assert!(QualifiedName::parse("m1.nothing.x", &registry).is_none());
        assert!(QualifiedName::parse("m1.query", &registry).is_none());
    }

    #[test]
    fn test_property_path_shapes() {
        let registry = BlockRegistry::with_builtins();
        let deps = vec!["aws".to_string()];

        let path =
            PropertyPath::from_segments(&segments("query.q1.sql"), &registry, &deps).unwrap();
        assert_eq!(path.mod_name, None);
        assert_eq!(path.kind, ResourceKind::Query);
        assert_eq!(path.property, vec!["sql"]);

        let path =
            PropertyPath::from_segments(&segments("aws.control.c1"), &registry, &deps).unwrap();
        assert_eq!(path.mod_name.as_deref(), Some("aws"));
        assert_eq!(path.resource("local_mod").to_string(), "aws.control.c1");

        let path =
            PropertyPath::from_segments(&segments("self.input.region.value"), &registry, &deps)
                .unwrap();
        assert!(path.is_self_scoped());
        assert_eq!(path.to_string(), "self.input.region.value");

        assert!(PropertyPath::from_segments(&segments("unknown.q1"), &registry, &deps).is_none());
        assert!(PropertyPath::from_segments(&segments("var"), &registry, &deps).is_none());
    }
}
