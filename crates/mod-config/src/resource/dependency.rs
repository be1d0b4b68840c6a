use std::fmt;

use crate::name::{PropertyPath, QualifiedName};

/// Compile-time references a block could not resolve yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDependency {
    pub from: QualifiedName,
    pub paths: Vec<PropertyPath>,
}

impl ResourceDependency {
    /// Resources the referencing block waits for, deduplicated.
    pub fn targets(&self) -> Vec<QualifiedName> {
        let mut targets: Vec<QualifiedName> = self
            .paths
            .iter()
            .map(|p| p.resource(&self.from.mod_name))
            .collect();
        targets.sort();
        targets.dedup();
        targets
    }
}

/// How a runtime value is passed to its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgBinding {
    ByName(String),
    ByPosition(usize),
}

impl fmt::Display for ArgBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByName(name) => write!(f, "arg '{name}'"),
            Self::ByPosition(index) => write!(f, "arg #{index}"),
        }
    }
}

/// A reference bound at execution time, from an interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDependency {
    /// Resource or panel whose args carry the reference
    pub source: String,
    pub path: PropertyPath,
    pub binding: ArgBinding,
}

impl fmt::Display for RuntimeDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} <- {}", self.source, self.binding, self.path)
    }
}
