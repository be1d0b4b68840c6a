//! Mod source trait

use std::path::Path;

use crate::Result;

/// Kind of a remote reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefKind {
    /// A release tag (`v1.2.0`)
    Tag,
    /// A branch (`main`)
    Branch,
}

/// A tag or branch advertised by a mod source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemoteRef {
    pub kind: RefKind,
    /// Short reference name (`v1.2.0`, `main`)
    pub name: String,
}

impl RemoteRef {
    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            kind: RefKind::Tag,
            name: name.into(),
        }
    }

    pub fn branch(name: impl Into<String>) -> Self {
        Self {
            kind: RefKind::Branch,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RemoteRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            RefKind::Tag => write!(f, "tag {}", self.name),
            RefKind::Branch => write!(f, "branch {}", self.name),
        }
    }
}

/// Where mod content comes from.
///
/// Implementations must not retry internally; a failed call is reported to
/// the caller, which decides whether to try again.
pub trait ModSource {
    /// List the tags and branches available for `full_name`.
    fn list_refs(&self, full_name: &str) -> Result<Vec<RemoteRef>>;

    /// Materialize `reference` of `full_name` into `dest`.
    ///
    /// `dest` must not exist yet.
    fn fetch(&self, full_name: &str, reference: &RemoteRef, dest: &Path) -> Result<()>;
}
