//! Remote mod sources for modctl
//!
//! A mod is hosted in a version-control repository addressed by its full
//! name. Tags are releases, branches are unversioned streams. The installer
//! only needs two operations from a source: list the available references
//! and fetch one of them into a directory.

pub mod error;
pub mod git;
pub mod source;

pub use error::{Error, Result};
pub use git::{GitSource, SourceLocator};
pub use source::{ModSource, RefKind, RemoteRef};
