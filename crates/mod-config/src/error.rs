//! Error types for mod-config

use crate::diagnostic::Diagnostics;

/// Result type for mod-config operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing and evaluating mods
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed dependency reference string
    #[error("invalid mod reference '{input}': {reason}")]
    ConstraintParse { input: String, reason: String },

    /// A configuration file is not valid HCL
    #[error("failed to parse {path}: {message}")]
    Syntax { path: String, message: String },

    /// Decoding produced error diagnostics
    #[error("failed to load mod '{mod_name}': {diagnostics}")]
    Diagnostics {
        mod_name: String,
        diagnostics: Diagnostics,
    },

    /// A runtime dependency could not be bound at execution time
    #[error("failed to resolve runtime dependency '{path}' of {source_name}: {reason}")]
    RuntimeDependency {
        source_name: String,
        path: String,
        reason: String,
    },

    /// Arguments do not match the parameters of a query
    #[error("invalid arguments for {resource}: {reason}")]
    Arguments { resource: String, reason: String },

    /// The control tree contains a cycle
    #[error("resource tree contains a cycle: {}", .path.join(" -> "))]
    TreeCycle { path: Vec<String> },

    /// A tree node lists a child that does not exist
    #[error("{parent} lists unknown child {child}")]
    UnknownChild { parent: String, child: String },

    #[error(transparent)]
    Fs(#[from] mod_fs::Error),
}

impl Error {
    /// Diagnostics carried by this error, if any.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::Diagnostics { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}
