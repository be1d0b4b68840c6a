//! Error types for mod-install

use semver::Version;

/// Result type for mod-install operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving and installing mods
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The lock pins a version the live constraint no longer accepts
    #[error(
        "{name} is locked at {locked} but {parent} requires '{required}'; \
         run install with --update to re-resolve"
    )]
    LockMismatch {
        parent: String,
        name: String,
        locked: Version,
        required: String,
    },

    /// A lock entry does not satisfy the constraint recorded next to it
    #[error("lock entry {parent} -> {name}@{version} does not satisfy '{constraint}'")]
    CorruptLock {
        parent: String,
        name: String,
        version: Version,
        constraint: String,
    },

    /// No available version satisfies a constraint
    #[error("no version of {name} satisfies '{constraint}'")]
    VersionNotFound { name: String, constraint: String },

    /// A branch constraint names a branch the source does not have
    #[error("{name} has no branch '{branch}'")]
    BranchNotFound { name: String, branch: String },

    /// A `file:` dependency points at a missing directory
    #[error("local mod {name} not found at {path}")]
    MissingLocalPath { name: String, path: String },

    /// The running tool is older than a mod requires
    #[error("{mod_name} requires modctl '{required}', running {running}")]
    ToolVersion {
        mod_name: String,
        required: String,
        running: Version,
    },

    /// A shared dependency is required at versions that cannot coexist
    #[error("{name}@{installed} is installed but {parent} requires '{required}'")]
    IncompatibleVersion {
        parent: String,
        name: String,
        installed: String,
        required: String,
    },

    /// A dependency needed to load the workspace is not installed
    #[error("{name} ('{constraint}') is not installed; run install first")]
    NotInstalled { name: String, constraint: String },

    /// Installed mods require each other
    #[error("circular dependency {cycle}")]
    CircularDependency { cycle: String },

    /// Failures collected across a whole dependency tree
    #[error("{} installing dependencies:{}", count(.errors), list(.errors))]
    Install { errors: Vec<Error> },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from mod-fs
    #[error(transparent)]
    Fs(#[from] mod_fs::Error),

    /// Source error from mod-git
    #[error(transparent)]
    Source(#[from] mod_git::Error),

    /// Configuration error from mod-config
    #[error(transparent)]
    Config(#[from] mod_config::Error),
}

fn count(errors: &[Error]) -> String {
    match errors.len() {
        1 => "1 error".to_string(),
        n => format!("{n} errors"),
    }
}

fn list(errors: &[Error]) -> String {
    errors.iter().map(|e| format!("\n  - {e}")).collect()
}
