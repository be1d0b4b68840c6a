//! Error types for mod-git

/// Result type for mod-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to a mod source
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] mod_fs::Error),

    #[error("Failed to list references of {url}: {message}")]
    ListFailed { url: String, message: String },

    #[error("Failed to clone {url}: {message}")]
    CloneFailed { url: String, message: String },

    #[error("Reference '{reference}' not found in {url}")]
    RefNotFound { url: String, reference: String },

    #[error("Destination already exists: {path}")]
    DestinationExists { path: String },
}
