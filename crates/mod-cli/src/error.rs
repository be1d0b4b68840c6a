//! Error types for mod-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from mod-install
    #[error(transparent)]
    Install(#[from] mod_install::Error),

    /// Error from mod-config
    #[error(transparent)]
    Config(#[from] mod_config::Error),

    /// Error from mod-fs
    #[error(transparent)]
    Fs(#[from] mod_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Decode diagnostics behind this error, if it carries any.
    pub fn diagnostics(&self) -> Option<&mod_config::Diagnostics> {
        match self {
            Self::Config(e) => e.diagnostics(),
            Self::Install(mod_install::Error::Config(e)) => e.diagnostics(),
            _ => None,
        }
    }
}
