//! Constants and enums for workspace state paths.

use std::path::Path;

/// Extension of mod configuration files.
pub const SOURCE_EXTENSION: &str = "mp";

/// Well-known entries of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatePath {
    /// The `.modctl` directory (internal workspace state)
    StateDir,
    /// The `mods` directory below the state directory (installed dependencies)
    ModsDir,
    /// The lock file inside the mods directory
    LockFile,
    /// The settings file inside the state directory
    SettingsFile,
    /// The file holding the workspace `mod` block
    ModFile,
}

impl StatePath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateDir => ".modctl",
            Self::ModsDir => "mods",
            Self::LockFile => "mods.lock.json",
            Self::SettingsFile => "settings.toml",
            Self::ModFile => "mod.mp",
        }
    }
}

impl AsRef<Path> for StatePath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for StatePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for StatePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
