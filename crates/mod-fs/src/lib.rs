//! Filesystem layer for modctl workspaces
//!
//! Provides the workspace state layout (installed mods, lock file, settings),
//! normalized paths, atomic locked writes and configuration file listing.

pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod layout;
pub mod listing;
pub mod path;

pub use config::{ConfigStore, Settings};
pub use constants::StatePath;
pub use error::{Error, Result};
pub use layout::WorkspaceLayout;
pub use listing::{ListOptions, SourceFile, list_source_files};
pub use path::NormalizedPath;
