//! Command implementations for mod-cli

pub mod check;
pub mod install;
pub mod resolve;
pub mod tree;

pub use check::run_check;
pub use install::run_install;
pub use resolve::run_resolve;
pub use tree::run_tree;

use std::path::{Path, PathBuf};

use mod_git::GitSource;

/// Git source reading from `mirror` when one is configured.
pub(crate) fn mod_source(mirror: Option<&Path>) -> GitSource {
    match mirror {
        Some(dir) => GitSource::with_mirror(dir),
        None => GitSource::new(),
    }
}

/// Mirror from the command line, else from settings.
pub(crate) fn pick_mirror(flag: Option<&Path>, settings: Option<&PathBuf>) -> Option<PathBuf> {
    flag.map(Path::to_path_buf).or_else(|| settings.cloned())
}
