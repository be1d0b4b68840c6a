//! Configuration file listing
//!
//! The decode engine only consumes a list of [`SourceFile`]s. This module is
//! the default policy used by the CLI: every `*.mp` file below the root,
//! skipping hidden directories (which includes the state directory).

use crate::constants::SOURCE_EXTENSION;
use crate::{Error, NormalizedPath, Result, io};
use std::fs;

/// One configuration file and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: NormalizedPath,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<NormalizedPath>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Listing policy.
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// File extension to include, without the dot
    pub extension: String,
    /// Whether to descend into subdirectories
    pub recursive: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            extension: SOURCE_EXTENSION.to_string(),
            recursive: true,
        }
    }
}

/// Read every matching file below `root`, sorted by path.
pub fn list_source_files(root: &NormalizedPath, options: &ListOptions) -> Result<Vec<SourceFile>> {
    let mut paths = Vec::new();
    collect(root, options, &mut paths)?;
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let content = io::read_text(&path)?;
        files.push(SourceFile { path, content });
    }
    tracing::debug!(root = %root, count = files.len(), "listed source files");
    Ok(files)
}

fn collect(
    dir: &NormalizedPath,
    options: &ListOptions,
    out: &mut Vec<NormalizedPath>,
) -> Result<()> {
    let native = dir.to_native();
    for entry in fs::read_dir(&native).map_err(|e| Error::io(&native, e))? {
        let entry = entry.map_err(|e| Error::io(&native, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = dir.join(&name);
        if entry.path().is_dir() {
            if options.recursive {
                collect(&path, options, out)?;
            }
        } else if path.extension() == Some(options.extension.as_str()) {
            out.push(path);
        }
    }
    Ok(())
}
