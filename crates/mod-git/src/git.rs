//! git2 backed mod source

use std::path::{Path, PathBuf};

use git2::build::RepoBuilder;
use git2::{Direction, Remote};

use crate::source::{ModSource, RefKind, RemoteRef};
use crate::{Error, Result};

/// How a full mod name maps to a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// `https://<full name>`
    Https,
    /// `<mirror root>/<full name>`, a directory of local repositories
    Mirror(PathBuf),
}

/// A [`ModSource`] that lists and clones git repositories.
#[derive(Debug, Clone)]
pub struct GitSource {
    locator: SourceLocator,
}

impl Default for GitSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GitSource {
    /// Source resolving mod names to `https://` URLs.
    pub fn new() -> Self {
        Self {
            locator: SourceLocator::Https,
        }
    }

    /// Source resolving mod names below a local mirror directory.
    pub fn with_mirror(root: impl Into<PathBuf>) -> Self {
        Self {
            locator: SourceLocator::Mirror(root.into()),
        }
    }

    pub fn locator(&self) -> &SourceLocator {
        &self.locator
    }

    /// Repository URL for a full mod name.
    pub fn url(&self, full_name: &str) -> String {
        match &self.locator {
            SourceLocator::Https => format!("https://{full_name}"),
            SourceLocator::Mirror(root) => root.join(full_name).to_string_lossy().into_owned(),
        }
    }
}

impl ModSource for GitSource {
    fn list_refs(&self, full_name: &str) -> Result<Vec<RemoteRef>> {
        let url = self.url(full_name);
        let list_failed = |e: git2::Error| Error::ListFailed {
            url: url.clone(),
            message: e.message().to_string(),
        };

        let mut remote = Remote::create_detached(url.as_str()).map_err(list_failed)?;
        remote.connect(Direction::Fetch).map_err(list_failed)?;

        let mut refs = Vec::new();
        for head in remote.list().map_err(list_failed)? {
            if let Some(remote_ref) = parse_ref_name(head.name()) {
                refs.push(remote_ref);
            }
        }
        remote.disconnect().map_err(list_failed)?;

        refs.sort();
        refs.dedup();
        tracing::debug!(url = %url, count = refs.len(), "listed remote references");
        Ok(refs)
    }

    fn fetch(&self, full_name: &str, reference: &RemoteRef, dest: &Path) -> Result<()> {
        let url = self.url(full_name);
        if dest.exists() {
            return Err(Error::DestinationExists {
                path: dest.display().to_string(),
            });
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| mod_fs::Error::io(parent, e))?;
        }

        tracing::info!(url = %url, reference = %reference, dest = %dest.display(), "fetching mod");
        match reference.kind {
            RefKind::Branch => {
                RepoBuilder::new()
                    .branch(&reference.name)
                    .clone(&url, dest)
                    .map_err(|e| clone_failed(&url, reference, e))?;
            }
            RefKind::Tag => checkout_tag(&url, &reference.name, dest)?,
        }
        Ok(())
    }
}

/// Clone `url` and detach HEAD at `tag`.
fn checkout_tag(url: &str, tag: &str, dest: &Path) -> Result<()> {
    let repo = RepoBuilder::new()
        .clone(url, dest)
        .map_err(|e| Error::CloneFailed {
            url: url.to_string(),
            message: e.message().to_string(),
        })?;

    let (object, _) = repo
        .revparse_ext(&format!("refs/tags/{tag}"))
        .map_err(|_| Error::RefNotFound {
            url: url.to_string(),
            reference: tag.to_string(),
        })?;
    let commit = object.peel_to_commit()?;

    repo.checkout_tree(
        commit.as_object(),
        Some(git2::build::CheckoutBuilder::new().force()),
    )?;
    repo.set_head_detached(commit.id())?;
    Ok(())
}

fn clone_failed(url: &str, reference: &RemoteRef, e: git2::Error) -> Error {
    if e.code() == git2::ErrorCode::NotFound {
        Error::RefNotFound {
            url: url.to_string(),
            reference: reference.name.clone(),
        }
    } else {
        Error::CloneFailed {
            url: url.to_string(),
            message: e.message().to_string(),
        }
    }
}

/// Map an advertised ref name to a tag or branch.
///
/// Peeled tag entries (`refs/tags/v1^{}`) and anything outside
/// `refs/tags`/`refs/heads` are ignored.
fn parse_ref_name(name: &str) -> Option<RemoteRef> {
    if let Some(tag) = name.strip_prefix("refs/tags/") {
        if tag.ends_with("^{}") {
            return None;
        }
        return Some(RemoteRef::tag(tag));
    }
    name.strip_prefix("refs/heads/").map(RemoteRef::branch)
}
