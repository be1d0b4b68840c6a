//! Git repository fixtures.

use std::fs;
use std::path::Path;

use git2::{Repository, Signature};

/// Files committed for one release: `(relative path, content)`.
pub type Files<'a> = &'a [(&'a str, &'a str)];

/// Initialise a real git repository using `git2` (no commits).
///
/// # Panics
/// Panics if `git2::Repository::init` fails.
pub fn real_git_repo(path: &Path) -> Repository {
    Repository::init(path).unwrap_or_else(|e| {
        panic!(
            "real_git_repo: failed to init repository at {}: {e}",
            path.display()
        )
    })
}

/// Write `files` into the work tree and commit them on HEAD.
///
/// # Panics
/// Panics if any filesystem or git operation fails.
pub fn commit_files(repo: &Repository, files: Files<'_>, message: &str) -> git2::Oid {
    let workdir = repo
        .workdir()
        .unwrap_or_else(|| panic!("commit_files: repository is bare"));
    for (relative, content) in files {
        let path = workdir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("commit_files: failed to create {}: {e}", parent.display())
            });
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("commit_files: failed to write {}: {e}", path.display()));
    }

    let mut index = repo.index().unwrap_or_else(|e| panic!("commit_files: index: {e}"));
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap_or_else(|e| panic!("commit_files: add_all: {e}"));
    index.write().unwrap_or_else(|e| panic!("commit_files: index write: {e}"));
    let tree_id = index.write_tree().unwrap_or_else(|e| panic!("commit_files: write_tree: {e}"));
    let tree = repo.find_tree(tree_id).unwrap_or_else(|e| panic!("commit_files: find_tree: {e}"));

    let signature = Signature::now("Test User", "test@test.com")
        .unwrap_or_else(|e| panic!("commit_files: signature: {e}"));
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap_or_else(|e| panic!("commit_files: commit: {e}"))
}

/// Tag the current HEAD commit with a lightweight tag.
///
/// # Panics
/// Panics if HEAD cannot be resolved or the tag cannot be created.
pub fn tag_head(repo: &Repository, tag: &str) {
    let head = repo
        .head()
        .and_then(|h| h.peel(git2::ObjectType::Commit))
        .unwrap_or_else(|e| panic!("tag_head: no HEAD commit: {e}"));
    repo.tag_lightweight(tag, &head, false)
        .unwrap_or_else(|e| panic!("tag_head: failed to create tag {tag}: {e}"));
}

/// Create a branch at the current HEAD commit.
///
/// # Panics
/// Panics if HEAD cannot be resolved or the branch cannot be created.
pub fn branch_head(repo: &Repository, branch: &str) {
    let head = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .unwrap_or_else(|e| panic!("branch_head: no HEAD commit: {e}"));
    repo.branch(branch, &head, false)
        .unwrap_or_else(|e| panic!("branch_head: failed to create branch {branch}: {e}"));
}

/// Create a repository at `path` with one commit and tag per release.
///
/// Releases are committed in order, so later tags contain earlier files.
pub fn repo_with_releases(path: &Path, releases: &[(&str, Files<'_>)]) -> Repository {
    fs::create_dir_all(path)
        .unwrap_or_else(|e| panic!("repo_with_releases: failed to create {}: {e}", path.display()));
    let repo = real_git_repo(path);
    for (tag, files) in releases {
        commit_files(&repo, files, &format!("release {tag}"));
        tag_head(&repo, tag);
    }
    repo
}
