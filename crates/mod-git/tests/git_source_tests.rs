//! GitSource against local repositories

use mod_git::{Error, GitSource, ModSource, RemoteRef};
use mod_test_utils::git::{branch_head, commit_files, repo_with_releases};
use mod_test_utils::mods::Mirror;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

#[test]
fn lists_tags_and_branches() {
    let mirror = Mirror::new();
    let path = mirror.publish(
        "github.com/test/m1",
        &[("v1.0.0", "mod \"m1\" {}"), ("v2.0.0", "mod \"m1\" {}")],
    );
    let repo = git2::Repository::open(&path).unwrap();
    branch_head(&repo, "develop");

    let source = GitSource::with_mirror(mirror.root());
    let refs = source.list_refs("github.com/test/m1").unwrap();

    assert!(refs.contains(&RemoteRef::tag("v1.0.0")));
    assert!(refs.contains(&RemoteRef::tag("v2.0.0")));
    assert!(refs.contains(&RemoteRef::branch("develop")));
}

#[test]
fn fetch_tag_checks_out_that_release() {
    let mirror = Mirror::new();
    mirror.publish(
        "github.com/test/m1",
        &[
            ("v1.0.0", "mod \"m1\" { title = \"one\" }"),
            ("v2.0.0", "mod \"m1\" { title = \"two\" }"),
        ],
    );
    let dest_root = TempDir::new().unwrap();
    let dest = dest_root.path().join("m1@1.0.0");

    let source = GitSource::with_mirror(mirror.root());
    source
        .fetch("github.com/test/m1", &RemoteRef::tag("v1.0.0"), &dest)
        .unwrap();

    let text = fs::read_to_string(dest.join("mod.mp")).unwrap();
    assert!(text.contains("\"one\""), "unexpected content: {text}");
}

#[test]
fn fetch_branch_clones_branch_head() {
    let origin_root = TempDir::new().unwrap();
    let origin = origin_root.path().join("github.com/test/m2");
    let repo = repo_with_releases(&origin, &[("v1.0.0", &[("mod.mp", "mod \"m2\" {}")])]);
    branch_head(&repo, "feature");
    repo.set_head("refs/heads/feature").unwrap();
    commit_files(&repo, &[("extra.mp", "query \"q\" { sql = \"select 1\" }")], "feature work");

    let dest_root = TempDir::new().unwrap();
    let dest = dest_root.path().join("m2@feature");
    GitSource::with_mirror(origin_root.path())
        .fetch("github.com/test/m2", &RemoteRef::branch("feature"), &dest)
        .unwrap();

    assert!(dest.join("extra.mp").exists());
}

#[test]
fn fetch_unknown_tag_is_reported() {
    let mirror = Mirror::new();
    mirror.publish("github.com/test/m1", &[("v1.0.0", "mod \"m1\" {}")]);
    let dest_root = TempDir::new().unwrap();

    let err = GitSource::with_mirror(mirror.root())
        .fetch(
            "github.com/test/m1",
            &RemoteRef::tag("v9.9.9"),
            &dest_root.path().join("m1@9.9.9"),
        )
        .unwrap_err();
    assert!(matches!(err, Error::RefNotFound { .. }), "got {err:?}");
}

#[test]
fn fetch_refuses_existing_destination() {
    let mirror = Mirror::new();
    mirror.publish("github.com/test/m1", &[("v1.0.0", "mod \"m1\" {}")]);
    let dest = TempDir::new().unwrap();

    let err = GitSource::with_mirror(mirror.root())
        .fetch("github.com/test/m1", &RemoteRef::tag("v1.0.0"), dest.path())
        .unwrap_err();
    assert!(matches!(err, Error::DestinationExists { .. }));
}
