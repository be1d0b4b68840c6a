//! Tests for the control and benchmark tree

use mod_config::tree::mod_root_name;
use mod_config::{
    BlockRegistry, Error, Mod, NodeKind, ParseOptions, ResourceKind, ResourceTree, load_mod,
};
use mod_fs::SourceFile;
use pretty_assertions::assert_eq;

fn load(text: &str, dependencies: &[&Mod]) -> mod_config::Result<Mod> {
    load_mod(
        &[SourceFile::new("main.mp", text)],
        &BlockRegistry::with_builtins(),
        &ParseOptions::default(),
        dependencies,
    )
}

const DIAMOND: &str = r#"
mod "main" {
  title = "Main"
}

control "shared" {
  title = "Shared control"
  sql   = "select 1"
}

benchmark "left" {
  children = [control.shared]
}

benchmark "right" {
  children = [control.shared]
}

benchmark "top" {
  title    = "Top"
  children = [benchmark.left, benchmark.right]
}

control "loose" {
  sql = "select 2"
}
"#;

#[test]
fn test_diamond_has_one_path_per_parent() {
    let root = load(DIAMOND, &[]).expect("should decode");
    let tree = ResourceTree::build(&root, &[]).expect("should build");

    let paths = tree.paths("main.control.shared");
    assert_eq!(
        paths,
        &[
            vec![
                "mod.main".to_string(),
                "main.benchmark.top".to_string(),
                "main.benchmark.left".to_string(),
                "main.control.shared".to_string(),
            ],
            vec![
                "mod.main".to_string(),
                "main.benchmark.top".to_string(),
                "main.benchmark.right".to_string(),
                "main.control.shared".to_string(),
            ],
        ]
    );
    assert!(paths.iter().all(|p| p.last().map(String::as_str) == Some("main.control.shared")));
}

#[test]
fn test_parentless_items_hang_off_mod_root() {
    let root = load(DIAMOND, &[]).expect("should decode");
    let tree = ResourceTree::build(&root, &[]).expect("should build");

    assert_eq!(tree.roots(), &["mod.main".to_string()]);
    assert_eq!(
        tree.children("mod.main"),
        &["main.benchmark.top".to_string(), "main.control.loose".to_string()]
    );
    assert_eq!(tree.parents("main.control.loose"), &["mod.main".to_string()]);
    assert_eq!(tree.kind("mod.main"), Some(NodeKind::Mod));
    assert_eq!(tree.kind("main.benchmark.top"), Some(NodeKind::Benchmark));
    assert_eq!(tree.title("mod.main"), Some("Main"));
    assert_eq!(tree.title("main.control.shared"), Some("Shared control"));
}

#[test]
fn test_leaf_paths_are_computed_eagerly() {
    let root = load(DIAMOND, &[]).expect("should decode");
    let tree = ResourceTree::build(&root, &[]).expect("should build");

    assert!(tree.has_paths("main.control.shared"));
    assert!(tree.has_paths("main.control.loose"));
    assert_eq!(tree.paths("main.benchmark.top").len(), 1);
    assert!(tree.has_paths("main.benchmark.top"));
    assert!(tree.paths("main.control.unknown").is_empty());
}

#[test]
fn test_walk_visits_shared_child_per_path() {
    let root = load(DIAMOND, &[]).expect("should decode");
    let tree = ResourceTree::build(&root, &[]).expect("should build");

    let mut visited = Vec::new();
    tree.walk(|name, depth| visited.push((name.to_string(), depth)));

    let shared: Vec<usize> = visited
        .iter()
        .filter(|(name, _)| name == "main.control.shared")
        .map(|(_, depth)| *depth)
        .collect();
    assert_eq!(shared, vec![3, 3]);
    assert_eq!(visited[0], ("mod.main".to_string(), 0));
}

#[test]
fn test_benchmark_cannot_be_its_own_child() {
    let err = load(
        "benchmark \"loop\" {\n  children = [benchmark.loop]\n}\n",
        &[],
    )
    .unwrap_err();

    let summaries: Vec<String> = err
        .diagnostics()
        .unwrap()
        .iter()
        .map(|d| d.summary.clone())
        .collect();
    assert_eq!(summaries, vec!["Benchmark 'loop' cannot be its own child"]);
}

#[test]
fn test_benchmark_children_must_be_tree_items() {
    let err = load(
        "query \"q\" {\n  sql = \"select 1\"\n}\n\nbenchmark \"b\" {\n  children = [query.q]\n}\n",
        &[],
    )
    .unwrap_err();

    assert!(matches!(err, Error::Diagnostics { .. }));
    assert!(err.to_string().contains("children must be controls or benchmarks"));
}

#[test]
fn test_dependency_benchmarks_get_their_own_root() {
    let dependency = load(
        r#"
mod "aws" {}

control "c" {
  sql = "select 1"
}

benchmark "cis" {
  children = [control.c]
}
"#,
        &[],
    )
    .expect("dependency should decode");
    let root = load(
        "mod \"main\" {}\n\nbenchmark \"all\" {\n  children = [aws.benchmark.cis]\n}\n",
        &[&dependency],
    )
    .expect("should decode");

    let tree = ResourceTree::build(&root, &[&dependency]).expect("should build");

    assert_eq!(
        tree.roots(),
        &[mod_root_name("main"), mod_root_name("aws")]
    );
    assert_eq!(tree.parents("aws.benchmark.cis"), &["main.benchmark.all".to_string()]);
    assert!(tree.children(&mod_root_name("aws")).is_empty());
    assert_eq!(
        tree.paths("aws.control.c"),
        &[vec![
            "mod.main".to_string(),
            "main.benchmark.all".to_string(),
            "aws.benchmark.cis".to_string(),
            "aws.control.c".to_string(),
        ]]
    );
    assert_eq!(
        root.resources.of_kind(ResourceKind::Benchmark).count(),
        1
    );
}

#[test]
fn test_unknown_child_is_an_error() {
    let dependency = load(
        "mod \"aws\" {}\n\ncontrol \"c\" {\n  sql = \"select 1\"\n}\n",
        &[],
    )
    .unwrap();
    let root = load(
        "mod \"main\" {}\n\nbenchmark \"all\" {\n  children = [aws.control.c]\n}\n",
        &[&dependency],
    )
    .unwrap();

    // The dependency is left out of the tree
    let err = ResourceTree::build(&root, &[]).unwrap_err();
    assert!(matches!(err, Error::UnknownChild { ref child, .. } if child == "aws.control.c"));
}
