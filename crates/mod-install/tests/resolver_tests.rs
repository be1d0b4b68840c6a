//! Tests for dependency resolution against in-memory catalogs

use mod_config::{Mod, NameConvention, VersionConstraint};
use mod_install::{InMemoryCatalog, resolve_dependencies};
use pretty_assertions::assert_eq;
use semver::Version;

fn release(name: &str, version: Option<(u64, u64, u64)>, deps: &[(&str, &str)]) -> Mod {
    let mut m = Mod::new(name);
    m.version = version.map(|(major, minor, patch)| Version::new(major, minor, patch));
    for (dep_name, dep_version) in deps {
        let constraint =
            VersionConstraint::from_parts(dep_name, dep_version, &NameConvention::default())
                .unwrap();
        m = m.with_dependency(constraint);
    }
    m
}

fn full(name: &str) -> String {
    format!("github.com/turbot/{name}")
}

#[test]
fn test_chain_resolves_with_versioned_keys() {
    let m2 = release("m2", Some((1, 0, 0)), &[]).with_full_name(full("m2"));
    let mut catalog = InMemoryCatalog::new().with(m2);
    let root = release("root", None, &[("m2", "1.0")]);

    let resolution = resolve_dependencies(&mut catalog, &[root]);

    assert!(resolution.is_complete(), "{:?}", resolution.failures());
    let keys: Vec<&str> = resolution.resolved.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["github.com/turbot/m2@1.0.0", "root"]);
}

#[test]
fn test_versionless_mods_keyed_by_bare_name() {
    let m2 = release("m2", None, &[]).with_full_name(full("m2"));
    let mut catalog = InMemoryCatalog::new().with(m2);
    let root = release("m1", None, &[("m2", "latest")]);

    let resolution = resolve_dependencies(&mut catalog, &[root]);

    assert!(resolution.is_complete());
    let keys: Vec<&str> = resolution.resolved.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["github.com/turbot/m2", "m1"]);
}

#[test]
fn test_missing_version_leaves_root_unresolved() {
    let m2 = release("m2", Some((2, 0, 0)), &[]).with_full_name(full("m2"));
    let mut catalog = InMemoryCatalog::new().with(m2);
    let root = release("m1", Some((1, 0, 0)), &[("m2", "1.0")]);

    let resolution = resolve_dependencies(&mut catalog, &[root]);

    assert!(resolution.resolved.is_empty());
    let unresolved = &resolution.unresolved["m1@1.0.0"];
    assert_eq!(unresolved.module.version, Some(Version::new(1, 0, 0)));
    assert!(unresolved.reason.contains("github.com/turbot/m2"), "{}", unresolved.reason);
}

#[test]
fn test_cycle_is_reported_not_broken() {
    let m1 = release("m1", Some((1, 0, 0)), &[("m2", "1.0")]).with_full_name(full("m1"));
    let m2 = release("m2", Some((1, 0, 0)), &[("m1", "1.0")]).with_full_name(full("m2"));
    let mut catalog = InMemoryCatalog::new().with(m1.clone()).with(m2);

    let resolution = resolve_dependencies(&mut catalog, &[m1]);

    assert!(resolution.resolved.is_empty());
    let reason = &resolution.unresolved["github.com/turbot/m1@1.0.0"].reason;
    assert!(reason.contains("circular dependency"), "{reason}");
    assert!(
        reason.contains("github.com/turbot/m1 -> github.com/turbot/m2 -> github.com/turbot/m1"),
        "{reason}"
    );
    assert!(resolution.unresolved.contains_key("github.com/turbot/m2@1.0.0"));
}

#[test]
fn test_shared_dependency_resolved_once() {
    let shared = release("shared", Some((1, 2, 0)), &[]).with_full_name(full("shared"));
    let left = release("left", Some((1, 0, 0)), &[("shared", "^1.0")]).with_full_name(full("left"));
    let right =
        release("right", Some((1, 0, 0)), &[("shared", "^1.1")]).with_full_name(full("right"));
    let mut catalog = InMemoryCatalog::new().with(shared).with(left).with(right);
    let root = release("root", None, &[("left", "1.0"), ("right", "1.0")]);

    let resolution = resolve_dependencies(&mut catalog, &[root]);

    assert!(resolution.is_complete());
    assert_eq!(resolution.resolved.len(), 4);
    assert!(resolution.resolved.contains_key("github.com/turbot/shared@1.2.0"));
}

#[test]
fn test_resolution_is_deterministic() {
    let build = || {
        let a = release("a", Some((1, 0, 0)), &[("c", "latest")]).with_full_name(full("a"));
        let b = release("b", Some((1, 0, 0)), &[("c", "latest")]).with_full_name(full("b"));
        let c1 = release("c", Some((1, 0, 0)), &[]).with_full_name(full("c"));
        let c2 = release("c", Some((1, 3, 0)), &[]).with_full_name(full("c"));
        let mut catalog = InMemoryCatalog::new().with(a).with(b).with(c1).with(c2);
        let root = release("root", None, &[("b", "1.0"), ("a", "1.0")]);
        let resolution = resolve_dependencies(&mut catalog, &[root]);
        resolution.resolved.keys().cloned().collect::<Vec<_>>()
    };

    let first = build();
    assert_eq!(first, build());
    assert!(first.contains(&"github.com/turbot/c@1.3.0".to_string()));
    assert!(!first.contains(&"github.com/turbot/c@1.0.0".to_string()));
}

#[test]
fn test_independent_roots_resolved_separately() {
    let ok = release("ok", None, &[]);
    let broken = release("broken", None, &[("missing", "1.0")]);
    let mut catalog = InMemoryCatalog::new();

    let resolution = resolve_dependencies(&mut catalog, &[ok, broken]);

    assert!(resolution.resolved.contains_key("ok"));
    assert!(resolution.unresolved.contains_key("broken"));
    assert_eq!(resolution.failures().len(), 1);
}

#[test]
fn test_failed_version_does_not_hide_another() {
    let resolve_in = |order: [&str; 2]| {
        let good = release("shared", Some((1, 0, 0)), &[]).with_full_name(full("shared"));
        let bad = release("shared", Some((2, 0, 0)), &[("missing", "1.0")])
            .with_full_name(full("shared"));
        let mut catalog = InMemoryCatalog::new().with(good).with(bad);
        let a = release("a", None, &[("shared", "2.0")]);
        let b = release("b", None, &[("shared", "1.0")]);
        let roots: Vec<Mod> = order
            .iter()
            .map(|name| if *name == "a" { a.clone() } else { b.clone() })
            .collect();
        let resolution = resolve_dependencies(&mut catalog, &roots);
        let resolved: Vec<String> = resolution.resolved.keys().cloned().collect();
        let unresolved: Vec<String> = resolution.unresolved.keys().cloned().collect();
        (resolved, unresolved)
    };

    let (resolved, unresolved) = resolve_in(["a", "b"]);
    assert_eq!(resolved, vec!["b", "github.com/turbot/shared@1.0.0"]);
    assert_eq!(unresolved, vec!["a", "github.com/turbot/shared@2.0.0"]);
    assert_eq!(resolve_in(["b", "a"]), (resolved, unresolved));
}
