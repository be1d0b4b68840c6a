//! Mod version resolution
//!
//! Walks the declared dependencies of a set of root mods, choosing for each
//! constraint the highest known version that satisfies it, and partitions
//! every mod seen into resolved and unresolved. Cycles are reported, never
//! broken, and every failure in a subtree is collected rather than stopping
//! at the first.

use std::collections::BTreeMap;

use mod_config::{Mod, VersionConstraint};
use tracing::{debug, warn};

use crate::catalog::ModCatalog;

/// A mod that could not be resolved, with why.
#[derive(Debug, Clone)]
pub struct Unresolved {
    pub module: Mod,
    pub reason: String,
}

/// Outcome of [`resolve_dependencies`].
///
/// Both maps are keyed by `full_name` when versionless and by
/// `full_name@version` otherwise, so a failure of one version never hides
/// another version of the same mod.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub resolved: BTreeMap<String, Mod>,
    pub unresolved: BTreeMap<String, Unresolved>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Reasons of every unresolved mod, sorted by name.
    pub fn failures(&self) -> Vec<String> {
        self.unresolved
            .iter()
            .map(|(name, u)| format!("{name}: {}", u.reason))
            .collect()
    }
}

/// Resolve the dependency trees of `roots` against `catalog`.
pub fn resolve_dependencies(catalog: &mut dyn ModCatalog, roots: &[Mod]) -> Resolution {
    let mut resolver = Resolver {
        catalog,
        resolution: Resolution::default(),
    };
    for root in roots {
        if resolver.is_classified(root) {
            continue;
        }
        // Failures are recorded in the resolution
        let _ = resolver.resolve(root, &[]);
    }

    let resolution = resolver.resolution;
    debug!(
        resolved = resolution.resolved.len(),
        unresolved = resolution.unresolved.len(),
        "dependency resolution finished"
    );
    resolution
}

struct Resolver<'c> {
    catalog: &'c mut dyn ModCatalog,
    resolution: Resolution,
}

impl Resolver<'_> {
    fn is_classified(&self, m: &Mod) -> bool {
        self.resolution.resolved.contains_key(&m.dependency_key())
            || self.resolution.unresolved.contains_key(&m.dependency_key())
    }

    /// Resolve `m` and everything below it.
    ///
    /// `resolving` is the chain of mods currently being resolved above `m`.
    fn resolve(&mut self, m: &Mod, resolving: &[String]) -> Result<(), String> {
        if let Some(start) = resolving.iter().position(|name| *name == m.full_name) {
            let mut cycle: Vec<&str> = resolving[start..].iter().map(String::as_str).collect();
            cycle.push(&m.full_name);
            return Err(format!("circular dependency {}", cycle.join(" -> ")));
        }
        let key = m.dependency_key();
        if self.resolution.resolved.contains_key(&key) {
            return Ok(());
        }
        if let Some(unresolved) = self.resolution.unresolved.get(&key) {
            return Err(unresolved.reason.clone());
        }

        let mut chain = resolving.to_vec();
        chain.push(m.full_name.clone());

        let mut failures = Vec::new();
        for dependency in m.dependencies() {
            let candidate = match self.candidate(dependency) {
                Ok(candidate) => candidate,
                Err(reason) => {
                    failures.push(reason);
                    continue;
                }
            };
            if let Err(reason) = self.resolve(&candidate, &chain) {
                failures.push(format!("{dependency}: {reason}"));
            }
        }

        if failures.is_empty() {
            debug!(mod_name = %m.full_name, version = %m.version_label(), "resolved");
            self.resolution.resolved.insert(key, m.clone());
            Ok(())
        } else {
            let reason = failures.join("; ");
            warn!(mod_name = %m.full_name, reason = %reason, "unresolved");
            self.resolution.unresolved.insert(
                key,
                Unresolved {
                    module: m.clone(),
                    reason: reason.clone(),
                },
            );
            Err(reason)
        }
    }

    /// Choose the version of `dependency` to descend into.
    fn candidate(&mut self, dependency: &VersionConstraint) -> Result<Mod, String> {
        let known = self
            .catalog
            .versions(&dependency.name)
            .map_err(|e| format!("{dependency}: {e}"))?;

        if let Some(best) = best_match(dependency, &known) {
            return Ok(best.clone());
        }
        if !known.is_empty() && dependency.is_explicit() {
            let available: Vec<String> = known.iter().map(Mod::version_label).collect();
            return Err(format!(
                "{dependency}: version not found (available: {})",
                available.join(", ")
            ));
        }

        debug!(dependency = %dependency, "no known version, fetching");
        self.catalog
            .fetch(dependency)
            .map_err(|e| format!("{dependency}: {e}"))
    }
}

/// Highest known version satisfying `dependency`.
///
/// Branch and local constraints accept the versionless candidate.
fn best_match<'m>(dependency: &VersionConstraint, known: &'m [Mod]) -> Option<&'m Mod> {
    if dependency.is_branch() || dependency.is_local() {
        return known.iter().find(|m| m.version.is_none());
    }
    known
        .iter()
        .filter(|m| match &m.version {
            Some(version) => dependency.matches(version),
            // An unversioned mod only satisfies "latest"
            None => !dependency.is_explicit(),
        })
        .max_by(|a, b| a.version.cmp(&b.version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use mod_config::NameConvention;
    use pretty_assertions::assert_eq;
    use semver::Version;

    fn dep(name: &str, version: &str) -> VersionConstraint {
        VersionConstraint::from_parts(name, version, &NameConvention::default()).unwrap()
    }

    fn release(name: &str, version: Option<(u64, u64, u64)>, deps: &[(&str, &str)]) -> Mod {
        let mut m = Mod::new(name).with_full_name(format!("github.com/turbot/{name}"));
        m.version = version.map(|(a, b, c)| Version::new(a, b, c));
        for (dep_name, dep_version) in deps {
            m = m.with_dependency(dep(dep_name, dep_version));
        }
        m
    }

    #[test]
    fn test_best_match_prefers_highest() {
        let known = vec![
            release("m", Some((1, 0, 0)), &[]),
            release("m", Some((1, 4, 0)), &[]),
            release("m", Some((2, 0, 0)), &[]),
            release("m", None, &[]),
        ];
        let best = best_match(&dep("m", "^1.0"), &known).unwrap();
        assert_eq!(best.version, Some(Version::new(1, 4, 0)));

        let best = best_match(&dep("m", "latest"), &known).unwrap();
        assert_eq!(best.version, Some(Version::new(2, 0, 0)));

        let best = best_match(&dep("m", "main"), &known).unwrap();
        assert_eq!(best.version, None);
    }

    #[test]
    fn test_explicit_version_must_be_known() {
        let mut catalog = InMemoryCatalog::new().with(release("m2", Some((2, 0, 0)), &[]));
        let root = release("m1", None, &[("m2", "1.0")]);

        let resolution = resolve_dependencies(&mut catalog, &[root]);

        let reason = &resolution.unresolved["github.com/turbot/m1"].reason;
        assert!(reason.contains("version not found (available: 2.0.0)"), "{reason}");
    }

    #[test]
    fn test_failures_are_collected() {
        let mut catalog = InMemoryCatalog::new();
        let root = release("m1", None, &[("a", "1.0"), ("b", "2.0")]);

        let resolution = resolve_dependencies(&mut catalog, &[root]);

        let reason = &resolution.unresolved["github.com/turbot/m1"].reason;
        assert!(reason.contains("github.com/turbot/a@1.0"), "{reason}");
        assert!(reason.contains("github.com/turbot/b@2.0"), "{reason}");
        assert_eq!(resolution.failures().len(), 1);
    }
}
