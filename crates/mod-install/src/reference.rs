//! Constraints bound to concrete, fetchable references

use std::fmt;
use std::path::PathBuf;

use mod_config::constraint::{LATEST, VersionConstraint, parse_tag_version};
use mod_git::{RefKind, RemoteRef};
use semver::Version;

use crate::error::{Error, Result};

/// What a resolved reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Tag,
    Branch,
    /// A directory on disk, never fetched
    Local,
}

/// A version constraint bound to something that can be installed.
///
/// `version` is `None` only for branches and local paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// Full mod name
    pub name: String,
    pub version: Option<Version>,
    pub kind: ReferenceKind,
    /// Tag or branch name as advertised by the source
    pub ref_name: String,
    pub file_path: Option<PathBuf>,
}

impl ResolvedReference {
    pub fn tag(name: impl Into<String>, version: Version, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version),
            kind: ReferenceKind::Tag,
            ref_name: tag.into(),
            file_path: None,
        }
    }

    pub fn branch(name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            kind: ReferenceKind::Branch,
            ref_name: branch.into(),
            file_path: None,
        }
    }

    pub fn local(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            version: None,
            kind: ReferenceKind::Local,
            ref_name: path.display().to_string(),
            file_path: Some(path),
        }
    }

    /// Label of the install directory: the version, the branch, or `latest`.
    pub fn version_label(&self) -> String {
        match (&self.version, self.kind) {
            (Some(version), _) => version.to_string(),
            (None, ReferenceKind::Branch) => self.ref_name.clone(),
            (None, _) => LATEST.to_string(),
        }
    }

    /// The source reference to fetch, `None` for local paths.
    pub fn remote_ref(&self) -> Option<RemoteRef> {
        match self.kind {
            ReferenceKind::Tag => Some(RemoteRef::tag(&self.ref_name)),
            ReferenceKind::Branch => Some(RemoteRef::branch(&self.ref_name)),
            ReferenceKind::Local => None,
        }
    }

    /// Whether this reference is acceptable for `constraint`.
    pub fn satisfies(&self, constraint: &VersionConstraint) -> bool {
        match self.kind {
            ReferenceKind::Local => constraint.is_local(),
            ReferenceKind::Branch => constraint.branch.as_deref() == Some(self.ref_name.as_str()),
            ReferenceKind::Tag => self
                .version
                .as_ref()
                .is_some_and(|version| constraint.matches(version)),
        }
    }
}

impl fmt::Display for ResolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version_label())
    }
}

/// Pick the reference of `refs` that best satisfies `constraint`.
///
/// Tags are matched by semantic version and the highest match wins. Branch
/// constraints need a branch of exactly that name.
pub fn select_reference(
    constraint: &VersionConstraint,
    refs: &[RemoteRef],
) -> Result<ResolvedReference> {
    if let Some(branch) = &constraint.branch {
        return refs
            .iter()
            .find(|r| r.kind == RefKind::Branch && &r.name == branch)
            .map(|r| ResolvedReference::branch(&constraint.name, &r.name))
            .ok_or_else(|| Error::BranchNotFound {
                name: constraint.name.clone(),
                branch: branch.clone(),
            });
    }

    refs.iter()
        .filter(|r| r.kind == RefKind::Tag)
        .filter_map(|r| parse_tag_version(&r.name).map(|version| (version, r)))
        .filter(|(version, _)| constraint.matches(version))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(version, r)| ResolvedReference::tag(&constraint.name, version, &r.name))
        .ok_or_else(|| Error::VersionNotFound {
            name: constraint.name.clone(),
            constraint: constraint.version_string.clone(),
        })
}

/// Find the tag carrying exactly `version`.
pub fn find_tag(name: &str, version: &Version, refs: &[RemoteRef]) -> Option<ResolvedReference> {
    refs.iter()
        .filter(|r| r.kind == RefKind::Tag)
        .find(|r| parse_tag_version(&r.name).as_ref() == Some(version))
        .map(|r| ResolvedReference::tag(name, version.clone(), &r.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn refs() -> Vec<RemoteRef> {
        vec![
            RemoteRef::tag("v1.0.0"),
            RemoteRef::tag("v1.2.0"),
            RemoteRef::tag("v2.0.0"),
            RemoteRef::tag("not-a-version"),
            RemoteRef::branch("main"),
        ]
    }

    #[rstest]
    #[case("m@latest", "v2.0.0")]
    #[case("m@^1", "v1.2.0")]
    #[case("m@1.0", "v1.0.0")]
    #[case("m@<2.0.0", "v1.2.0")]
    fn test_highest_matching_tag(#[case] reference: &str, #[case] expected: &str) {
        let constraint = VersionConstraint::parse(reference).unwrap();
        let resolved = select_reference(&constraint, &refs()).unwrap();
        assert_eq!(resolved.kind, ReferenceKind::Tag);
        assert_eq!(resolved.ref_name, expected);
        assert!(resolved.satisfies(&constraint));
    }

    #[test]
    fn test_branch_constraint() {
        let constraint = VersionConstraint::parse("m@main").unwrap();
        let resolved = select_reference(&constraint, &refs()).unwrap();
        assert_eq!(resolved, ResolvedReference::branch("github.com/turbot/m", "main"));
        assert_eq!(resolved.version_label(), "main");
        assert_eq!(resolved.remote_ref(), Some(RemoteRef::branch("main")));
    }

    #[test]
    fn test_missing_version_and_branch() {
        let constraint = VersionConstraint::parse("m@3.0").unwrap();
        let err = select_reference(&constraint, &refs()).unwrap_err();
        assert!(matches!(err, Error::VersionNotFound { .. }));

        let constraint = VersionConstraint::parse("m@develop").unwrap();
        let err = select_reference(&constraint, &refs()).unwrap_err();
        assert_eq!(err.to_string(), "github.com/turbot/m has no branch 'develop'");
    }

    #[test]
    fn test_find_exact_tag() {
        let version = Version::new(1, 2, 0);
        let found = find_tag("m", &version, &refs()).unwrap();
        assert_eq!(found.ref_name, "v1.2.0");
        assert_eq!(found.to_string(), "m@1.2.0");
        assert!(find_tag("m", &Version::new(9, 0, 0), &refs()).is_none());
    }

    #[test]
    fn test_local_reference() {
        let local = ResolvedReference::local("m", "/tmp/m");
        assert_eq!(local.remote_ref(), None);
        assert_eq!(local.version_label(), "latest");
        assert!(local.satisfies(&VersionConstraint::parse("file:/tmp/m").unwrap()));
    }
}
