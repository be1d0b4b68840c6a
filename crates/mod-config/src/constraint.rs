//! Mod version constraints.
//!
//! A dependency on another mod is written as a reference string:
//!
//! - `name`, `org/name`, `host/org/name`: latest release
//! - `name@1.2`, `name@^1.0`, `name@>=1.0, <2.0`: a semantic-version range
//! - `name@main`: a branch (anything that is not a version range)
//! - `file:../local-mod`: a mod on the local filesystem
//!
//! # Examples
//!
//! ```
//! use mod_config::constraint::VersionConstraint;
//!
//! let c = VersionConstraint::parse("acme/net@^1.2").unwrap();
//! assert_eq!(c.name, "github.com/acme/net");
//! assert!(c.matches(&semver::Version::new(1, 4, 0)));
//! assert!(!c.matches(&semver::Version::new(2, 0, 0)));
//!
//! let c = VersionConstraint::parse("acme/net@develop").unwrap();
//! assert_eq!(c.branch.as_deref(), Some("develop"));
//! ```

use std::fmt;
use std::path::PathBuf;

use semver::{Version, VersionReq};

use crate::error::{Error, Result};
use crate::name::Location;

/// Prefix marking a local filesystem mod.
pub const FILE_PREFIX: &str = "file:";

/// Version string meaning "newest release".
pub const LATEST: &str = "latest";

/// How short mod names are expanded to full names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameConvention {
    pub host: String,
    pub org: String,
}

impl Default for NameConvention {
    fn default() -> Self {
        Self {
            host: mod_fs::config::DEFAULT_HOST.to_string(),
            org: mod_fs::config::DEFAULT_ORG.to_string(),
        }
    }
}

impl NameConvention {
    pub fn from_settings(settings: &mod_fs::Settings) -> Self {
        Self {
            host: settings.default_host.clone(),
            org: settings.default_org.clone(),
        }
    }

    /// Expand `name` or `org/name` to `host/org/name`.
    pub fn canonicalize(&self, name: &str) -> Result<String> {
        let invalid = |reason: &str| Error::ConstraintParse {
            input: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("empty mod name"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(invalid("mod names cannot contain whitespace"));
        }
        let segments: Vec<&str> = name.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("empty path segment"));
        }
        match segments.as_slice() {
            [short] => Ok(format!("{}/{}/{}", self.host, self.org, short)),
            [org, short] => Ok(format!("{}/{}/{}", self.host, org, short)),
            [_, _, _] => Ok(name.to_string()),
            _ => Err(invalid("expected 'name', 'org/name' or 'host/org/name'")),
        }
    }
}

/// A parsed dependency declaration.
///
/// Exactly one of `constraint`, `branch` and `file_path` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    /// Full mod name (`github.com/org/name`), or the raw path for local mods
    pub name: String,
    /// Version text as written, `latest` when absent
    pub version_string: String,
    pub constraint: Option<VersionReq>,
    pub branch: Option<String>,
    pub file_path: Option<PathBuf>,
    pub location: Option<Location>,
}

impl VersionConstraint {
    /// Parse a reference string using the default naming convention.
    pub fn parse(reference: &str) -> Result<Self> {
        Self::parse_with(reference, &NameConvention::default())
    }

    /// Parse a reference string (`name[@version]` or `file:path`).
    pub fn parse_with(reference: &str, naming: &NameConvention) -> Result<Self> {
        let reference = reference.trim();
        if reference.starts_with(FILE_PREFIX) {
            return Self::local(reference);
        }
        let (name, version) = match reference.rsplit_once('@') {
            Some((name, version)) => (name, version),
            None => (reference, LATEST),
        };
        Self::from_parts(name, version, naming)
    }

    /// Build a constraint from a name and a separate version string, as in a
    /// `require` block.
    pub fn from_parts(name: &str, version: &str, naming: &NameConvention) -> Result<Self> {
        if name.starts_with(FILE_PREFIX) {
            return Self::local(name);
        }
        let full_name = naming.canonicalize(name)?;
        let version = version.trim();
        let version_string = if version.is_empty() {
            LATEST.to_string()
        } else {
            version.to_string()
        };

        let (constraint, branch) = match parse_version_req(&version_string) {
            Some(req) => (Some(req), None),
            None if looks_like_range(&version_string) => {
                return Err(Error::ConstraintParse {
                    input: format!("{name}@{version_string}"),
                    reason: format!("invalid version range '{version_string}'"),
                });
            }
            None => (None, Some(version_string.clone())),
        };

        Ok(Self {
            name: full_name,
            version_string,
            constraint,
            branch,
            file_path: None,
            location: None,
        })
    }

    fn local(reference: &str) -> Result<Self> {
        let path = reference.trim_start_matches(FILE_PREFIX);
        if path.is_empty() {
            return Err(Error::ConstraintParse {
                input: reference.to_string(),
                reason: "empty file path".to_string(),
            });
        }
        Ok(Self {
            name: reference.to_string(),
            version_string: LATEST.to_string(),
            constraint: None,
            branch: None,
            file_path: Some(PathBuf::from(path)),
            location: None,
        })
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_local(&self) -> bool {
        self.file_path.is_some()
    }

    pub fn is_branch(&self) -> bool {
        self.branch.is_some()
    }

    /// Whether the constraint names a single release line rather than "any".
    pub fn is_explicit(&self) -> bool {
        self.constraint
            .as_ref()
            .is_some_and(|req| *req != VersionReq::STAR)
    }

    /// Check a concrete version against the range.
    ///
    /// Branch and local constraints never match a version.
    pub fn matches(&self, version: &Version) -> bool {
        self.constraint
            .as_ref()
            .is_some_and(|req| req.matches(version))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            return f.write_str(&self.name);
        }
        write!(f, "{}@{}", self.name, self.version_string)
    }
}

/// Parse a version range, accepting `latest`, a leading `v` and bare
/// versions (`1.2` means the `=1.2` release line).
pub fn parse_version_req(text: &str) -> Option<VersionReq> {
    let text = text.trim();
    if text.is_empty() || text == LATEST || text == "*" {
        return Some(VersionReq::STAR);
    }
    let text = strip_v_prefix(text);
    let candidate = if text.starts_with(|c: char| c.is_ascii_digit()) {
        format!("={text}")
    } else {
        text.to_string()
    };
    VersionReq::parse(&candidate).ok()
}

/// Parse a release tag such as `v1.2.0` or `1.2`.
pub fn parse_tag_version(tag: &str) -> Option<Version> {
    let text = strip_v_prefix(tag.trim());
    if let Ok(version) = Version::parse(text) {
        return Some(version);
    }
    Version::parse(&format!("{text}.0")).ok()
}

fn strip_v_prefix(text: &str) -> &str {
    match text.strip_prefix('v') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => text,
    }
}

fn looks_like_range(text: &str) -> bool {
    text.starts_with(['>', '<', '=', '^', '~']) || text.contains(',')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("net", "github.com/turbot/net")]
    #[case("acme/net", "github.com/acme/net")]
    #[case("gitlab.com/acme/net", "gitlab.com/acme/net")]
    fn test_canonicalize(#[case] input: &str, #[case] expected: &str) {
        let c = VersionConstraint::parse(input).unwrap();
        assert_eq!(c.name, expected);
        assert_eq!(c.version_string, "latest");
        assert_eq!(c.constraint, Some(VersionReq::STAR));
    }

    #[rstest]
    #[case("a/b/c/d")]
    #[case("a//b")]
    #[case("")]
    #[case("my mod")]
    #[case("net@>=abc")]
    fn test_malformed_rejected(#[case] input: &str) {
        let err = VersionConstraint::parse(input).unwrap_err();
        assert!(matches!(err, Error::ConstraintParse { .. }), "got {err:?}");
    }

    #[test]
    fn test_bare_version_is_release_line() {
        let c = VersionConstraint::parse("net@1.0").unwrap();
        assert!(c.is_explicit());
        assert!(c.matches(&Version::new(1, 0, 3)));
        assert!(!c.matches(&Version::new(1, 1, 0)));
        assert!(!c.matches(&Version::new(2, 0, 0)));
    }

    #[test]
    fn test_v_prefix_and_operators() {
        let c = VersionConstraint::parse("net@v1.2.0").unwrap();
        assert!(c.matches(&Version::new(1, 2, 0)));

        let c = VersionConstraint::parse("net@>=1.0, <2.0").unwrap();
        assert!(c.matches(&Version::new(1, 9, 0)));
        assert!(!c.matches(&Version::new(2, 0, 0)));
    }

    #[test]
    fn test_latest_is_unconstrained() {
        let c = VersionConstraint::parse("net@latest").unwrap();
        assert!(!c.is_explicit());
        assert!(c.matches(&Version::new(0, 0, 1)));
    }

    #[test]
    fn test_branch() {
        let c = VersionConstraint::parse("acme/net@feature-x").unwrap();
        assert_eq!(c.branch.as_deref(), Some("feature-x"));
        assert!(c.constraint.is_none());
        assert!(!c.matches(&Version::new(1, 0, 0)));
        assert_eq!(c.to_string(), "github.com/acme/net@feature-x");
    }

    #[test]
    fn test_file_path_ignores_version() {
        let c = VersionConstraint::parse("file:../local-mod").unwrap();
        assert!(c.is_local());
        assert_eq!(c.file_path, Some(PathBuf::from("../local-mod")));
        assert!(c.constraint.is_none());
        assert!(c.branch.is_none());
        assert_eq!(c.to_string(), "file:../local-mod");
    }

    #[test]
    fn test_split_on_last_at() {
        let c = VersionConstraint::parse("acme/net@2.0").unwrap();
        assert_eq!(c.name, "github.com/acme/net");
        assert_eq!(c.version_string, "2.0");
    }

    #[rstest]
    #[case("v1.2.3", Some(Version::new(1, 2, 3)))]
    #[case("1.2", Some(Version::new(1, 2, 0)))]
    #[case("main", None)]
    fn test_parse_tag_version(#[case] tag: &str, #[case] expected: Option<Version>) {
        assert_eq!(parse_tag_version(tag), expected);
    }
}
