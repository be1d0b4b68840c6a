//! Installation tests against a local mirror of git repositories

use std::fs;

use mod_config::NameConvention;
use mod_fs::WorkspaceLayout;
use mod_git::GitSource;
use mod_install::{
    Error, InstallOptions, Installer, ReferenceKind, WorkspaceLock, read_root_definition,
};
use mod_test_utils::mods::{Mirror, mod_block};
use semver::Version;
use tempfile::TempDir;

const M1: &str = "github.com/turbot/m1";
const M2: &str = "github.com/turbot/m2";
const M3: &str = "github.com/turbot/m3";
const M4: &str = "github.com/turbot/m4";

/// m1 and m2 both require m3, with m2 needing at least 2.0.
fn diamond_mirror() -> Mirror {
    let mirror = Mirror::new();
    mirror.publish(M1, &[("v1.0.0", &mod_block("m1", &[(M3, ">=1.0")]))]);
    mirror.publish(M2, &[("v1.0.0", &mod_block("m2", &[(M3, ">=2.0")]))]);
    mirror.publish(
        M3,
        &[("v1.0.0", &mod_block("m3", &[])), ("v2.0.0", &mod_block("m3", &[]))],
    );
    mirror
}

fn workspace(root_text: &str) -> (TempDir, WorkspaceLayout) {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("mod.mp"), root_text).unwrap();
    let layout = WorkspaceLayout::new(temp.path()).unwrap();
    (temp, layout)
}

fn options() -> InstallOptions {
    InstallOptions {
        tool_version: Version::new(1, 0, 0),
        ..InstallOptions::default()
    }
}

fn install(
    layout: &WorkspaceLayout,
    mirror: &Mirror,
    options: InstallOptions,
) -> mod_install::Result<mod_install::InstallReport> {
    let source = GitSource::with_mirror(mirror.root());
    let naming = NameConvention::default();
    let root = read_root_definition(layout, &naming)?;
    Installer::new(layout, &source, naming, options).install_dependencies(&root)
}

mod diamond_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shared_dependency_installed_once_at_highest() {
        let mirror = diamond_mirror();
        let (_temp, layout) = workspace(&mod_block("root", &[(M1, "1.0"), (M2, "1.0")]));

        let report = install(&layout, &mirror, options()).unwrap();

        assert_eq!(report.dependencies.len(), 3);
        let m3 = &report.dependencies[M3];
        assert_eq!(m3.version, Some(Version::new(2, 0, 0)));
        assert_eq!(m3.kind, ReferenceKind::Tag);
        assert_eq!(m3.ref_name, "v2.0.0");
        assert!(layout.install_dir(M3, "2.0.0").is_dir());
        assert!(!layout.install_dir(M3, "1.0.0").exists());
        assert_eq!(report.fetched.len(), 3);
    }

    #[test]
    fn test_lock_records_every_requirer() {
        let mirror = diamond_mirror();
        let (_temp, layout) = workspace(&mod_block("root", &[(M1, "1.0"), (M2, "1.0")]));

        install(&layout, &mirror, options()).unwrap();

        let lock = WorkspaceLock::load(&layout).unwrap();
        assert_eq!(lock.len(), 4);
        assert_eq!(lock.get("root", M1).unwrap().version, Version::new(1, 0, 0));
        assert_eq!(lock.get("root", M1).unwrap().constraint, "1.0");
        assert_eq!(lock.get(M1, M3).unwrap().version, Version::new(2, 0, 0));
        assert_eq!(lock.get(M2, M3).unwrap().constraint, ">=2.0");
        assert_eq!(lock.versions_of(M3), vec![&Version::new(2, 0, 0)]);
    }

    #[test]
    fn test_second_install_fetches_nothing() {
        let mirror = diamond_mirror();
        let (_temp, layout) = workspace(&mod_block("root", &[(M1, "1.0"), (M2, "1.0")]));

        install(&layout, &mirror, options()).unwrap();
        let again = install(&layout, &mirror, options()).unwrap();

        assert!(again.fetched.is_empty());
        assert_eq!(again.dependencies[M3].version, Some(Version::new(2, 0, 0)));
    }
}

mod lock_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lock_mismatch_names_both_versions() {
        let mirror = diamond_mirror();
        let (temp, layout) = workspace(&mod_block("root", &[(M3, "1.0")]));
        install(&layout, &mirror, options()).unwrap();

        fs::write(temp.path().join("mod.mp"), mod_block("root", &[(M3, "2.0")])).unwrap();
        let err = install(&layout, &mirror, options()).unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("1 error installing dependencies:"), "{message}");
        assert!(message.contains("locked at 1.0.0"), "{message}");
        assert!(message.contains("requires '2.0'"), "{message}");
        assert!(message.contains("--update"), "{message}");
        match err {
            Error::Install { errors } => {
                assert!(matches!(errors[0], Error::LockMismatch { .. }));
            }
            other => panic!("expected install error, got {other:?}"),
        }
        // The failed requirement keeps its lock entry
        let lock = WorkspaceLock::load(&layout).unwrap();
        assert_eq!(lock.get("root", M3).unwrap().version, Version::new(1, 0, 0));
    }

    #[test]
    fn test_removed_dependency_dropped_from_lock() {
        let mirror = Mirror::new();
        mirror.publish(M1, &[("v1.0.0", &mod_block("m1", &[]))]);
        mirror.publish(
            M3,
            &[("v1.0.0", &mod_block("m3", &[])), ("v2.0.0", &mod_block("m3", &[]))],
        );
        let (temp, layout) = workspace(&mod_block("root", &[(M3, "1.0")]));
        install(&layout, &mirror, options()).unwrap();

        fs::write(temp.path().join("mod.mp"), mod_block("root", &[(M1, "1.0")])).unwrap();
        install(&layout, &mirror, options()).unwrap();

        let lock = WorkspaceLock::load(&layout).unwrap();
        assert_eq!(lock.len(), 1);
        assert!(lock.get("root", M3).is_none());

        // Re-adding it later is a fresh requirement, not a lock mismatch
        let requires = [(M1, "1.0"), (M3, "2.0")];
        fs::write(temp.path().join("mod.mp"), mod_block("root", &requires)).unwrap();
        let report = install(&layout, &mirror, options()).unwrap();
        assert_eq!(report.dependencies[M3].version, Some(Version::new(2, 0, 0)));
    }

    #[test]
    fn test_update_ignores_lock() {
        let mirror = diamond_mirror();
        let (temp, layout) = workspace(&mod_block("root", &[(M3, "1.0")]));
        install(&layout, &mirror, options()).unwrap();

        fs::write(temp.path().join("mod.mp"), mod_block("root", &[(M3, ">=1.0")]))
            .unwrap();
        let update = InstallOptions {
            update: true,
            ..options()
        };
        let report = install(&layout, &mirror, update).unwrap();

        assert_eq!(report.dependencies[M3].version, Some(Version::new(2, 0, 0)));
        let lock = WorkspaceLock::load(&layout).unwrap();
        assert_eq!(lock.get("root", M3).unwrap().version, Version::new(2, 0, 0));
    }

    #[test]
    fn test_locked_version_survives_newer_release() {
        let mirror = Mirror::new();
        let path = mirror.publish(M3, &[("v1.0.0", &mod_block("m3", &[]))]);
        let (_temp, layout) = workspace(&mod_block("root", &[(M3, "latest")]));
        install(&layout, &mirror, options()).unwrap();

        let repo = git2::Repository::open(&path).unwrap();
        mod_test_utils::git::commit_files(&repo, &[("extra.mp", "")], "release v1.1.0");
        mod_test_utils::git::tag_head(&repo, "v1.1.0");

        let report = install(&layout, &mirror, options()).unwrap();
        assert_eq!(report.dependencies[M3].version, Some(Version::new(1, 0, 0)));

        let update = InstallOptions {
            update: true,
            ..options()
        };
        let report = install(&layout, &mirror, update).unwrap();
        assert_eq!(report.dependencies[M3].version, Some(Version::new(1, 1, 0)));
    }
}

mod failure_tests {
    use super::*;

    #[test]
    fn test_failures_are_counted() {
        let mirror = diamond_mirror();
        let requires = [(M3, "5.0"), ("github.com/turbot/gone", "1.0"), (M1, "1.0")];
        let (_temp, layout) = workspace(&mod_block("root", &requires));

        let err = install(&layout, &mirror, options()).unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("2 errors installing dependencies:"), "{message}");
        assert!(
            message.contains("no version of github.com/turbot/m3 satisfies '5.0'"),
            "{message}"
        );
        // Healthy dependencies still install
        assert!(layout.install_dir(M1, "1.0.0").is_dir());
    }

    #[test]
    fn test_tool_version_checked_first() {
        let mirror = diamond_mirror();
        let (_temp, layout) = workspace(
            r#"
mod "root" {
  require {
    tool = ">=2.0.0"
    mod "github.com/turbot/m1" {
      version = "1.0"
    }
  }
}
"#,
        );

        let err = install(&layout, &mirror, options()).unwrap_err();

        assert!(matches!(err, Error::ToolVersion { .. }));
        assert!(err.to_string().contains("running 1.0.0"), "{err}");
        assert!(!layout.install_dir(M1, "1.0.0").exists());
    }

    #[test]
    fn test_missing_branch() {
        let mirror = diamond_mirror();
        let (_temp, layout) = workspace(&mod_block("root", &[(M1, "develop")]));

        let err = install(&layout, &mirror, options()).unwrap_err();

        assert!(err.to_string().contains("has no branch 'develop'"), "{err}");
    }
}

mod upgrade_tests {
    use super::*;
    use mod_test_utils::git::{commit_files, tag_head};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stricter_requirer_upgrades_locked_dependency() {
        let mirror = Mirror::new();
        mirror.publish(M1, &[("v1.0.0", &mod_block("m1", &[(M3, ">=1.0")]))]);
        mirror.publish(M2, &[("v1.0.0", &mod_block("m2", &[(M3, ">=2.0")]))]);
        mirror.publish(M4, &[("v1.0.0", &mod_block("m4", &[]))]);
        let m3 = mirror.publish(M3, &[("v1.0.0", &mod_block("m3", &[(M4, "1.0")]))]);
        let (temp, layout) = workspace(&mod_block("root", &[(M1, "1.0")]));
        install(&layout, &mirror, options()).unwrap();
        let lock = WorkspaceLock::load(&layout).unwrap();
        assert_eq!(lock.get(M1, M3).unwrap().version, Version::new(1, 0, 0));

        // m3 2.0.0 drops its requirement on m4
        let repo = git2::Repository::open(&m3).unwrap();
        commit_files(&repo, &[("mod.mp", mod_block("m3", &[]).as_str())], "release v2.0.0");
        tag_head(&repo, "v2.0.0");
        let requires = [(M1, "1.0"), (M2, "1.0")];
        fs::write(temp.path().join("mod.mp"), mod_block("root", &requires)).unwrap();

        let report = install(&layout, &mirror, options()).unwrap();

        assert_eq!(report.dependencies[M3].version, Some(Version::new(2, 0, 0)));
        assert!(layout.install_dir(M3, "2.0.0").is_dir());
        assert!(!report.dependencies.contains_key(M4));
        let lock = WorkspaceLock::load(&layout).unwrap();
        let entry = lock.get(M1, M3).unwrap();
        assert_eq!(entry.version, Version::new(2, 0, 0));
        assert_eq!(entry.constraint, ">=1.0");
        assert_eq!(lock.versions_of(M3), vec![&Version::new(2, 0, 0)]);
        assert!(lock.get(M3, M4).is_none());
    }

    #[test]
    fn test_conflicting_requirers_are_reported() {
        let mirror = Mirror::new();
        mirror.publish(M1, &[("v1.0.0", &mod_block("m1", &[(M3, "^1.0")]))]);
        mirror.publish(M2, &[("v1.0.0", &mod_block("m2", &[(M3, ">=2.0")]))]);
        mirror.publish(
            M3,
            &[("v1.0.0", &mod_block("m3", &[])), ("v2.0.0", &mod_block("m3", &[]))],
        );
        let (_temp, layout) = workspace(&mod_block("root", &[(M1, "1.0"), (M2, "1.0")]));

        let err = install(&layout, &mirror, options()).unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("1 error installing dependencies:"), "{message}");
        assert!(message.contains("github.com/turbot/m3@1.0.0 is installed"), "{message}");
        assert!(message.contains("github.com/turbot/m2 requires '>=2.0'"), "{message}");
        match err {
            Error::Install { errors } => {
                assert_eq!(errors.len(), 1);
                let incompatible = matches!(
                    &errors[0],
                    Error::IncompatibleVersion { name, .. } if name == M3
                );
                assert!(incompatible, "{:?}", errors[0]);
            }
            other => panic!("expected install error, got {other:?}"),
        }
        let lock = WorkspaceLock::load(&layout).unwrap();
        assert_eq!(lock.get(M1, M3).unwrap().version, Version::new(1, 0, 0));
        assert!(lock.get(M2, M3).is_none());
        assert!(!layout.install_dir(M3, "2.0.0").exists());
    }
}

mod local_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use mod_test_utils::mods::write_mod_dir;

    #[test]
    fn test_local_dependency_is_used_in_place() {
        let mirror = diamond_mirror();
        let (temp, layout) = workspace(&mod_block("root", &[("file:./vendor/lib", "")]));
        write_mod_dir(&temp.path().join("vendor/lib"), &mod_block("lib", &[(M3, "1.0")]), &[]);

        let report = install(&layout, &mirror, options()).unwrap();

        let lib = &report.dependencies["file:./vendor/lib"];
        assert_eq!(lib.kind, ReferenceKind::Local);
        assert_eq!(report.dependencies[M3].version, Some(Version::new(1, 0, 0)));
        // Local paths are never locked, their requirements are
        let lock = WorkspaceLock::load(&layout).unwrap();
        assert!(lock.get("root", "file:./vendor/lib").is_none());
        assert!(lock.get("file:./vendor/lib", M3).is_some());
    }

    #[test]
    fn test_missing_local_path() {
        let mirror = diamond_mirror();
        let (_temp, layout) = workspace(&mod_block("root", &[("file:./nowhere", "")]));

        let err = install(&layout, &mirror, options()).unwrap_err();

        assert!(err.to_string().contains("local mod file:./nowhere not found"), "{err}");
    }
}
