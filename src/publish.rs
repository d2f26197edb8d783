//! Publishing: pointing each package's `latest` at its newest docs.
//!
//! `latest` is a relative symlink to the version directory next to it,
//! so the published tree can be copied or served from any root. Hosting
//! pipelines that materialize symlinks turn a previous run's `latest`
//! into a real directory; reconciliation handles both shapes when
//! replacing it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::PackageSpec;
use crate::util;

/// File whose presence marks a version directory as completely built.
/// The generator writes it last, and pruning preserves it.
pub const INVENTORY_MARKER: &str = "objects.inv";

/// Repoint `latest` for every package with a recorded version.
///
/// A recorded version whose directory lacks the inventory marker is an
/// incomplete build: its `latest` is left untouched so the site keeps
/// serving the previous docs. The warning for that case is suppressed
/// when the batch was truncated, since unbuilt tails are expected then.
pub fn reconcile_latest(
    www_dir: &Path,
    versions: &BTreeMap<String, String>,
    specs: &[PackageSpec],
    truncated: bool,
) -> Result<()> {
    for spec in specs {
        let Some(version) = versions.get(&spec.name) else {
            continue;
        };

        let version_dir = www_dir.join(&spec.name).join(version);
        if !version_dir.join(INVENTORY_MARKER).exists() {
            if !truncated {
                tracing::warn!(
                    "{} {} has no complete docs, leaving `latest` alone",
                    spec.name,
                    version
                );
            }
            continue;
        }

        let latest = www_dir.join(&spec.name).join("latest");
        remove_existing(&latest)?;

        util::fs::symlink(Path::new(version), &latest)
            .with_context(|| format!("failed to create symlink: {}", latest.display()))?;
        tracing::debug!("{}/latest -> {}", spec.name, version);
    }

    Ok(())
}

/// Remove whatever currently occupies the `latest` path, if anything.
fn remove_existing(latest: &Path) -> Result<()> {
    let Ok(meta) = fs::symlink_metadata(latest) else {
        return Ok(());
    };

    if meta.is_dir() {
        // A materialized copy from a symlink-unaware deployment.
        fs::remove_dir_all(latest)
            .with_context(|| format!("failed to remove directory: {}", latest.display()))
    } else {
        fs::remove_file(latest)
            .with_context(|| format!("failed to remove: {}", latest.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn built_version(www: &Path, name: &str, version: &str) {
        let dir = www.join(name).join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(INVENTORY_MARKER), "").unwrap();
    }

    fn versions_of(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_creates_relative_symlink() {
        let tmp = TempDir::new().unwrap();
        built_version(tmp.path(), "foo", "1.0.0");

        let versions = versions_of(&[("foo", "1.0.0")]);
        reconcile_latest(tmp.path(), &versions, &[PackageSpec::new("foo")], false).unwrap();

        let latest = tmp.path().join("foo/latest");
        let target = fs::read_link(&latest).unwrap();
        assert_eq!(target, Path::new("1.0.0"));
        assert!(latest.join(INVENTORY_MARKER).exists());
    }

    #[test]
    fn test_replaces_existing_symlink() {
        let tmp = TempDir::new().unwrap();
        built_version(tmp.path(), "foo", "1.0.0");
        built_version(tmp.path(), "foo", "2.0.0");

        let latest = tmp.path().join("foo/latest");
        util::fs::symlink(Path::new("1.0.0"), &latest).unwrap();

        let versions = versions_of(&[("foo", "2.0.0")]);
        reconcile_latest(tmp.path(), &versions, &[PackageSpec::new("foo")], false).unwrap();

        assert_eq!(fs::read_link(&latest).unwrap(), Path::new("2.0.0"));
    }

    #[test]
    fn test_replaces_materialized_directory() {
        let tmp = TempDir::new().unwrap();
        built_version(tmp.path(), "foo", "2.0.0");
        // A real directory where the symlink should be.
        built_version(tmp.path(), "foo", "latest");

        let versions = versions_of(&[("foo", "2.0.0")]);
        reconcile_latest(tmp.path(), &versions, &[PackageSpec::new("foo")], false).unwrap();

        let latest = tmp.path().join("foo/latest");
        assert_eq!(fs::read_link(&latest).unwrap(), Path::new("2.0.0"));
    }

    #[test]
    fn test_incomplete_build_leaves_latest_alone() {
        let tmp = TempDir::new().unwrap();
        built_version(tmp.path(), "foo", "1.0.0");
        // 2.0.0 exists but never finished: no inventory marker.
        fs::create_dir_all(tmp.path().join("foo/2.0.0")).unwrap();

        let latest = tmp.path().join("foo/latest");
        util::fs::symlink(Path::new("1.0.0"), &latest).unwrap();

        let versions = versions_of(&[("foo", "2.0.0")]);
        reconcile_latest(tmp.path(), &versions, &[PackageSpec::new("foo")], false).unwrap();

        assert_eq!(fs::read_link(&latest).unwrap(), Path::new("1.0.0"));
    }

    #[test]
    fn test_unrecorded_package_skipped() {
        let tmp = TempDir::new().unwrap();
        built_version(tmp.path(), "foo", "1.0.0");

        let versions = BTreeMap::new();
        reconcile_latest(tmp.path(), &versions, &[PackageSpec::new("foo")], false).unwrap();

        assert!(!tmp.path().join("foo/latest").exists());
    }
}
