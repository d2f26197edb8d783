//! Pruning old version directories from the published tree.
//!
//! Disk-hungry HTML for superseded versions is deleted, but each
//! version's `objects.inv` is kept so other packages' intersphinx
//! references to it keep resolving. The newest version of each package
//! is left fully intact.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::publish::INVENTORY_MARKER;

/// Reduce every superseded version directory to its inventory file.
pub fn prune(www_dir: &Path) -> Result<()> {
    let entries = fs::read_dir(www_dir)
        .with_context(|| format!("failed to read directory: {}", www_dir.display()))?;

    for entry in entries {
        let entry = entry.context("failed to read directory entry")?;
        let path = entry.path();
        if path.is_dir() {
            prune_package(&path)?;
        }
    }

    Ok(())
}

/// Prune one package directory: keep the newest version whole, strip
/// all others down to `objects.inv`.
fn prune_package(package_dir: &Path) -> Result<()> {
    let mut versions: Vec<String> = Vec::new();
    for entry in fs::read_dir(package_dir)
        .with_context(|| format!("failed to read directory: {}", package_dir.display()))?
    {
        let entry = entry.context("failed to read directory entry")?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name != "latest" {
            versions.push(name);
        }
    }

    if !package_dir.join("latest").exists() {
        tracing::warn!("no `latest` in {}", package_dir.display());
    }

    let Some(newest) = versions
        .iter()
        .max_by_key(|v| parse_version_tuple(v))
        .cloned()
    else {
        return Ok(());
    };

    for version in versions {
        if version == newest {
            continue;
        }
        let dir = package_dir.join(&version);
        if strip_to_inventory(&dir)? {
            tracing::info!("pruned {}", dir.display());
        }
    }

    Ok(())
}

/// Delete everything in a version directory except the inventory file.
/// Returns whether anything was actually removed.
fn strip_to_inventory(version_dir: &Path) -> Result<bool> {
    let mut removed = false;

    for entry in fs::read_dir(version_dir)
        .with_context(|| format!("failed to read directory: {}", version_dir.display()))?
    {
        let entry = entry.context("failed to read directory entry")?;
        let path = entry.path();
        if entry.file_name() == INVENTORY_MARKER {
            continue;
        }

        if path.is_dir() {
            fs::remove_dir_all(&path)
                .with_context(|| format!("failed to remove directory: {}", path.display()))?;
        } else {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove: {}", path.display()))?;
        }
        removed = true;
    }

    Ok(removed)
}

/// Best-effort ordering key for version strings: the first three
/// dot-separated components as numbers, non-numeric components as zero.
/// Good enough to pick a newest version; not a full version ordering.
fn parse_version_tuple(version: &str) -> (u64, u64, u64) {
    let mut parts = version
        .split('.')
        .map(|p| p.parse::<u64>().unwrap_or(0));

    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populate(www: &Path, name: &str, version: &str, pages: &[&str]) {
        let dir = www.join(name).join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(INVENTORY_MARKER), "").unwrap();
        for page in pages {
            fs::write(dir.join(page), "<html>").unwrap();
        }
    }

    #[test]
    fn test_parse_version_tuple() {
        assert_eq!(parse_version_tuple("1.2.3"), (1, 2, 3));
        assert_eq!(parse_version_tuple("1.2"), (1, 2, 0));
        assert_eq!(parse_version_tuple("2"), (2, 0, 0));
        assert_eq!(parse_version_tuple("1.2.3.4"), (1, 2, 3));
        assert_eq!(parse_version_tuple("2.0.0b1"), (2, 0, 0));
        assert!(parse_version_tuple("1.10.0") > parse_version_tuple("1.9.9"));
    }

    #[test]
    fn test_prune_keeps_newest_whole() {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path(), "pkg", "1.0.0", &["index.html"]);
        populate(tmp.path(), "pkg", "1.2.0", &["index.html"]);
        populate(tmp.path(), "pkg", "2.0.0-beta", &["index.html", "api.html"]);
        crate::util::fs::symlink(Path::new("2.0.0-beta"), &tmp.path().join("pkg/latest")).unwrap();

        prune(tmp.path()).unwrap();

        // Newest survives fully, even with a non-numeric component.
        assert!(tmp.path().join("pkg/2.0.0-beta/index.html").exists());
        assert!(tmp.path().join("pkg/2.0.0-beta/api.html").exists());
        // Old versions keep only the inventory.
        for version in ["1.0.0", "1.2.0"] {
            let dir = tmp.path().join("pkg").join(version);
            assert!(dir.join(INVENTORY_MARKER).exists());
            assert!(!dir.join("index.html").exists());
        }
    }

    #[test]
    fn test_prune_already_pruned_is_noop() {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path(), "pkg", "1.0.0", &[]);
        populate(tmp.path(), "pkg", "2.0.0", &["index.html"]);
        crate::util::fs::symlink(Path::new("2.0.0"), &tmp.path().join("pkg/latest")).unwrap();

        prune(tmp.path()).unwrap();
        prune(tmp.path()).unwrap();

        assert!(tmp.path().join("pkg/1.0.0").join(INVENTORY_MARKER).exists());
        assert!(tmp.path().join("pkg/2.0.0/index.html").exists());
    }

    #[test]
    fn test_prune_removes_nested_directories() {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path(), "pkg", "1.0.0", &["index.html"]);
        fs::create_dir_all(tmp.path().join("pkg/1.0.0/fonts")).unwrap();
        populate(tmp.path(), "pkg", "2.0.0", &[]);
        crate::util::fs::symlink(Path::new("2.0.0"), &tmp.path().join("pkg/latest")).unwrap();

        prune(tmp.path()).unwrap();

        assert!(!tmp.path().join("pkg/1.0.0/fonts").exists());
        assert!(tmp.path().join("pkg/1.0.0").join(INVENTORY_MARKER).exists());
    }

    #[test]
    fn test_prune_missing_latest_still_prunes() {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path(), "pkg", "1.0.0", &["index.html"]);
        populate(tmp.path(), "pkg", "2.0.0", &["index.html"]);

        prune(tmp.path()).unwrap();

        assert!(!tmp.path().join("pkg/1.0.0/index.html").exists());
        assert!(tmp.path().join("pkg/2.0.0/index.html").exists());
    }

    #[test]
    fn test_prune_ignores_top_level_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("index.html"), "<html>").unwrap();
        fs::write(tmp.path().join("extra.css"), "body {}").unwrap();
        populate(tmp.path(), "pkg", "1.0.0", &["index.html"]);
        crate::util::fs::symlink(Path::new("1.0.0"), &tmp.path().join("pkg/latest")).unwrap();

        prune(tmp.path()).unwrap();

        assert!(tmp.path().join("index.html").exists());
        assert!(tmp.path().join("pkg/1.0.0/index.html").exists());
    }
}
