//! Source distribution fetching.
//!
//! Downloads a package's sdist when the recorded version is absent,
//! stale, or the extracted source tree is missing from disk. Downloads
//! are streamed into a scoped temporary directory that is cleaned up on
//! every exit path; the permanent source tree is only populated after a
//! full, successful transfer.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use thiserror::Error;

use crate::archive::{self, ArchiveKind};
use crate::registry::{PackageInfo, Registry, ReleaseArtifact};
use crate::util::hash::sha256_file;

/// Errors from fetching one package's source. Callers catch these at
/// the package boundary: they fail the package, not the batch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to query registry for `{name}`")]
    Registry {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("registry metadata for `{name}` has no release entry for {version}")]
    MissingRelease { name: String, version: String },

    #[error("no source distribution published for {name} {version}")]
    NoSourceDist { name: String, version: String },

    #[error("registry filename contains a path separator: {filename}")]
    UnsafeFilename { filename: String },

    #[error("unknown source archive format: {filename}")]
    UnknownArchiveFormat { filename: String },

    #[error("sha256 mismatch for {filename}: expected {expected}, got {actual}")]
    DigestMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Derived key identifying one extracted source tree.
pub fn source_id(name: &str, version: &str) -> String {
    format!("{name}-{version}")
}

/// Fetches and extracts source distributions into the sources directory.
pub struct SourceFetcher<'a> {
    registry: &'a Registry,
    sources_dir: PathBuf,
}

impl<'a> SourceFetcher<'a> {
    pub fn new(registry: &'a Registry, sources_dir: impl Into<PathBuf>) -> Self {
        SourceFetcher {
            registry,
            sources_dir: sources_dir.into(),
        }
    }

    /// Fetch a package's source if we don't already have it on disk.
    ///
    /// Returns the package metadata as reported by the registry; the
    /// caller records `info.version` as the package's known version.
    pub fn fetch(
        &self,
        name: &str,
        known_version: Option<&str>,
    ) -> Result<PackageInfo, FetchError> {
        let info = self
            .registry
            .package_info(name)
            .map_err(|source| FetchError::Registry {
                name: name.to_string(),
                source,
            })?;
        let version = info.info.version.clone();

        let sourceid = source_id(name, &version);
        let source_dir = self.sources_dir.join(&sourceid);

        if is_up_to_date(known_version, &version, &source_dir) {
            tracing::debug!("{} is up to date", sourceid);
            return Ok(info);
        }

        tracing::info!("downloading {}", sourceid);

        let artifacts = info.current_artifacts();
        if artifacts.is_empty() && !info.releases.contains_key(&version) {
            return Err(FetchError::MissingRelease {
                name: name.to_string(),
                version,
            });
        }

        let sdist = select_sdist(name, &version, artifacts)?;

        validate_filename(&sdist.filename)?;
        let kind = ArchiveKind::from_filename(&sdist.filename).ok_or_else(|| {
            FetchError::UnknownArchiveFormat {
                filename: sdist.filename.clone(),
            }
        })?;

        // Scoped download directory, removed on every exit path.
        let download_dir = tempfile::Builder::new()
            .prefix("docbrowser-")
            .tempdir()
            .context("failed to create download directory")?;
        let archive_path = download_dir.path().join(&sdist.filename);

        let mut file = File::create(&archive_path)
            .with_context(|| format!("failed to create {}", archive_path.display()))?;
        self.registry.download(&sdist.url, &mut file)?;
        drop(file);

        verify_digest(&archive_path, sdist)?;

        archive::extract(kind, &archive_path, &source_dir)?;

        Ok(info)
    }
}

/// Decision rule for skipping the download: re-download only when the
/// version is new, changed, or the extracted tree was deleted out from
/// under us.
fn is_up_to_date(known_version: Option<&str>, fetched_version: &str, source_dir: &Path) -> bool {
    known_version == Some(fetched_version) && source_dir.exists()
}

/// Select the single sdist artifact for a release.
///
/// The registry's own list order is trusted for a deterministic choice;
/// multiple sdists get a warning but the first one is used.
fn select_sdist<'r>(
    name: &str,
    version: &str,
    artifacts: &'r [ReleaseArtifact],
) -> Result<&'r ReleaseArtifact, FetchError> {
    let sdists: Vec<&ReleaseArtifact> = artifacts.iter().filter(|a| a.is_sdist()).collect();

    match sdists.as_slice() {
        [] => Err(FetchError::NoSourceDist {
            name: name.to_string(),
            version: version.to_string(),
        }),
        [only] => Ok(only),
        [first, ..] => {
            tracing::warn!(
                "{} returned multiple source distributions, using the first one ({})",
                name,
                first.filename
            );
            Ok(first)
        }
    }
}

/// The registry is untrusted: a filename must never be able to change
/// the directory it is joined onto.
fn validate_filename(filename: &str) -> Result<(), FetchError> {
    if filename.contains('/') || filename.contains('\\') {
        return Err(FetchError::UnsafeFilename {
            filename: filename.to_string(),
        });
    }
    Ok(())
}

/// Check the downloaded archive against the registry's sha256 digest,
/// when the registry reports one.
fn verify_digest(archive_path: &Path, artifact: &ReleaseArtifact) -> Result<(), FetchError> {
    let Some(expected) = artifact.digests.sha256.as_deref() else {
        return Ok(());
    };

    let actual = sha256_file(archive_path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(FetchError::DigestMismatch {
            filename: artifact.filename.clone(),
            expected: expected.to_string(),
            actual,
        });
    }

    tracing::debug!("verified sha256 for {}", artifact.filename);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Digests;

    fn artifact(packagetype: &str, filename: &str) -> ReleaseArtifact {
        ReleaseArtifact {
            packagetype: packagetype.to_string(),
            filename: filename.to_string(),
            url: format!("https://example.invalid/{filename}"),
            digests: Digests::default(),
        }
    }

    #[test]
    fn test_source_id() {
        assert_eq!(source_id("foo", "1.2.0"), "foo-1.2.0");
    }

    #[test]
    fn test_up_to_date_decision_rule() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source_dir = tmp.path().join("foo-1.2.0");

        // Nothing recorded yet.
        assert!(!is_up_to_date(None, "1.2.0", &source_dir));
        // Version changed upstream.
        assert!(!is_up_to_date(Some("1.0.0"), "1.2.0", &source_dir));
        // Version matches but the tree was deleted out from under us.
        assert!(!is_up_to_date(Some("1.2.0"), "1.2.0", &source_dir));

        // Version matches and the tree is on disk: no download needed.
        std::fs::create_dir_all(&source_dir).unwrap();
        assert!(is_up_to_date(Some("1.2.0"), "1.2.0", &source_dir));
    }

    #[test]
    fn test_select_sdist_skips_wheels() {
        let artifacts = vec![
            artifact("bdist_wheel", "foo-1.0-py3-none-any.whl"),
            artifact("sdist", "foo-1.0.tar.gz"),
        ];

        let chosen = select_sdist("foo", "1.0", &artifacts).unwrap();
        assert_eq!(chosen.filename, "foo-1.0.tar.gz");
    }

    #[test]
    fn test_select_sdist_none() {
        let artifacts = vec![artifact("bdist_wheel", "foo-1.0-py3-none-any.whl")];

        let err = select_sdist("foo", "1.0", &artifacts).unwrap_err();
        assert!(matches!(err, FetchError::NoSourceDist { .. }));
    }

    #[test]
    fn test_select_sdist_multiple_uses_first() {
        let artifacts = vec![
            artifact("sdist", "foo-1.0.tar.gz"),
            artifact("sdist", "foo-1.0.zip"),
        ];

        let chosen = select_sdist("foo", "1.0", &artifacts).unwrap();
        assert_eq!(chosen.filename, "foo-1.0.tar.gz");
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("foo-1.0.tar.gz").is_ok());
        assert!(validate_filename("../foo-1.0.tar.gz").is_err());
        assert!(validate_filename("a\\b.tar.gz").is_err());
    }

    #[test]
    fn test_verify_digest() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("foo-1.0.tar.gz");
        std::fs::write(&path, "hello").unwrap();

        let mut sdist = artifact("sdist", "foo-1.0.tar.gz");

        // No digest reported: nothing to check.
        verify_digest(&path, &sdist).unwrap();

        sdist.digests.sha256 = Some(
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824".to_string(),
        );
        verify_digest(&path, &sdist).unwrap();

        sdist.digests.sha256 = Some("deadbeef".to_string());
        let err = verify_digest(&path, &sdist).unwrap_err();
        assert!(matches!(err, FetchError::DigestMismatch { .. }));
    }
}
