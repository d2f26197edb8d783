//! Safe extraction of source distribution archives.
//!
//! Source distributions conventionally wrap everything in a single
//! `project-version/` directory. Every member path is rewritten before
//! extraction by stripping that single leading component; a member name
//! with no separator maps to the extraction root itself (a directory
//! marker, not a file write). After rewriting, any path that would
//! escape the extraction root (`..` segments, absolute paths) is
//! rejected.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use zip::ZipArchive;

/// The two supported source archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Classify an artifact by its file extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.ends_with(".tar.gz") {
            Some(ArchiveKind::TarGz)
        } else if filename.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else {
            None
        }
    }
}

/// Extract an archive into `dest`, applying the path-rewrite contract.
pub fn extract(kind: ArchiveKind, archive_path: &Path, dest: &Path) -> Result<()> {
    match kind {
        ArchiveKind::TarGz => extract_tar_gz(archive_path, dest)
            .with_context(|| format!("failed to extract {}", archive_path.display())),
        ArchiveKind::Zip => extract_zip(archive_path, dest)
            .with_context(|| format!("failed to extract {}", archive_path.display())),
    }
}

/// Strip the single leading path component from a member name.
///
/// Returns `None` for names with no separator: those map to the
/// extraction root and carry no content of their own.
fn rewrite_member_path(name: &str) -> Option<&str> {
    let trimmed = name.trim_end_matches('/');
    match trimmed.split_once('/') {
        Some((_, rest)) if !rest.is_empty() => Some(rest),
        _ => None,
    }
}

/// Join a rewritten member path onto the extraction root, rejecting any
/// path that would land outside it.
fn sanitized_path(dest: &Path, rel: &str) -> Result<PathBuf> {
    let mut out = dest.to_path_buf();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                bail!("archive member escapes extraction directory: {rel}")
            }
        }
    }
    Ok(out)
}

/// A link target is safe when it is relative and free of `..`.
fn safe_link_target(target: &Path) -> bool {
    target
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open archive: {}", archive_path.display()))?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = Archive::new(decoder);

    fs::create_dir_all(dest)
        .with_context(|| format!("failed to create directory: {}", dest.display()))?;

    for entry in archive.entries().context("failed to read archive entries")? {
        let mut entry = entry.context("failed to read archive entry")?;
        let raw = entry
            .path()
            .context("failed to get entry path")?
            .to_string_lossy()
            .into_owned();

        let Some(rel) = rewrite_member_path(&raw) else {
            // The wrapper directory itself.
            continue;
        };
        let out = sanitized_path(dest, rel)?;

        let entry_type = entry.header().entry_type();
        match entry_type {
            tar::EntryType::Directory => {
                fs::create_dir_all(&out)
                    .with_context(|| format!("failed to create directory: {}", out.display()))?;
            }
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                if let Some(parent) = out.parent() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create directory: {}", parent.display())
                    })?;
                }
                entry
                    .unpack(&out)
                    .with_context(|| format!("failed to extract file: {}", out.display()))?;
            }
            tar::EntryType::Link => {
                let safe = matches!(
                    entry.link_name(),
                    Ok(Some(ref target)) if safe_link_target(target.as_ref())
                );
                if !safe {
                    tracing::debug!("skipping unsafe hard link target: {}", raw);
                    continue;
                }
                if let Some(parent) = out.parent() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create directory: {}", parent.display())
                    })?;
                }
                entry
                    .unpack(&out)
                    .with_context(|| format!("failed to extract file: {}", out.display()))?;
            }
            tar::EntryType::Symlink => {
                #[cfg(unix)]
                if let Ok(Some(target)) = entry.link_name() {
                    if !safe_link_target(target.as_ref()) {
                        tracing::debug!("skipping unsafe symlink target: {}", raw);
                        continue;
                    }
                    if let Some(parent) = out.parent() {
                        fs::create_dir_all(parent).with_context(|| {
                            format!("failed to create directory: {}", parent.display())
                        })?;
                    }
                    std::os::unix::fs::symlink(target.as_ref(), &out).with_context(|| {
                        format!("failed to create symlink: {}", out.display())
                    })?;
                }
                #[cfg(windows)]
                tracing::debug!("skipping symlink on Windows: {}", raw);
            }
            _ => {
                tracing::debug!("skipping unsupported entry type {:?}: {}", entry_type, raw);
            }
        }
    }

    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open archive: {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(file).context("failed to read zip archive")?;

    fs::create_dir_all(dest)
        .with_context(|| format!("failed to create directory: {}", dest.display()))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .context("failed to read zip entry")?;
        let raw = entry.name().to_string();

        let Some(rel) = rewrite_member_path(&raw) else {
            continue;
        };
        let out = sanitized_path(dest, rel)?;

        if entry.is_dir() {
            fs::create_dir_all(&out)
                .with_context(|| format!("failed to create directory: {}", out.display()))?;
        } else {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory: {}", parent.display()))?;
            }
            let mut file = File::create(&out)
                .with_context(|| format!("failed to create file: {}", out.display()))?;
            std::io::copy(&mut entry, &mut file)
                .with_context(|| format!("failed to extract file: {}", out.display()))?;
        }
    }

    Ok(())
}
