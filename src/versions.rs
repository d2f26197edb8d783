//! Persisted record of the last-built version per package.
//!
//! The version file is the sole durable state between runs. A version
//! recorded here means the matching source directory *may* exist on disk;
//! disk state can be deleted independently, so it is re-checked every run.
//!
//! Single-writer contract: nothing locks this file. Exactly one run is
//! assumed to touch the build directory at a time.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Load/save access to the name -> version mapping.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        VersionStore { path: path.into() }
    }

    /// Load the persisted mapping. A missing file is an empty mapping,
    /// never an error.
    pub fn load(&self) -> Result<BTreeMap<String, String>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read version file: {}", self.path.display())
                })
            }
        };

        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse version file: {}", self.path.display()))
    }

    /// Overwrite the persisted file wholesale. Callers pass the full,
    /// updated mapping - this is not a merge.
    pub fn save(&self, versions: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory: {}", parent.display())
            })?;
        }

        let text = serde_json::to_string(versions)
            .context("failed to serialize version mapping")?;

        std::fs::write(&self.path, text)
            .with_context(|| format!("failed to write version file: {}", self.path.display()))
    }
}
