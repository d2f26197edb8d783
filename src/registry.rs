//! PyPI metadata client.
//!
//! The registry is consumed through a single endpoint,
//! `GET /pypi/<name>/json`, and treated as untrusted: release filenames
//! are validated before they touch the local filesystem (see
//! [`crate::fetch`]).

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Base URL of the default package index.
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";

const USER_AGENT: &str = concat!("docbrowser/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The parts of the registry's JSON response that we consume.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageInfo {
    pub info: ReleaseInfo,
    #[serde(default)]
    pub releases: HashMap<String, Vec<ReleaseArtifact>>,
}

impl PackageInfo {
    /// Artifacts published for the current version, in the registry's
    /// own (trusted, stable) order.
    pub fn current_artifacts(&self) -> &[ReleaseArtifact] {
        self.releases
            .get(&self.info.version)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The parts of the current release's metadata that reach the start
/// page.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    pub version: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub package_url: Option<String>,
}

/// One downloadable artifact within a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseArtifact {
    pub packagetype: String,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub digests: Digests,
}

impl ReleaseArtifact {
    /// Whether this artifact is a source distribution.
    pub fn is_sdist(&self) -> bool {
        self.packagetype == "sdist"
    }
}

/// Artifact checksums reported by the registry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Digests {
    #[serde(default)]
    pub sha256: Option<String>,
}

/// Blocking client for the package index.
pub struct Registry {
    client: reqwest::blocking::Client,
    index_url: String,
}

impl Registry {
    /// Create a client against the default index.
    pub fn new() -> Result<Self> {
        Self::with_index_url(DEFAULT_INDEX_URL)
    }

    /// Create a client against a specific index URL.
    pub fn with_index_url(index_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Registry {
            client,
            index_url: index_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the package's metadata from the index.
    pub fn package_info(&self, name: &str) -> Result<PackageInfo> {
        let url = format!("{}/pypi/{}/json", self.index_url, name);

        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("failed to query {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("{url} returned HTTP {}", response.status()));
        }

        response
            .json()
            .with_context(|| format!("unexpected metadata shape from {url}"))
    }

    /// Download an artifact, streaming the body into `writer`.
    pub fn download(&self, url: &str, writer: &mut impl std::io::Write) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("failed to download {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("{url} returned HTTP {}", response.status()));
        }

        response
            .copy_to(writer)
            .with_context(|| format!("failed to read response body from {url}"))
    }
}
