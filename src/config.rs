//! Run configuration and the declarative package list.
//!
//! Everything that used to be tweakable only by editing constants lives in
//! an explicit [`RunConfig`] constructed once at process start and threaded
//! through every component - no ambient globals.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::util;

/// Default configuration file with the curated package list.
pub const DEFAULT_CONFIG_FILE: &str = "packages.toml";

/// Default README rendered into the start page.
pub const DEFAULT_README_FILE: &str = "README.md";

/// Default build directory holding sources, version state and output.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Default batch build budget, in minutes.
pub const DEFAULT_BUILD_TIMEOUT_MINUTES: u64 = 120;

/// Default base URL of the published site, used for cross-package
/// inventory links.
pub const DEFAULT_SITE_URL: &str = "https://docbrowser.github.io";

/// Documentation format passed to the generator when a package
/// configures none.
pub const DEFAULT_DOCFORMAT: &str = "plaintext";

const SOURCES_DIR: &str = "sources";
const VERSIONS_FILE: &str = "versions.json";
const WWW_DIR: &str = "www";

/// Configuration for one run of the build pipeline.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Build directory (sources, version state, published tree)
    pub build_dir: PathBuf,

    /// README file for the start page
    pub readme_file: PathBuf,

    /// Wall-clock budget for the whole build phase
    pub build_timeout: Duration,

    /// Base URL of the published site (cross-package inventory links)
    pub site_url: String,

    /// Base URL for "view source" links in generated pages, if any
    pub viewsource_base: Option<String>,

    /// Explicit path to the pydoctor executable (otherwise found in PATH)
    pub generator: Option<PathBuf>,

    /// Verbose/strict mode: print generator output, escalate generator
    /// failures to the process exit code
    pub verbose: bool,
}

impl RunConfig {
    /// Directory with extracted source trees, one per `<name>-<version>`.
    pub fn sources_dir(&self) -> PathBuf {
        self.build_dir.join(SOURCES_DIR)
    }

    /// Path to the persisted name -> version mapping.
    pub fn versions_path(&self) -> PathBuf {
        self.build_dir.join(VERSIONS_FILE)
    }

    /// Published output tree.
    pub fn www_dir(&self) -> PathBuf {
        self.build_dir.join(WWW_DIR)
    }

    /// URL of a package's published inventory, for intersphinx linking.
    pub fn inventory_url(&self, package: &str) -> String {
        format!("{}/{}/latest/objects.inv", self.site_url.trim_end_matches('/'), package)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            readme_file: PathBuf::from(DEFAULT_README_FILE),
            build_timeout: Duration::from_secs(DEFAULT_BUILD_TIMEOUT_MINUTES * 60),
            site_url: DEFAULT_SITE_URL.to_string(),
            viewsource_base: None,
            generator: None,
            verbose: false,
        }
    }
}

/// One package to document, from the declarative configuration list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// PyPI package name (lower-cased for filesystem lookups)
    pub name: String,

    /// Extra arguments passed through to the generator
    pub pydoctor_args: Vec<String>,
}

impl PackageSpec {
    /// Create a spec with the default docformat and no extra arguments.
    pub fn new(name: impl Into<String>) -> Self {
        let mut spec = PackageSpec {
            name: name.into(),
            pydoctor_args: Vec::new(),
        };
        spec.apply_default_docformat(None);
        spec
    }

    /// Create an ad-hoc spec for `--package` mode. Uses the plaintext
    /// markup and disables the sidebar for speed.
    pub fn adhoc(name: impl Into<String>) -> Self {
        PackageSpec {
            name: name.into(),
            pydoctor_args: vec![
                format!("--docformat={DEFAULT_DOCFORMAT}"),
                "--no-sidebar".to_string(),
            ],
        }
    }

    /// Append a `--docformat` argument unless one is already configured.
    fn apply_default_docformat(&mut self, docformat: Option<&str>) {
        if !self.pydoctor_args.iter().any(|a| a.contains("--docformat")) {
            self.pydoctor_args
                .push(format!("--docformat={}", docformat.unwrap_or(DEFAULT_DOCFORMAT)));
        }
    }
}

/// Load the package list from a TOML configuration file.
///
/// The file is a table of package name to an (optional) table with
/// `pydoctor_args` and `docformat` keys. Entry order is preserved: it is
/// the build order of the batch. A missing or unparsable file is fatal to
/// the whole run.
pub fn load_package_specs(path: &Path) -> Result<Vec<PackageSpec>> {
    let text = util::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&text)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    let mut specs = Vec::with_capacity(table.len());

    for (name, value) in table {
        let mut args = Vec::new();
        let mut docformat = None;

        match value {
            toml::Value::Table(entry) => {
                if let Some(raw) = entry.get("pydoctor_args") {
                    let list = raw.as_array().with_context(|| {
                        format!("`{name}.pydoctor_args` must be an array of strings")
                    })?;
                    for item in list {
                        let arg = item.as_str().with_context(|| {
                            format!("`{name}.pydoctor_args` must be an array of strings")
                        })?;
                        args.push(arg.to_string());
                    }
                }
                if let Some(raw) = entry.get("docformat") {
                    docformat = Some(
                        raw.as_str()
                            .with_context(|| format!("`{name}.docformat` must be a string"))?
                            .to_string(),
                    );
                }
            }
            other => bail!(
                "config entry `{name}` must be a table, found {}",
                other.type_str()
            ),
        }

        let mut spec = PackageSpec {
            name,
            pydoctor_args: args,
        };
        spec.apply_default_docformat(docformat.as_deref());
        specs.push(spec);
    }

    Ok(specs)
}

/// Build ad-hoc specs from `--package` flags, preserving order.
pub fn adhoc_specs(names: &[String]) -> Vec<PackageSpec> {
    names.iter().map(PackageSpec::adhoc).collect()
}
