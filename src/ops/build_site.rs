//! The full site build pipeline: fetch, build, publish, render.

use std::collections::HashMap;

use anyhow::Result;

use crate::build::{run_batch, BuildRunner};
use crate::config::{PackageSpec, RunConfig};
use crate::fetch::SourceFetcher;
use crate::registry::{Registry, ReleaseInfo};
use crate::render::{self, IndexEntry};
use crate::publish;
use crate::util;
use crate::versions::VersionStore;

/// How a site build ended, as reported through the process exit code.
///
/// `Truncated` and `BuildFailed` are conditions a supervising scheduler
/// can distinguish from configuration errors (which exit 1 with an
/// error report instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCondition {
    /// Everything that could be built was built.
    Success,

    /// The wall-clock budget ran out with packages left unbuilt.
    Truncated,

    /// At least one package's build failed, in verbose mode.
    BuildFailed,
}

impl ExitCondition {
    pub fn code(self) -> i32 {
        match self {
            ExitCondition::Success => 0,
            ExitCondition::Truncated => 21,
            ExitCondition::BuildFailed => 24,
        }
    }
}

/// Build the whole site for the given package batch.
///
/// Ad-hoc batches (`--package` mode) skip the cross-package intersphinx
/// wiring, since the named packages aren't part of the published site.
///
/// Per-package fetch and build failures are contained: they are logged,
/// the package keeps its previously published docs, and the rest of the
/// batch proceeds. Only configuration problems (an unreadable README or
/// package list, a broken build directory) fail the run outright.
pub fn build_site(
    config: &RunConfig,
    specs: &[PackageSpec],
    adhoc: bool,
) -> Result<ExitCondition> {
    // Validate the README before any network traffic: a missing package
    // list marker should not cost a two-hour build to discover.
    let readme = render::load_readme(&config.readme_file)?;

    util::fs::ensure_dir(&config.sources_dir())?;

    let store = VersionStore::new(config.versions_path());
    let mut versions = store.load()?;

    let registry = Registry::new()?;
    let fetcher = SourceFetcher::new(&registry, config.sources_dir());

    // Fetch phase. Release metadata is collected for the start page;
    // packages whose fetch fails keep their recorded version and stay
    // on their previously published docs.
    let mut infos: HashMap<String, ReleaseInfo> = HashMap::new();
    for spec in specs {
        match fetcher.fetch(&spec.name, versions.get(&spec.name).map(String::as_str)) {
            Ok(info) => {
                versions.insert(spec.name.clone(), info.info.version.clone());
                infos.insert(spec.name.clone(), info.info);
            }
            Err(err) => {
                tracing::error!("failed to fetch {}: {:#}", spec.name, anyhow::Error::from(err));
            }
        }
    }

    store.save(&versions)?;

    let www_dir = config.www_dir();
    util::fs::ensure_dir(&www_dir)?;

    let extra_args: Vec<String> = if adhoc {
        Vec::new()
    } else {
        specs
            .iter()
            .map(|spec| format!("--intersphinx={}", config.inventory_url(&spec.name)))
            .collect()
    };

    let runner = BuildRunner::new(config);
    let batch = run_batch(&runner, specs, &versions, &extra_args)?;

    publish::reconcile_latest(&www_dir, &versions, specs, batch.truncated)?;

    let entries: Vec<IndexEntry> = specs
        .iter()
        .filter_map(|spec| {
            let version = versions.get(&spec.name)?;
            let info = infos.get(&spec.name);
            Some(IndexEntry {
                name: spec.name.clone(),
                version: version.clone(),
                summary: info.and_then(|i| i.summary.clone()),
                project_url: info.and_then(|i| i.package_url.clone()),
            })
        })
        .collect();
    render::render_index(&www_dir, &readme, &entries)?;

    if batch.truncated {
        Ok(ExitCondition::Truncated)
    } else if batch.any_failed() && config.verbose {
        Ok(ExitCondition::BuildFailed)
    } else {
        Ok(ExitCondition::Success)
    }
}
