//! Running the documentation generator.
//!
//! Each package+version is built at most once across the lifetime of
//! the persisted output tree: an existing output directory means the
//! docs were (or were being) generated by a prior run and the package
//! is skipped. The whole batch runs under a single wall-clock budget;
//! when it is exhausted the remaining packages are abandoned and the
//! run reports truncation instead of failure.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::config::{PackageSpec, RunConfig};
use crate::fetch::source_id;
use crate::locate;
use crate::util::ProcessBuilder;

/// Name of the external documentation generator.
pub const GENERATOR: &str = "pydoctor";

/// Inventory of the Python standard library, linked from every build.
const STDLIB_INVENTORY: &str = "https://docs.python.org/3/objects.inv";

const EXTRA_CSS: &str = include_str!("../templates/extra.css");
const HEADER_HTML: &str = include_str!("../templates/header.html");
const HEADER_SOURCEID_SLOT: &str = "<!-- sourceid -->";

/// Result of attempting to build one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Fresh docs were generated.
    Built { warnings: usize },

    /// The output directory already existed from a prior run.
    Skipped,

    /// The build could not run or the generator reported an error.
    Failed(FailReason),
}

impl BuildOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, BuildOutcome::Failed(_))
    }
}

/// Why a package build failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    /// The extracted source tree is missing from disk.
    MissingSource,

    /// The locator produced zero candidate package directories.
    NoPackageFound,

    /// The generator exited with a nonzero status.
    Generator { status: Option<i32> },
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::MissingSource => write!(f, "missing source code"),
            FailReason::NoPackageFound => write!(f, "failed to determine package directory"),
            FailReason::Generator { status: Some(code) } => {
                write!(f, "{GENERATOR} exited with status {code}")
            }
            FailReason::Generator { status: None } => {
                write!(f, "{GENERATOR} terminated by signal")
            }
        }
    }
}

/// Outcome of the whole build phase.
#[derive(Debug)]
pub struct BatchResult {
    /// Per-package outcomes, in batch order, for the packages that were
    /// attempted before the budget ran out.
    pub outcomes: Vec<(String, BuildOutcome)>,

    /// Whether the budget truncated the batch.
    pub truncated: bool,
}

impl BatchResult {
    pub fn any_failed(&self) -> bool {
        self.outcomes.iter().any(|(_, o)| o.is_failure())
    }
}

/// Invokes the generator for one package at a time.
pub struct BuildRunner<'a> {
    config: &'a RunConfig,
    started: Instant,
}

impl<'a> BuildRunner<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        BuildRunner {
            config,
            started: Instant::now(),
        }
    }

    /// Whether the batch budget is spent.
    pub fn budget_exhausted(&self) -> bool {
        self.started.elapsed() > self.config.build_timeout
    }

    fn generator_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.config.generator {
            return Ok(path.clone());
        }
        crate::util::process::find_executable(GENERATOR)
            .ok_or_else(|| anyhow::anyhow!("`{GENERATOR}` not found in PATH"))
    }

    /// Build the docs for one package version.
    pub fn run_one(
        &self,
        spec: &PackageSpec,
        version: &str,
        extra_args: &[String],
    ) -> Result<BuildOutcome> {
        let sourceid = source_id(&spec.name, version);
        let source_root = self.config.sources_dir().join(&sourceid);

        if !source_root.exists() {
            tracing::warn!("missing source code for {}", sourceid);
            return Ok(BuildOutcome::Failed(FailReason::MissingSource));
        }

        let out_dir = self.config.www_dir().join(&spec.name).join(version);
        if out_dir.exists() {
            tracing::info!("already built docs for {}", sourceid);
            return Ok(BuildOutcome::Skipped);
        }

        let candidates = locate::locate(&source_root, &spec.name);
        let Some(package_path) = candidates.first() else {
            tracing::warn!(
                "failed to determine package directory for {}",
                source_root.display()
            );
            return Ok(BuildOutcome::Failed(FailReason::NoPackageFound));
        };
        if candidates.len() > 1 {
            tracing::warn!(
                "found multiple packages for {} ({:?}), using the first one",
                spec.name,
                candidates
            );
        }

        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("failed to create directory: {}", out_dir.display()))?;

        // Scoped template override directory, removed on every exit path.
        let templates = TemplateOverrides::new(&sourceid)?;

        let mut builder = ProcessBuilder::new(self.generator_path()?)
            .args(extra_args)
            .args(&spec.pydoctor_args)
            .arg(format!("--html-output={}", out_dir.display()))
            .arg(format!("--template-dir={}", templates.path().display()))
            .arg(format!("--project-base-dir={}", source_root.display()));

        if let Some(ref base) = self.config.viewsource_base {
            builder = builder.arg(format!(
                "--html-viewsource-base={}/{}/",
                base.trim_end_matches('/'),
                sourceid
            ));
        }

        let builder = builder
            .arg(format!("--intersphinx={STDLIB_INVENTORY}"))
            .arg("--quiet")
            .arg(package_path);

        tracing::info!("running '{} [...] {}'", GENERATOR, package_path.display());

        let output = builder.exec()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let warnings = stdout.lines().count() + stderr.lines().count();

        tracing::info!("{}: {} warnings", sourceid, warnings);
        if self.config.verbose && warnings > 0 {
            print!("{stdout}");
            eprint!("{stderr}");
        }

        if !output.status.success() {
            return Ok(BuildOutcome::Failed(FailReason::Generator {
                status: output.status.code(),
            }));
        }

        Ok(BuildOutcome::Built { warnings })
    }
}

/// Run the build phase over the whole batch, in configured order.
///
/// The budget is checked after each package except the last remaining
/// one; already-produced outcomes are kept when the batch is abandoned.
/// Packages with no recorded version (their fetch failed and they were
/// never built before) are skipped.
pub fn run_batch(
    runner: &BuildRunner<'_>,
    specs: &[PackageSpec],
    versions: &BTreeMap<String, String>,
    extra_args: &[String],
) -> Result<BatchResult> {
    let mut outcomes = Vec::with_capacity(specs.len());
    let mut truncated = false;

    for (index, spec) in specs.iter().enumerate() {
        let Some(version) = versions.get(&spec.name) else {
            tracing::warn!("no known version for {}, skipping build", spec.name);
            continue;
        };

        let outcome = runner.run_one(spec, version, extra_args)?;
        if let BuildOutcome::Failed(ref reason) = outcome {
            tracing::warn!("{}: {}", spec.name, reason);
        }
        outcomes.push((spec.name.clone(), outcome));

        if runner.budget_exhausted() && index + 1 < specs.len() {
            tracing::warn!("could not finish building all docs within the required time");
            truncated = true;
            break;
        }
    }

    Ok(BatchResult {
        outcomes,
        truncated,
    })
}

/// Scoped directory with the generator template overrides for one
/// source tree: the site stylesheet and a header naming the source id.
struct TemplateOverrides {
    dir: TempDir,
}

impl TemplateOverrides {
    fn new(sourceid: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("docbrowser-")
            .tempdir()
            .context("failed to create template directory")?;

        std::fs::write(dir.path().join("extra.css"), EXTRA_CSS)
            .context("failed to write template override")?;
        std::fs::write(
            dir.path().join("header.html"),
            HEADER_HTML.replace(HEADER_SOURCEID_SLOT, &format!("&gt; {sourceid}")),
        )
        .context("failed to write template override")?;

        Ok(TemplateOverrides { dir })
    }

    fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}
