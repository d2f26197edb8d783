//! docbrowser - builds and publishes a static multi-version API
//! documentation site for a curated list of Python packages.
//!
//! The pipeline fetches each package's source distribution from PyPI,
//! runs pydoctor against the extracted sources, publishes the generated
//! HTML under `www/<package>/<version>/`, maintains a `latest` symlink
//! per package and renders the start page.

pub mod archive;
pub mod build;
pub mod config;
pub mod fetch;
pub mod locate;
pub mod ops;
pub mod prune;
pub mod publish;
pub mod registry;
pub mod render;
pub mod util;
pub mod versions;

pub use build::{BuildOutcome, BuildRunner};
pub use config::{PackageSpec, RunConfig};
pub use fetch::SourceFetcher;
pub use ops::build_site::ExitCondition;
pub use registry::Registry;
pub use versions::VersionStore;
