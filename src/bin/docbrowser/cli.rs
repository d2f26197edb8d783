//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use docbrowser::config;

/// docbrowser - build a static multi-version API documentation site for
/// Python packages
#[derive(Parser)]
#[command(name = "docbrowser")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (also escalates build failures to the exit
    /// code)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch sources, run pydoctor and publish the site
    Build(BuildArgs),

    /// Strip superseded version directories down to their objects.inv
    Prune(PruneArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Configuration file with the package list
    #[arg(long, short = 'c')]
    pub config_file: Option<PathBuf>,

    /// README rendered into the start page
    #[arg(long, default_value = config::DEFAULT_README_FILE)]
    pub readme_file: PathBuf,

    /// Directory for sources, version state and the published tree
    #[arg(long, default_value = config::DEFAULT_BUILD_DIR)]
    pub build_dir: PathBuf,

    /// Wall-clock budget for the build phase, in minutes
    #[arg(long, default_value_t = config::DEFAULT_BUILD_TIMEOUT_MINUTES)]
    pub build_timeout: u64,

    /// Build these packages ad hoc instead of the configured list
    /// (repeatable)
    #[arg(long = "package", value_name = "NAME")]
    pub packages: Vec<String>,

    /// Base URL of the published site, for cross-package links
    #[arg(long, default_value = config::DEFAULT_SITE_URL)]
    pub site_url: String,

    /// Base URL for "view source" links in generated pages
    #[arg(long)]
    pub viewsource_base: Option<String>,

    /// Path to the pydoctor executable (defaults to finding it in PATH)
    #[arg(long, env = "DOCBROWSER_PYDOCTOR")]
    pub pydoctor: Option<PathBuf>,
}

#[derive(Args)]
pub struct PruneArgs {
    /// Published tree to prune
    #[arg(long, default_value = "build/www")]
    pub www_dir: PathBuf,
}
