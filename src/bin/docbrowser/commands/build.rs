//! `docbrowser build` command

use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::cli::BuildArgs;
use docbrowser::config::{self, RunConfig};
use docbrowser::ops::build_site;

pub fn execute(verbose: bool, args: BuildArgs) -> Result<i32> {
    let adhoc = !args.packages.is_empty();
    if adhoc && args.config_file.is_some() {
        tracing::warn!("--package given, ignoring --config-file");
    }

    let config = RunConfig {
        build_dir: args.build_dir,
        readme_file: args.readme_file,
        build_timeout: Duration::from_secs(args.build_timeout * 60),
        site_url: args.site_url,
        viewsource_base: args.viewsource_base,
        generator: args.pydoctor,
        // Ad-hoc runs are interactive: always show generator output and
        // escalate failures.
        verbose: verbose || adhoc,
    };

    let specs = if adhoc {
        config::adhoc_specs(&args.packages)
    } else {
        let path = args
            .config_file
            .unwrap_or_else(|| Path::new(config::DEFAULT_CONFIG_FILE).to_path_buf());
        config::load_package_specs(&path)?
    };

    let condition = build_site(&config, &specs, adhoc)?;
    Ok(condition.code())
}
