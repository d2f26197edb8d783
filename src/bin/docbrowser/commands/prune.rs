//! `docbrowser prune` command

use anyhow::Result;

use crate::cli::PruneArgs;
use docbrowser::prune::prune;

pub fn execute(args: PruneArgs) -> Result<i32> {
    prune(&args.www_dir)?;
    Ok(0)
}
