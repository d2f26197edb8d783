//! High-level operations, one per CLI command.

pub mod build_site;

pub use build_site::{build_site, ExitCondition};
