//! Rendering the start page.
//!
//! The start page is the project README rendered to HTML, with the
//! package list spliced in at a marker comment. The marker is part of
//! the site's contract: a README without it is a configuration error,
//! caught before any network traffic happens.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use pulldown_cmark::{html, Parser};
use serde::Serialize;

use crate::util;

/// Comment marking where the package list goes in the README.
pub const PACKAGE_LIST_MARKER: &str = "<!-- package list -->";

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const EXTRA_CSS: &str = include_str!("../templates/extra.css");

/// The README's rendered HTML, split at the package list marker.
#[derive(Debug, Clone)]
pub struct ReadmeParts {
    pub before: String,
    pub after: String,
}

/// One row of the package list on the start page.
#[derive(Debug, Clone, Serialize)]
pub struct IndexEntry {
    pub name: String,
    pub version: String,
    pub summary: Option<String>,
    pub project_url: Option<String>,
}

#[derive(Serialize)]
struct IndexContext<'a> {
    before: &'a str,
    after: &'a str,
    packages: &'a [IndexEntry],
}

/// Render the README to HTML and split it at the package list marker.
///
/// Markdown keeps HTML comments verbatim, so the marker survives
/// rendering. A README without the marker is fatal.
pub fn load_readme(path: &Path) -> Result<ReadmeParts> {
    let markdown = util::fs::read_to_string(path)?;

    let mut rendered = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut rendered, Parser::new(&markdown));

    let Some((before, after)) = rendered.split_once(PACKAGE_LIST_MARKER) else {
        bail!(
            "{} does not contain the `{}` marker",
            path.display(),
            PACKAGE_LIST_MARKER
        );
    };

    Ok(ReadmeParts {
        before: before.to_string(),
        after: after.to_string(),
    })
}

/// Write the start page and its stylesheet into the published tree.
pub fn render_index(www_dir: &Path, readme: &ReadmeParts, entries: &[IndexEntry]) -> Result<()> {
    let mut engine = upon::Engine::new();
    engine.add_formatter("escape", escape_formatter);
    engine
        .add_template("index", INDEX_TEMPLATE)
        .context("failed to compile index template")?;

    let page = engine
        .template("index")
        .render(IndexContext {
            before: &readme.before,
            after: &readme.after,
            packages: entries,
        })
        .to_string()
        .context("failed to render index template")?;

    util::fs::write_string(&www_dir.join("index.html"), &page)?;
    util::fs::write_string(&www_dir.join("extra.css"), EXTRA_CSS)?;

    Ok(())
}

/// `| escape` formatter: HTML-escapes strings, everything else renders
/// as usual.
fn escape_formatter(f: &mut upon::fmt::Formatter<'_>, value: &upon::Value) -> upon::fmt::Result {
    match value {
        upon::Value::String(s) => {
            for c in s.chars() {
                match c {
                    '&' => f.write_str("&amp;")?,
                    '<' => f.write_str("&lt;")?,
                    '>' => f.write_str("&gt;")?,
                    '"' => f.write_str("&quot;")?,
                    '\'' => f.write_str("&#39;")?,
                    _ => f.write_str(c.encode_utf8(&mut [0; 4]))?,
                }
            }
            Ok(())
        }
        other => upon::fmt::default(f, other),
    }
}
