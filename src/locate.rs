//! Locating the importable package within an extracted source tree.
//!
//! A pure, ordered chain of heuristics over the filesystem; the first
//! rule producing candidates wins. We never execute `setup.py`, so the
//! only declared layout we honor is `setup.cfg`'s `package_dir`.

use std::fs;
use std::path::{Path, PathBuf};

const INIT_MARKER: &str = "__init__.py";

/// Directories that are never the package we want to document.
const EXCLUDED_DIRS: &[&str] = &["test", "tests"];

/// One step of the locator chain: a pure resolver over the source tree.
type LocateRule = fn(&Path, &str) -> Vec<PathBuf>;

/// The ordered heuristic chain. Order matters: an explicit declaration
/// beats the conventional layouts, which beat the exhaustive scan.
const RULES: &[(&str, LocateRule)] = &[
    ("setup.cfg package_dir", rule_setup_cfg),
    ("top-level package", rule_top_level),
    ("src layout", rule_src_layout),
    ("single-file module", rule_single_module),
    ("subdirectory scan", rule_scan),
];

/// Determine candidate package directories for `name` under
/// `source_root`. Zero candidates means the package cannot be located;
/// more than one means ambiguity (callers take the first and warn).
pub fn locate(source_root: &Path, name: &str) -> Vec<PathBuf> {
    let name = name.to_lowercase();

    for (rule_name, rule) in RULES {
        let found = rule(source_root, &name);
        if !found.is_empty() {
            tracing::debug!("located {} via {}", name, rule_name);
            return found;
        }
    }

    Vec::new()
}

/// Rule 1: `setup.cfg` declares `[options] package_dir` rooted at `=`.
fn rule_setup_cfg(root: &Path, name: &str) -> Vec<PathBuf> {
    let Some(raw) = setup_cfg_package_dir(&root.join("setup.cfg")) else {
        return Vec::new();
    };

    let raw = raw.trim();
    if let Some(stripped) = raw.strip_prefix('=') {
        let package_dir = stripped.trim_start_matches([' ', '=']);
        let candidate = root.join(package_dir).join(name);
        if candidate.join(INIT_MARKER).exists() {
            return vec![candidate];
        }
    } else {
        tracing::warn!("options.package_dir in {}'s setup.cfg doesn't start with =", name);
    }

    Vec::new()
}

/// Rule 2: `<root>/<name>/__init__.py`.
fn rule_top_level(root: &Path, name: &str) -> Vec<PathBuf> {
    let candidate = root.join(name);
    if candidate.join(INIT_MARKER).exists() {
        return vec![candidate];
    }
    Vec::new()
}

/// Rule 3: `<root>/src/<name>/__init__.py`.
fn rule_src_layout(root: &Path, name: &str) -> Vec<PathBuf> {
    let candidate = root.join("src").join(name);
    if candidate.join(INIT_MARKER).exists() {
        return vec![candidate];
    }
    Vec::new()
}

/// Rule 4: `<root>/<name>.py`, the single-file package case (e.g.
/// bottle).
fn rule_single_module(root: &Path, name: &str) -> Vec<PathBuf> {
    let candidate = root.join(format!("{name}.py"));
    if candidate.is_file() {
        return vec![candidate];
    }
    Vec::new()
}

/// Rule 5: scan every immediate subdirectory carrying an init marker,
/// excluding test directories.
fn rule_scan(root: &Path, _name: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() || !path.join(INIT_MARKER).exists() {
            continue;
        }
        let dir_name = entry.file_name();
        if EXCLUDED_DIRS.iter().any(|x| dir_name.eq_ignore_ascii_case(x)) {
            continue;
        }
        candidates.push(path);
    }

    candidates.sort();
    candidates
}

/// Read the `package_dir` value from `[options]` in a setup.cfg file.
///
/// Minimal INI scan; handles the common continuation style where the
/// value sits on the following indented line.
fn setup_cfg_package_dir(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;

    let mut in_options = false;
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_options = trimmed == "[options]";
            continue;
        }
        if !in_options || line.starts_with(|c: char| c.is_whitespace()) {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() != "package_dir" {
            continue;
        }

        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
        // Continuation style: the value is on the next indented line.
        if let Some(next) = lines.peek() {
            if next.starts_with(|c: char| c.is_whitespace()) {
                return Some(next.trim().to_string());
            }
        }
        return None;
    }

    None
}
