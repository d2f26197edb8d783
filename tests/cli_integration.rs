//! End-to-end tests driving the compiled binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn docbrowser() -> Command {
    Command::cargo_bin("docbrowser").unwrap()
}

fn write_readme(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("README.md");
    fs::write(
        &path,
        "# API docs\n\nBrowse the docs:\n\n<!-- package list -->\n\nBuilt nightly.\n",
    )
    .unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    docbrowser()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("prune"));
}

#[test]
fn test_build_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let readme = write_readme(tmp.path());

    docbrowser()
        .arg("build")
        .arg("--config-file")
        .arg(tmp.path().join("nope.toml"))
        .arg("--readme-file")
        .arg(&readme)
        .arg("--build-dir")
        .arg(tmp.path().join("build"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn test_build_empty_package_list_produces_site_skeleton() {
    let tmp = TempDir::new().unwrap();
    let readme = write_readme(tmp.path());
    let config = tmp.path().join("packages.toml");
    fs::write(&config, "").unwrap();
    let build_dir = tmp.path().join("build");

    docbrowser()
        .arg("build")
        .arg("--config-file")
        .arg(&config)
        .arg("--readme-file")
        .arg(&readme)
        .arg("--build-dir")
        .arg(&build_dir)
        .assert()
        .success();

    assert!(build_dir.join("versions.json").exists());
    let index = fs::read_to_string(build_dir.join("www/index.html")).unwrap();
    assert!(index.contains("Browse the docs:"));
    assert!(index.contains("Built nightly."));
    assert!(build_dir.join("www/extra.css").exists());
}

#[test]
fn test_build_readme_without_marker_fails() {
    let tmp = TempDir::new().unwrap();
    let readme = tmp.path().join("README.md");
    fs::write(&readme, "# API docs\n\nNo marker.\n").unwrap();
    let config = tmp.path().join("packages.toml");
    fs::write(&config, "").unwrap();

    docbrowser()
        .arg("build")
        .arg("--config-file")
        .arg(&config)
        .arg("--readme-file")
        .arg(&readme)
        .arg("--build-dir")
        .arg(tmp.path().join("build"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("<!-- package list -->"));
}

#[test]
fn test_prune_strips_old_versions() {
    let tmp = TempDir::new().unwrap();
    let www = tmp.path().join("www");

    for (version, pages) in [
        ("1.0.0", vec!["index.html"]),
        ("1.2.0", vec!["index.html"]),
        ("2.0.0", vec!["index.html", "api.html"]),
    ] {
        let dir = www.join("pkg").join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("objects.inv"), "").unwrap();
        for page in pages {
            fs::write(dir.join(page), "<html>").unwrap();
        }
    }
    #[cfg(unix)]
    std::os::unix::fs::symlink("2.0.0", www.join("pkg/latest")).unwrap();

    docbrowser()
        .arg("prune")
        .arg("--www-dir")
        .arg(&www)
        .assert()
        .success();

    assert!(www.join("pkg/2.0.0/index.html").exists());
    assert!(www.join("pkg/2.0.0/api.html").exists());
    for version in ["1.0.0", "1.2.0"] {
        assert!(www.join("pkg").join(version).join("objects.inv").exists());
        assert!(!www.join("pkg").join(version).join("index.html").exists());
    }
}
