// tests/cli.rs

//! Command-line tests for the m4-recipe binary
//!
//! These run the built binary against the shipped recipe and check what
//! lands on stdout, which scripts and pipelines consume.

mod common;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use common::recipe_dir;
use predicates::prelude::*;
use std::fs;

const LINUX_SPEC: &str = "@1.4.18 +sigsegv %gcc platform=linux os=ubuntu22.04";

fn m4_recipe_cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("m4-recipe");
    // Logging stays on so stdout cleanliness is actually exercised
    cmd.env("RUST_LOG", "debug");
    cmd
}

fn shipped_recipe_arg() -> String {
    recipe_dir().join("recipe.toml").display().to_string()
}

// =============================================================================
// Inspection
// =============================================================================

#[test]
fn validate_shipped_recipe() {
    m4_recipe_cmd()
        .args(["validate", "-r", &shipped_recipe_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] No issues found"));
}

#[test]
fn validate_missing_recipe_fails() {
    m4_recipe_cmd()
        .args(["validate", "-r", "/nonexistent/recipe.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse recipe"));
}

#[test]
fn show_json_is_parseable() {
    let output = m4_recipe_cmd()
        .args(["show", "--json", "-r", &shipped_recipe_arg()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let recipe: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(recipe["package"]["name"], "m4");
    assert_eq!(recipe["versions"].as_array().unwrap().len(), 2);
}

#[test]
fn args_prints_one_argument_per_line() {
    m4_recipe_cmd()
        .args(["args", "-r", &shipped_recipe_arg(), "--spec", LINUX_SPEC])
        .args(["--dep", "libsigsegv=/opt/libsigsegv"])
        .assert()
        .success()
        .stdout("--enable-c++\n--with-libsigsegv-prefix=/opt/libsigsegv\n");
}

#[test]
fn args_requires_active_dependency() {
    m4_recipe_cmd()
        .args(["args", "-r", &shipped_recipe_arg(), "--spec", LINUX_SPEC])
        .assert()
        .failure()
        .stderr(predicate::str::contains("libsigsegv"));
}

#[test]
fn args_without_sigsegv_needs_no_dependency() {
    m4_recipe_cmd()
        .args(["args", "-r", &shipped_recipe_arg()])
        .args(["--spec", "@1.4.18 ~sigsegv %gcc platform=linux os=ubuntu22.04"])
        .assert()
        .success()
        .stdout("--enable-c++\n--without-libsigsegv-prefix\n");
}

#[test]
fn patches_listed_without_dependency() {
    let output = m4_recipe_cmd()
        .args(["patches", "-r", &shipped_recipe_arg(), "--spec", LINUX_SPEC])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "{}", stdout);
    assert!(lines[0].ends_with("patches/gnulib-pgi.patch"));
    assert!(lines[1].ends_with("m4-1.4.18-glibc-change-work-around.patch"));
}

#[test]
fn cook_rejects_zero_jobs() {
    m4_recipe_cmd()
        .args(["cook", "-r", &shipped_recipe_arg(), "--jobs", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--jobs"));
}

// =============================================================================
// Fetch
// =============================================================================

fn mirror_recipe(dir: &std::path::Path, checksum: &str) -> String {
    let mirror = reqwest::Url::from_directory_path(dir.join("mirror")).unwrap();
    let path = dir.join("recipe.toml");
    fs::write(
        &path,
        format!(
            r#"
[package]
name = "m4"

[source]
mirror_path = "m4/m4-%(version)s.tar.gz"
mirrors = ["{}"]

[[versions]]
version = "1.4.18"
checksum = "{}"
"#,
            mirror.as_str().trim_end_matches('/'),
            checksum
        ),
    )
    .unwrap();
    path.display().to_string()
}

#[test]
fn fetch_from_local_mirror() {
    use m4_recipe::hash::{hash_file, HashAlgorithm};

    let dir = tempfile::tempdir().unwrap();
    let tarball = dir.path().join("mirror/m4/m4-1.4.18.tar.gz");
    fs::create_dir_all(tarball.parent().unwrap()).unwrap();
    fs::write(&tarball, b"not really a tarball").unwrap();
    let checksum = hash_file(HashAlgorithm::Sha256, &tarball).unwrap().to_string();

    let recipe = mirror_recipe(dir.path(), &checksum);
    let cache = dir.path().join("cache");
    m4_recipe_cmd()
        .args(["fetch", "-r", &recipe, "--source-cache"])
        .arg(&cache)
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetched 1 source file(s)"))
        .stdout(predicate::str::contains("Ready for offline build"));

    assert_eq!(fs::read_dir(&cache).unwrap().count(), 1);
}

#[test]
fn fetch_rejects_checksum_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let tarball = dir.path().join("mirror/m4/m4-1.4.18.tar.gz");
    fs::create_dir_all(tarball.parent().unwrap()).unwrap();
    fs::write(&tarball, b"tampered").unwrap();

    let recipe = mirror_recipe(
        dir.path(),
        "sha256:ab2633921a5cd38e48797bf5521ad259bdc4b979078034a3b790d7fec5493fab",
    );
    m4_recipe_cmd()
        .args(["fetch", "-r", &recipe, "--source-cache"])
        .arg(dir.path().join("cache"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch sources"));
}

// =============================================================================
// Test
// =============================================================================

#[cfg(unix)]
mod verify {
    use super::*;
    use crate::common::{copy_fixtures, install_fake_m4};

    #[test]
    fn test_json_report_on_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        copy_fixtures(&work);
        let prefix = dir.path().join("prefix");
        install_fake_m4(&prefix, "m4 (GNU M4) 1.4.18", &work.join("data/hello.out"));

        // Default spec has +sigsegv; verification needs no --dep
        let output = m4_recipe_cmd()
            .args(["test", "--json", "-r", &shipped_recipe_arg(), "--spec", "@1.4.18"])
            .arg("--prefix")
            .arg(&prefix)
            .arg("--work-dir")
            .arg(&work)
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        assert!(!output.stderr.is_empty(), "expected log output on stderr");

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["executable"], prefix.join("bin/m4").display().to_string());
        assert_eq!(report["version_line"], "m4 (GNU M4) 1.4.18");
        assert_eq!(report["fixtures_checked"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_relative_prefix_and_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        copy_fixtures(&work);
        install_fake_m4(
            &dir.path().join("install"),
            "m4 (GNU M4) 1.4.18",
            &work.join("data/hello.out"),
        );

        m4_recipe_cmd()
            .current_dir(dir.path())
            .args(["test", "-r", &shipped_recipe_arg(), "--spec", "@1.4.18"])
            .args(["--prefix", "install", "--work-dir", "work"])
            .assert()
            .success()
            .stdout(predicate::str::contains("install/bin/m4"))
            .stdout(predicate::str::contains("[OK]"));
    }

    #[test]
    fn test_wrong_version_fails() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        copy_fixtures(&work);
        let prefix = dir.path().join("prefix");
        install_fake_m4(&prefix, "m4 (GNU M4) 1.4.17", &work.join("data/hello.out"));

        m4_recipe_cmd()
            .args(["test", "-r", &shipped_recipe_arg(), "--spec", "@1.4.18"])
            .arg("--prefix")
            .arg(&prefix)
            .arg("--work-dir")
            .arg(&work)
            .assert()
            .failure()
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("Verification of"));
    }
}
