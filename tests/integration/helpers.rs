//! Test helpers for integration tests

use anyhow::{Context, Result};
use pack_release::core::config::ReleaseConfig;
use pack_release::core::context::ReleaseContext;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const MINIMAL_CONFIG: &str = r#"
[pack]
name = "Test Pack"
title = "Test Pack"

[ledger]
push = false

[[items]]
identifier = "sodium"
category = "optimization"

[[items]]
identifier = "lithium"
category = "optimization"
"#;

/// A pack repository with one initial commit on `main`
pub struct TestRepo {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRepo {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;

    std::fs::write(path.join("pack.toml"), "name = \"Test Pack\"\n")?;
    std::fs::write(path.join("release.toml"), MINIMAL_CONFIG)?;
    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial pack setup"])?;

    Ok(Self { _root: root, path })
  }

  pub fn context(&self) -> Result<ReleaseContext> {
    let config = ReleaseConfig::parse(MINIMAL_CONFIG)?;
    Ok(ReleaseContext::new(self.path.clone(), config))
  }

  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    let full = self.path.join(path);
    if let Some(parent) = full.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(full, content)?;
    Ok(())
  }

  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  /// Stage everything and commit, returning the new HEAD
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;
    self.head()
  }

  pub fn head(&self) -> Result<String> {
    self.rev_parse("HEAD")
  }

  pub fn rev_parse(&self, reference: &str) -> Result<String> {
    let output = git(&self.path, &["rev-parse", reference])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Commit a tag points at
  pub fn tag_commit(&self, tag: &str) -> Result<String> {
    self.rev_parse(&format!("refs/tags/{}^{{commit}}", tag))
  }

  pub fn tags(&self) -> Result<Vec<String>> {
    let output = git(&self.path, &["tag", "--list"])?;
    let mut tags: Vec<String> = String::from_utf8_lossy(&output.stdout)
      .lines()
      .map(String::from)
      .collect();
    tags.sort();
    Ok(tags)
  }

  pub fn lightweight_tag(&self, name: &str) -> Result<()> {
    git(&self.path, &["tag", name])?;
    Ok(())
  }

  pub fn current_branch(&self) -> Result<String> {
    let output = git(&self.path, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the pack-release binary without asserting on its exit status
pub fn run_pack_release(cwd: &Path, args: &[&str]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_pack-release");
  Command::new(bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("PACK_RELEASE_CONFIG")
    .env("RUST_LOG", "warn")
    .output()
    .context("Failed to run pack-release")
}

/// A bare repository registered as `origin` of `repo`
pub struct TestRemote {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRemote {
  pub fn attach(repo: &TestRepo) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    git(&path, &["init", "--bare", "--initial-branch=main"])?;
    let url = path.to_string_lossy().to_string();
    git(&repo.path, &["remote", "add", "origin", &url])?;
    Ok(Self { _root: root, path })
  }

  pub fn tags(&self) -> Result<Vec<String>> {
    let output = git(&self.path, &["tag", "--list"])?;
    let mut tags: Vec<String> = String::from_utf8_lossy(&output.stdout)
      .lines()
      .map(String::from)
      .collect();
    tags.sort();
    Ok(tags)
  }
}
