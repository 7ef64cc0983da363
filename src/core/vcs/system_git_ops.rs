//! Ledger operations for SystemGit (tags, commits, checkout, push)

use super::system_git::{SystemGit, command_failed};
use crate::core::error::{LedgerError, NetworkError, ReleaseError, ReleaseResult};

impl SystemGit {
  /// List tag names matching a glob pattern (all tags when `None`)
  pub fn list_tags(&self, pattern: Option<&str>) -> ReleaseResult<Vec<String>> {
    let mut args = vec!["tag", "--list"];
    if let Some(pattern) = pattern {
      args.push(pattern);
    }
    let stdout = self.run(&args)?;
    Ok(
      stdout
        .lines()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect(),
    )
  }

  /// Commit a tag is bound to, or `None` when the tag does not exist
  pub fn tag_commit(&self, tag: &str) -> ReleaseResult<Option<String>> {
    let object = format!("refs/tags/{}^{{commit}}", tag);
    let output = self.output(&["rev-parse", "--verify", "--quiet", &object])?;
    if !output.status.success() {
      return Ok(None);
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!sha.is_empty()).then_some(sha))
  }

  /// Create an annotated tag at `target` (HEAD when `None`)
  pub fn create_annotated_tag(&self, tag: &str, message: &str, target: Option<&str>) -> ReleaseResult<()> {
    let mut args = vec!["tag", "-a", tag, "-m", message];
    if let Some(target) = target {
      args.push(target);
    }
    let output = self.output(&args)?;
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("already exists") {
        return Err(ReleaseError::Ledger(LedgerError::TagExists { tag: tag.to_string() }));
      }
      if stderr.contains("not a valid tag name") {
        return Err(ReleaseError::Ledger(LedgerError::InvalidTagName { tag: tag.to_string() }));
      }
      return Err(command_failed(&args, &output));
    }
    Ok(())
  }

  /// Push the given tags to a remote in one invocation
  pub fn push_tags(&self, remote: &str, tags: &[String]) -> ReleaseResult<()> {
    if tags.is_empty() {
      return Ok(());
    }
    let refspecs: Vec<String> = tags.iter().map(|t| format!("refs/tags/{}", t)).collect();
    let mut args = vec!["push", remote];
    args.extend(refspecs.iter().map(String::as_str));
    self.push(remote, &args)
  }

  /// Push every local tag
  pub fn push_all_tags(&self, remote: &str) -> ReleaseResult<()> {
    self.push(remote, &["push", remote, "--tags"])
  }

  fn push(&self, remote: &str, args: &[&str]) -> ReleaseResult<()> {
    let output = self.output(args)?;
    if !output.status.success() {
      return Err(ReleaseError::Network(NetworkError::PushFailed {
        remote: remote.to_string(),
        reason: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }
    Ok(())
  }

  /// Stage everything except `exclude` and commit; returns the new commit SHA
  pub fn commit_all(&self, message: &str, exclude: &[String]) -> ReleaseResult<String> {
    let excludes: Vec<String> = exclude.iter().map(|p| format!(":(exclude){}", p)).collect();
    let mut args = vec!["add", "-A", "--", "."];
    args.extend(excludes.iter().map(String::as_str));
    self.run(&args)?;
    self.run(&["commit", "--allow-empty", "--no-verify", "-m", message])?;
    self.head_commit()
  }

  /// Check out a branch, tag or commit
  pub fn checkout(&self, reference: &str) -> ReleaseResult<()> {
    self.run(&["checkout", "--quiet", reference]).map(|_| ())
  }

  /// Paths with uncommitted changes or untracked files, ignoring `exclude`
  pub fn dirty_paths(&self, exclude: &[String]) -> ReleaseResult<Vec<String>> {
    let excludes: Vec<String> = exclude.iter().map(|p| format!(":(exclude){}", p)).collect();
    let mut args = vec!["status", "--porcelain", "--untracked-files=all", "--", "."];
    args.extend(excludes.iter().map(String::as_str));
    let stdout = self.run(&args)?;
    Ok(
      stdout
        .lines()
        .filter_map(|line| line.get(3..))
        .map(str::to_string)
        .collect(),
    )
  }

  /// Discard tracked changes and untracked files, keeping paths matching `keep`
  pub fn clean_working_tree(&self, keep: &[String]) -> ReleaseResult<()> {
    self.run(&["reset", "--hard", "--quiet"])?;
    let mut args = vec!["clean", "-fd", "--quiet"];
    for pattern in keep {
      args.push("-e");
      args.push(pattern);
    }
    self.run(&args)?;
    Ok(())
  }
}
