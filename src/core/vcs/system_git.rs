//! System git backend
//!
//! Every ledger operation is a git subprocess with an isolated environment.
//! Reads at historical points go through `git show <ref>:<path>` so the working
//! tree is never touched.

use crate::core::error::{LedgerError, ReleaseError, ReleaseResult, ResultExt};
use crate::utils::path_to_git_format;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Environment variables passed through to git (everything else is cleared)
const ENV_ALLOWLIST: &[&str] = &["PATH", "HOME", "SSH_AUTH_SOCK", "GIT_SSH_COMMAND"];

/// Git backend using system git
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  pub fn open(path: &Path) -> ReleaseResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(ReleaseError::Ledger(LedgerError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(ReleaseError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
    })
  }

  /// Working tree root
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> ReleaseResult<String> {
    self.run(&["rev-parse", "HEAD"]).map(|s| s.trim().to_string())
  }

  /// Get current branch name ("HEAD" when detached)
  pub fn current_branch(&self) -> ReleaseResult<String> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--abbrev-ref", "HEAD"])
      .output()
      .context("Failed to get current branch")?;

    if !output.status.success() {
      return Ok("HEAD".to_string());
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Read a file as it exists at `reference` (tag, branch or commit)
  pub fn read_file_at(&self, reference: &str, path: &Path) -> ReleaseResult<Vec<u8>> {
    let git_path = path_to_git_format(path);
    let object = format!("{}:{}", reference, git_path);

    let output = self
      .git_cmd()
      .args(["show", &object])
      .output()
      .context("Failed to read file from git object store")?;

    if !output.status.success() {
      return Err(ReleaseError::Ledger(LedgerError::FileNotFound {
        reference: reference.to_string(),
        path: git_path,
      }));
    }

    Ok(output.stdout)
  }

  /// Run git and return stdout, mapping a non-zero exit to `LedgerError::CommandFailed`
  pub(crate) fn run(&self, args: &[&str]) -> ReleaseResult<String> {
    let output = self.output(args)?;
    if !output.status.success() {
      return Err(command_failed(args, &output));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }

  /// Run git and hand back the raw output, whatever the exit status
  pub(crate) fn output(&self, args: &[&str]) -> ReleaseResult<Output> {
    tracing::debug!("git {}", args.join(" "));
    self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute git {}", args.first().copied().unwrap_or_default()))
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists PATH, HOME and the ssh agent/command used for pushing
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    cmd.env_clear();
    for name in ENV_ALLOWLIST {
      if let Ok(value) = std::env::var(name) {
        cmd.env(name, value);
      }
    }

    cmd.arg("-c").arg("protocol.version=2");
    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");
    cmd.arg("-c").arg("tag.gpgSign=false");

    cmd
  }
}

pub(crate) fn command_failed(args: &[&str], output: &Output) -> ReleaseError {
  ReleaseError::Ledger(LedgerError::CommandFailed {
    command: format!("git {}", args.join(" ")),
    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
  })
}
