//! Release context - build once, pass everywhere
//!
//! ```text
//! main.rs:
//!   ReleaseContext::build() -> &ReleaseContext
//!   |
//!   v
//! commands: catalog, ledger, orchestrator
//!   fn run(ctx: &ReleaseContext)
//! ```

use crate::core::config::ReleaseConfig;
use crate::core::error::ReleaseResult;
use crate::core::http::RetryPolicy;
use crate::release::ledger::Ledger;
use std::path::{Path, PathBuf};

/// Repository root plus loaded configuration
pub struct ReleaseContext {
  /// Repository root (absolute path)
  pub root: PathBuf,

  /// Validated release.toml
  pub config: ReleaseConfig,
}

impl ReleaseContext {
  /// Load configuration from `root` (or `explicit_config`)
  pub fn build(root: &Path, explicit_config: Option<&Path>) -> ReleaseResult<Self> {
    let config = ReleaseConfig::load(root, explicit_config)?;
    Ok(Self::new(root.to_path_buf(), config))
  }

  pub fn new(root: PathBuf, config: ReleaseConfig) -> Self {
    Self { root, config }
  }

  /// Open the tag ledger for the repository
  pub fn open_ledger(&self) -> ReleaseResult<Ledger> {
    Ledger::open(&self.root, self.config.ledger.remote.clone())
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy::from(&self.config.retry)
  }

  /// Absolute path of a repository-relative path
  pub fn resolve(&self, relative: &Path) -> PathBuf {
    self.root.join(relative)
  }

  /// Paths kept out of commits and cleanup (exported artifacts)
  pub fn preserved_paths(&self) -> Vec<String> {
    if self.config.pack.output_dir.is_absolute() {
      return Vec::new();
    }
    let dir = crate::utils::path_to_git_format(&self.config.pack.output_dir);
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
      return Vec::new();
    }
    vec![format!("{}/", dir)]
  }
}
