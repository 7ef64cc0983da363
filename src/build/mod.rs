//! Builder collaborator: installs a track's items and exports artifacts
//!
//! The orchestrator only sees snapshots and artifact paths; how items are
//! installed is up to the implementation (packwiz by default).

pub mod packwiz;

use crate::core::config::TrackConfig;
use crate::core::error::ReleaseResult;
use crate::release::snapshot::InstallationSnapshot;
use std::path::PathBuf;

pub use packwiz::PackwizBuilder;

/// One exported variant of a track's release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
  pub variant: String,
  pub label: String,
  pub changelog: String,
  pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
  /// Snapshot of the primary variant
  pub snapshot: InstallationSnapshot,
  pub artifacts: Vec<Artifact>,
}

pub trait PackBuilder {
  /// Install the primary variant for `track` into the working tree and report what installed
  fn install(&mut self, track: &TrackConfig) -> ReleaseResult<InstallationSnapshot>;

  /// Install and export every variant, primary last
  fn build(&mut self, track: &TrackConfig) -> ReleaseResult<BuildOutput>;
}
