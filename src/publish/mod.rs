//! Publisher collaborator: uploads one artifact to the distribution service

pub mod modrinth;

use crate::build::Artifact;
use crate::core::config::{PackConfig, TrackConfig};
use crate::core::error::ReleaseResult;
use serde::Serialize;
use std::path::PathBuf;

pub use modrinth::ModrinthPublisher;

/// Everything the upload service needs for one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
  pub path: PathBuf,
  /// `{release}_{track}_{variant}`
  pub version_number: String,
  /// `{title} {track} ({label}) - v{release}`
  pub title: String,
  pub changelog: String,
  pub game_versions: Vec<String>,
}

impl PublishRequest {
  pub fn for_artifact(pack: &PackConfig, track: &TrackConfig, artifact: &Artifact) -> Self {
    Self {
      path: artifact.path.clone(),
      version_number: format!("{}_{}_{}", track.release, track.track, artifact.variant),
      title: format!(
        "{} {} ({}) - v{}",
        pack.display_title(),
        track.track,
        artifact.label,
        track.release
      ),
      changelog: artifact.changelog.clone(),
      game_versions: vec![track.track.to_string()],
    }
  }
}

/// Duplicate content counts as success
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
  Uploaded { id: String },
  Duplicate,
}

pub trait Publisher {
  fn publish(&mut self, request: &PublishRequest) -> ReleaseResult<UploadOutcome>;
}
