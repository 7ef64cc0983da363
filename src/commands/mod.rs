//! CLI commands for pack-release
//!
//! - **tracks**: List the tracks the catalog currently offers
//! - **release**: check, publish and run (the two release phases)
//! - **latest**: Show the latest release tag of a track
//!
//! All commands accept `&ReleaseContext` and return the process exit code.

pub mod latest;
pub mod release;
pub mod tracks;

pub use latest::run_latest;
pub use release::run_release;
pub use tracks::run_tracks;

use crate::catalog::Catalog;
use crate::core::context::ReleaseContext;
use crate::core::error::ReleaseResult;
use crate::core::http::HttpClient;
use crate::release::track::Track;

/// Tracks named on the command line, or the catalog's valid tracks when none are
pub(crate) fn resolve_tracks(ctx: &ReleaseContext, http: &HttpClient, explicit: &[String]) -> ReleaseResult<Vec<Track>> {
  if !explicit.is_empty() {
    let mut tracks: Vec<Track> = explicit.iter().map(|t| Track::new(t.as_str())).collect();
    for track in tracks.iter().filter(|t| !t.is_valid()) {
      tracing::warn!("{} is outside the supported track range", track);
    }
    tracks.sort();
    tracks.dedup();
    return Ok(tracks);
  }

  let catalog = Catalog::new(http, &ctx.config.catalog);
  let tracks = catalog.list_valid_tracks()?;
  tracing::info!("catalog lists {} valid track(s)", tracks.len());
  Ok(tracks)
}
