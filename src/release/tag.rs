//! Release tags: `{track}_{major}.{minor}.{patch}`
//!
//! This string is the only contract other tooling needs to read releases.
//! Parsing splits on the final underscore and validates each half against its
//! own grammar: the track has 2 or 3 numeric components, the release exactly 3.

use super::track::{Track, TrackVersion};
use super::version::ReleaseVersion;
use std::fmt;

/// A release of one track, as recorded in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseTag {
  pub track: Track,
  pub release: ReleaseVersion,
}

impl ReleaseTag {
  pub fn new(track: Track, release: ReleaseVersion) -> Self {
    Self { track, release }
  }

  /// Parse a tag name; `None` for anything not in the release tag format
  pub fn parse(name: &str) -> Option<Self> {
    let (track, release) = name.rsplit_once('_')?;
    TrackVersion::parse(track)?;
    let release = ReleaseVersion::parse(release)?;
    Some(Self {
      track: Track::new(track),
      release,
    })
  }

  /// Tag name as stored in the ledger
  pub fn name(&self) -> String {
    self.to_string()
  }

  /// Tag for the next release of the same track, if the patch can still grow
  pub fn next(&self) -> Option<Self> {
    self.release.increment().map(|release| Self::new(self.track.clone(), release))
  }

  /// Tag for the release directly before this one on the same track
  pub fn previous(&self) -> Option<Self> {
    self.release.previous().map(|release| Self::new(self.track.clone(), release))
  }

  /// Glob matching every tag of `track` (parse to filter exact matches)
  pub fn pattern_for(track: &Track) -> String {
    format!("{}_*", track)
  }
}

impl fmt::Display for ReleaseTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}_{}", self.track, self.release)
  }
}
