//! Release version counter (`major.minor.patch`)
//!
//! Independent of the track's own version. Only the patch component ever
//! moves; a track's first release starts at `0.1.0`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A `major.minor.patch` release counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ReleaseVersion {
  pub major: u64,
  pub minor: u64,
  pub patch: u64,
}

impl ReleaseVersion {
  /// First release of a track with no prior release
  pub const INITIAL: ReleaseVersion = ReleaseVersion::new(0, 1, 0);

  /// Value reported when the ledger holds no release at all
  pub const ZERO: ReleaseVersion = ReleaseVersion::new(0, 0, 0);

  pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
    Self { major, minor, patch }
  }

  /// Parse exactly three dot-separated runs of ASCII digits
  pub fn parse(s: &str) -> Option<Self> {
    let mut parts = s.split('.');
    let major = parse_component(parts.next()?)?;
    let minor = parse_component(parts.next()?)?;
    let patch = parse_component(parts.next()?)?;
    if parts.next().is_some() {
      return None;
    }
    Some(Self { major, minor, patch })
  }

  /// Next release: patch + 1, major/minor unchanged; `None` once patch is at `u64::MAX`
  pub fn increment(&self) -> Option<Self> {
    self.patch.checked_add(1).map(|patch| Self { patch, ..*self })
  }

  /// Release directly before this one on the same major/minor line
  pub fn previous(&self) -> Option<Self> {
    self.patch.checked_sub(1).map(|patch| Self { patch, ..*self })
  }

  /// First release of a track is a x.y.0 release
  pub fn is_first_of_line(&self) -> bool {
    self.patch == 0
  }
}

pub(crate) fn parse_component(part: &str) -> Option<u64> {
  if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  part.parse().ok()
}

impl fmt::Display for ReleaseVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
  }
}

impl FromStr for ReleaseVersion {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s).ok_or_else(|| format!("invalid release version '{}'", s))
  }
}

impl Serialize for ReleaseVersion {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ReleaseVersion {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}
