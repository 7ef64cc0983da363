//! Tracks: independently released lines such as a game version
//!
//! A track name is `major.minor` or `major.minor.patch` (patch defaults to 0).
//! Ordering is numeric field by field; names that don't parse sort after all
//! parsed names, lexicographically among themselves.

use super::version::parse_component;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Numeric components of a track name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TrackVersion {
  pub major: u64,
  pub minor: u64,
  pub patch: u64,
}

impl TrackVersion {
  /// Parse `\d+\.\d+(\.\d+)?`
  pub fn parse(s: &str) -> Option<Self> {
    let mut parts = s.split('.');
    let major = parse_component(parts.next()?)?;
    let minor = parse_component(parts.next()?)?;
    let patch = match parts.next() {
      Some(p) => parse_component(p)?,
      None => 0,
    };
    if parts.next().is_some() {
      return None;
    }
    Some(Self { major, minor, patch })
  }
}

/// An opaque track identifier with semantic ordering
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Track(String);

impl Track {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Numeric components, if the name follows the track grammar
  pub fn parsed(&self) -> Option<TrackVersion> {
    TrackVersion::parse(&self.0)
  }

  /// Tracks this pack is built for: major >= 2, or major 1 with minor >= 14
  pub fn is_valid(&self) -> bool {
    match self.parsed() {
      Some(v) if v.major >= 2 => true,
      Some(v) if v.major == 1 => v.minor >= 14,
      _ => false,
    }
  }
}

impl Ord for Track {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self.parsed(), other.parsed()) {
      // "1.14" and "1.14.0" compare equal numerically; the text keeps Ord consistent with Eq
      (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
      (Some(_), None) => Ordering::Less,
      (None, Some(_)) => Ordering::Greater,
      (None, None) => self.0.cmp(&other.0),
    }
  }
}

impl PartialOrd for Track {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl fmt::Display for Track {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for Track {
  fn from(s: &str) -> Self {
    Track::new(s)
  }
}

impl Serialize for Track {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0)
  }
}

impl<'de> Deserialize<'de> for Track {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    String::deserialize(deserializer).map(Track)
  }
}
