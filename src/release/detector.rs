//! Change detection between two installation snapshots
//!
//! `differs` is order-independent: each set is sorted by identifier before an
//! element-wise comparison. Loading the previous snapshot fails open: a
//! missing or unreadable record means "changed".

use super::ledger::Ledger;
use super::snapshot::InstallationSnapshot;
use super::tag::ReleaseTag;
use super::track::Track;
use crate::core::config::PackConfig;
use crate::core::error::ReleaseResult;
use std::path::PathBuf;

/// Whether two snapshots differ in any way that warrants a release
pub fn differs(old: &InstallationSnapshot, new: &InstallationSnapshot) -> bool {
  sorted_differ(successful_keys(old), successful_keys(new))
    || sorted_differ(failed_keys(old), failed_keys(new))
    || sorted_differ(alternative_keys(old), alternative_keys(new))
}

fn successful_keys(s: &InstallationSnapshot) -> Vec<(&str, &str)> {
  s.successful
    .iter()
    .map(|r| (r.identifier.as_str(), r.category.as_str()))
    .collect()
}

fn failed_keys(s: &InstallationSnapshot) -> Vec<(&str, &str)> {
  s.failed
    .iter()
    .map(|r| (r.identifier.as_str(), r.category.as_str()))
    .collect()
}

fn alternative_keys(s: &InstallationSnapshot) -> Vec<(&str, &str, &str)> {
  s.alternative_installed
    .iter()
    .map(|r| {
      (
        r.identifier.as_str(),
        r.category.as_str(),
        r.installed_alternative.identifier.as_str(),
      )
    })
    .collect()
}

/// Sort by the full key (identifier first) and compare, lengths first
fn sorted_differ<T: Ord>(mut old: Vec<T>, mut new: Vec<T>) -> bool {
  if old.len() != new.len() {
    return true;
  }
  old.sort();
  new.sort();
  old != new
}

/// Decides per track whether the latest build needs a new release
pub struct ChangeDetector<'a> {
  ledger: &'a Ledger,
  pack: &'a PackConfig,
}

impl<'a> ChangeDetector<'a> {
  pub fn new(ledger: &'a Ledger, pack: &'a PackConfig) -> Self {
    Self { ledger, pack }
  }

  /// Look up the latest tag for `track` and compare against its record
  pub fn needs_release(&self, track: &Track, current: &InstallationSnapshot) -> ReleaseResult<bool> {
    let previous = self.ledger.latest_tag(track)?;
    Ok(self.needs_release_since(previous.as_ref(), current))
  }

  /// Compare against the record at `previous`; no previous tag means a new track
  pub fn needs_release_since(&self, previous: Option<&ReleaseTag>, current: &InstallationSnapshot) -> bool {
    let Some(previous) = previous else {
      return true;
    };
    match self.load(previous) {
      Some(old) => differs(&old, current),
      None => true,
    }
  }

  /// The persisted snapshot at `tag`, or `None` if it is missing or malformed
  pub fn load(&self, tag: &ReleaseTag) -> Option<InstallationSnapshot> {
    let path = PathBuf::from(self.pack.state_file_for(&tag.track));
    let bytes = match self.ledger.read_file_at(tag, &path) {
      Ok(bytes) => bytes,
      Err(e) => {
        tracing::warn!("No snapshot for {}, assuming changed: {}", tag, e);
        return None;
      }
    };
    match InstallationSnapshot::from_json(&bytes, &format!("{}:{}", tag, path.display())) {
      Ok(snapshot) => Some(snapshot),
      Err(e) => {
        tracing::warn!("Unreadable snapshot for {}, assuming changed: {}", tag, e);
        None
      }
    }
  }
}
