//! Installation snapshot: what a build produced
//!
//! The persisted JSON form is the record of truth for a release and is read
//! back from the ledger at the tag's commit. All three arrays are required;
//! a missing array is a load failure.

use crate::core::error::{ReleaseResult, ResultExt, SnapshotError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// An item that installed, identified by its project identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRecord {
  pub identifier: String,
  pub category: String,
}

impl ItemRecord {
  pub fn new(identifier: impl Into<String>, category: impl Into<String>) -> Self {
    Self {
      identifier: identifier.into(),
      category: category.into(),
    }
  }
}

/// What happened to an alternative of a failed primary item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlternativeOutcome {
  TriedAndFailed,
  /// An earlier alternative succeeded, so this one was never tried
  NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlternativeAttempt {
  pub identifier: String,
  pub category: String,
  pub outcome: AlternativeOutcome,
}

/// A primary item that failed along with every alternative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecord {
  pub identifier: String,
  pub category: String,
  #[serde(default)]
  pub attempted_alternatives: Vec<AlternativeAttempt>,
}

/// A primary item that failed where one fallback succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeRecord {
  pub identifier: String,
  pub category: String,
  pub installed_alternative: ItemRecord,
  /// The other alternatives: tried before the winner, or never reached
  #[serde(default)]
  pub attempted_alternatives: Vec<AlternativeAttempt>,
}

/// Result of installing one primary item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
  Installed(ItemRecord),
  ViaAlternative(AlternativeRecord),
  Failed(FailedRecord),
}

impl ItemOutcome {
  pub fn identifier(&self) -> &str {
    match self {
      ItemOutcome::Installed(r) => &r.identifier,
      ItemOutcome::ViaAlternative(r) => &r.identifier,
      ItemOutcome::Failed(r) => &r.identifier,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationSnapshot {
  pub successful: Vec<ItemRecord>,
  pub failed: Vec<FailedRecord>,
  pub alternative_installed: Vec<AlternativeRecord>,
}

impl InstallationSnapshot {
  pub fn record(&mut self, outcome: ItemOutcome) {
    match outcome {
      ItemOutcome::Installed(r) => self.successful.push(r),
      ItemOutcome::ViaAlternative(r) => self.alternative_installed.push(r),
      ItemOutcome::Failed(r) => self.failed.push(r),
    }
  }

  /// Total number of primary items
  pub fn len(&self) -> usize {
    self.successful.len() + self.failed.len() + self.alternative_installed.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Reject snapshots where an identifier appears in more than one set
  pub fn validate(&self) -> Result<(), SnapshotError> {
    let mut seen = HashSet::new();
    let identifiers = self
      .successful
      .iter()
      .map(|r| r.identifier.as_str())
      .chain(self.failed.iter().map(|r| r.identifier.as_str()))
      .chain(self.alternative_installed.iter().map(|r| r.identifier.as_str()));
    for identifier in identifiers {
      if !seen.insert(identifier) {
        return Err(SnapshotError::DuplicateIdentifier {
          identifier: identifier.to_string(),
        });
      }
    }
    Ok(())
  }

  /// Parse persisted JSON; `source` names the origin for error messages
  pub fn from_json(bytes: &[u8], source: &str) -> Result<Self, SnapshotError> {
    let snapshot: InstallationSnapshot = serde_json::from_slice(bytes).map_err(|e| SnapshotError::Malformed {
      source: source.to_string(),
      reason: e.to_string(),
    })?;
    snapshot.validate()?;
    Ok(snapshot)
  }

  pub fn to_json_pretty(&self) -> ReleaseResult<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  /// Write pretty JSON, creating parent directories
  pub fn save(&self, path: &Path) -> ReleaseResult<()> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut json = self.to_json_pretty()?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
    Ok(())
  }
}
