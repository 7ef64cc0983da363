//! Release ledger backed by git tags
//!
//! Tags are created and never deleted or rewritten. Each tag is bound to one
//! commit; unchanged tracks get a new tag at their previous tag's commit so
//! release numbers advance in lockstep across tracks.

use super::tag::ReleaseTag;
use super::track::Track;
use super::version::ReleaseVersion;
use crate::core::error::{LedgerError, ReleaseError, ReleaseResult};
use crate::core::vcs::SystemGit;
use std::path::Path;

/// What to push at the end of phase 1
#[derive(Debug, Clone, Copy)]
pub enum PushTarget<'a> {
  Tags(&'a [ReleaseTag]),
  AllTags,
}

pub struct Ledger {
  git: SystemGit,
  remote: String,
}

impl Ledger {
  pub fn open(root: &Path, remote: impl Into<String>) -> ReleaseResult<Self> {
    Ok(Self::new(SystemGit::open(root)?, remote))
  }

  pub fn new(git: SystemGit, remote: impl Into<String>) -> Self {
    Self {
      git,
      remote: remote.into(),
    }
  }

  pub fn git(&self) -> &SystemGit {
    &self.git
  }

  pub fn remote(&self) -> &str {
    &self.remote
  }

  /// Every parseable release tag (unparseable tags are ignored)
  pub fn release_tags(&self) -> ReleaseResult<Vec<ReleaseTag>> {
    let names = self.git.list_tags(None)?;
    Ok(names.iter().filter_map(|n| ReleaseTag::parse(n)).collect())
  }

  /// Tag with the highest release for `track`, compared numerically
  pub fn latest_tag(&self, track: &Track) -> ReleaseResult<Option<ReleaseTag>> {
    let names = self.git.list_tags(Some(&ReleaseTag::pattern_for(track)))?;
    Ok(latest_for_track(names.iter().map(String::as_str), track))
  }

  /// Highest release across all tracks; `0.0.0` for an empty ledger
  pub fn highest_global_release(&self) -> ReleaseResult<ReleaseVersion> {
    let tags = self.release_tags()?;
    Ok(tags.into_iter().map(|t| t.release).max().unwrap_or(ReleaseVersion::ZERO))
  }

  /// Release number for a track that has never been released
  pub fn first_release(&self, align_new_tracks: bool) -> ReleaseResult<ReleaseVersion> {
    if !align_new_tracks {
      return Ok(ReleaseVersion::INITIAL);
    }
    let highest = self.highest_global_release()?;
    first_release_after(highest).ok_or_else(|| {
      ReleaseError::Ledger(LedgerError::ReleaseOverflow {
        release: highest.to_string(),
      })
    })
  }

  /// Create an annotated tag at `at_commit`, or HEAD
  pub fn create(&self, tag: &ReleaseTag, message: &str, at_commit: Option<&str>) -> ReleaseResult<()> {
    let name = tag.name();
    if ReleaseTag::parse(&name).as_ref() != Some(tag) {
      return Err(ReleaseError::Ledger(LedgerError::InvalidTagName { tag: name }));
    }
    tracing::debug!("creating tag {} at {}", name, at_commit.unwrap_or("HEAD"));
    self.git.create_annotated_tag(&name, message, at_commit)
  }

  /// Commit the tag is bound to
  pub fn commit_of(&self, tag: &ReleaseTag) -> ReleaseResult<String> {
    self.git.tag_commit(&tag.name())?.ok_or_else(|| {
      ReleaseError::Ledger(LedgerError::TagNotFound {
        tag: tag.name(),
      })
    })
  }

  pub fn tag_exists(&self, tag: &ReleaseTag) -> ReleaseResult<bool> {
    Ok(self.git.tag_commit(&tag.name())?.is_some())
  }

  /// File contents at the tag's commit, without touching the working tree
  pub fn read_file_at(&self, tag: &ReleaseTag, path: &Path) -> ReleaseResult<Vec<u8>> {
    self.git.read_file_at(&format!("refs/tags/{}", tag), path)
  }

  pub fn push(&self, target: PushTarget<'_>) -> ReleaseResult<()> {
    match target {
      PushTarget::Tags(tags) => {
        let names: Vec<String> = tags.iter().map(ReleaseTag::name).collect();
        self.git.push_tags(&self.remote, &names)
      }
      PushTarget::AllTags => self.git.push_all_tags(&self.remote),
    }
  }

  /// One commit of the whole working tree (minus `exclude`) for this run's changed tracks
  pub fn commit_all(&self, message: &str, exclude: &[String]) -> ReleaseResult<String> {
    self.git.commit_all(message, exclude)
  }

  /// Where checkout-based work returns to: the configured branch, else the current one
  pub fn restore_point(&self, primary_branch: Option<&str>) -> ReleaseResult<String> {
    if let Some(branch) = primary_branch {
      return Ok(branch.to_string());
    }
    let branch = self.git.current_branch()?;
    if branch == "HEAD" {
      return self.git.head_commit();
    }
    Ok(branch)
  }

  /// Fail with the offending paths if anything outside `exclude` is uncommitted
  pub fn ensure_clean(&self, exclude: &[String]) -> ReleaseResult<()> {
    let paths = self.git.dirty_paths(exclude)?;
    if paths.is_empty() {
      return Ok(());
    }
    Err(ReleaseError::Ledger(LedgerError::DirtyWorkingTree { paths }))
  }

  /// Check out a tag; the guard discards build output and restores `restore_to` when dropped
  ///
  /// The tree must be clean beforehand: git refuses a checkout that would
  /// overwrite local changes, and nothing here discards them.
  pub fn checkout_tag<'a>(
    &'a self,
    tag: &ReleaseTag,
    restore_to: &str,
    keep: &[String],
  ) -> ReleaseResult<CheckoutGuard<'a>> {
    let guard = CheckoutGuard {
      git: &self.git,
      restore_to: restore_to.to_string(),
      keep: keep.to_vec(),
    };
    self.git.checkout(&format!("refs/tags/{}", tag))?;
    Ok(guard)
  }
}

/// Restores the working tree to the primary branch on every exit path
pub struct CheckoutGuard<'a> {
  git: &'a SystemGit,
  restore_to: String,
  keep: Vec<String>,
}

impl Drop for CheckoutGuard<'_> {
  fn drop(&mut self) {
    if let Err(e) = self.git.clean_working_tree(&self.keep) {
      tracing::warn!("Failed to clean working tree: {}", e);
    }
    if let Err(e) = self.git.checkout(&self.restore_to) {
      tracing::warn!("Failed to return to {}: {}", self.restore_to, e);
    }
  }
}

/// Latest release among `names` whose track component equals `track`
pub fn latest_for_track<'a>(names: impl IntoIterator<Item = &'a str>, track: &Track) -> Option<ReleaseTag> {
  names
    .into_iter()
    .filter_map(ReleaseTag::parse)
    .filter(|t| &t.track == track)
    .max_by_key(|t| t.release)
}

/// First release of a new track, aligned with the highest existing release
pub fn first_release_after(highest: ReleaseVersion) -> Option<ReleaseVersion> {
  highest.increment().map(|next| ReleaseVersion::INITIAL.max(next))
}
