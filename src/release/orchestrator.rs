//! Two-phase release workflow
//!
//! Phase 1 (check-and-tag) builds every track, decides whether it changed,
//! commits the working tree once for all changed tracks and tags every
//! non-errored track: changed tracks at the new commit, unchanged tracks at
//! their previous tag's commit. Tags are pushed once at the end.
//!
//! Phase 2 (publish) re-derives everything from the ledger. A track is
//! published when its latest tag is a first release, has no predecessor, or
//! is bound to a different commit than its predecessor.
//!
//! Tracks are processed sequentially in track order; errors are scoped to the
//! track they happen in.

use super::detector::ChangeDetector;
use super::ledger::{Ledger, PushTarget};
use super::snapshot::InstallationSnapshot;
use super::tag::ReleaseTag;
use super::track::Track;
use super::version::ReleaseVersion;
use crate::build::PackBuilder;
use crate::core::config::TrackConfig;
use crate::core::context::ReleaseContext;
use crate::core::error::{LedgerError, ReleaseError, ReleaseResult};
use crate::publish::{PublishRequest, Publisher, UploadOutcome};
use crate::report;
use crate::ui;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
  CheckOnly,
  CheckAndPublish,
  PublishOnly,
}

impl RunMode {
  fn checks(self) -> bool {
    matches!(self, RunMode::CheckOnly | RunMode::CheckAndPublish)
  }

  fn publishes(self) -> bool {
    matches!(self, RunMode::PublishOnly | RunMode::CheckAndPublish)
  }
}

/// Phase 1 outcome for one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
  /// First release of the track
  New { tag: String, commit: String },
  Changed { previous: String, tag: String, commit: String },
  /// `tag` is `None` when unchanged tracks are not tagged (or nothing changed at all)
  Unchanged {
    previous: String,
    tag: Option<String>,
    commit: String,
  },
  Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackCheck {
  pub track: Track,
  #[serde(flatten)]
  pub outcome: CheckOutcome,
}

impl TrackCheck {
  pub fn is_error(&self) -> bool {
    matches!(self.outcome, CheckOutcome::Error { .. })
  }

  pub fn is_changed(&self) -> bool {
    matches!(self.outcome, CheckOutcome::New { .. } | CheckOutcome::Changed { .. })
  }
}

/// Why phase 2 decided to publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishReason {
  /// Patch component is 0
  FirstRelease,
  /// The tag for `patch - 1` does not exist
  NoPreviousTag,
  /// The previous tag is bound to a different commit
  ContentChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadRecord {
  pub variant: String,
  pub version_number: String,
  pub outcome: UploadOutcome,
}

/// Phase 2 outcome for one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishOutcome {
  Published {
    tag: String,
    reason: PublishReason,
    uploads: Vec<UploadRecord>,
  },
  Skipped { reason: String },
  Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackPublish {
  pub track: Track,
  #[serde(flatten)]
  pub outcome: PublishOutcome,
}

impl TrackPublish {
  pub fn is_error(&self) -> bool {
    matches!(self.outcome, PublishOutcome::Error { .. })
  }
}

/// Everything one run did, per track and phase
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub mode: RunMode,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  pub checks: Vec<TrackCheck>,
  pub publishes: Vec<TrackPublish>,
  /// Tags created (or found already in place) by phase 1
  pub tags: Vec<String>,
  pub pushed: bool,
  pub push_error: Option<String>,
}

impl RunReport {
  pub fn has_errors(&self) -> bool {
    self.push_error.is_some() || self.checks.iter().any(TrackCheck::is_error) || self.publishes.iter().any(TrackPublish::is_error)
  }

  /// Phase 1 ran and found nothing to release
  pub fn nothing_to_do(&self) -> bool {
    self.mode.checks() && self.tags.is_empty() && !self.checks.iter().any(TrackCheck::is_error)
  }
}

/// Phase 2 decision for the latest tag of a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishDecision {
  Publish(PublishReason),
  Skip(String),
}

/// Decide whether `latest` needs publishing, given its commit and its predecessor's (if tagged)
pub fn publish_decision(latest: &ReleaseTag, latest_commit: &str, previous_commit: Option<&str>) -> PublishDecision {
  let Some(previous) = latest.previous() else {
    return PublishDecision::Publish(PublishReason::FirstRelease);
  };
  match previous_commit {
    None => PublishDecision::Publish(PublishReason::NoPreviousTag),
    Some(commit) if commit == latest_commit => PublishDecision::Skip(format!("No changes from {}", previous)),
    Some(_) => PublishDecision::Publish(PublishReason::ContentChanged),
  }
}

enum Pending {
  Changed { previous: Option<ReleaseTag>, tag: ReleaseTag },
  Unchanged { previous: ReleaseTag, tag: ReleaseTag, commit: String },
}

struct PhaseOne {
  checks: Vec<TrackCheck>,
  tags: Vec<String>,
  pushed: bool,
  push_error: Option<String>,
}

pub struct Orchestrator<'a, B, P> {
  ctx: &'a ReleaseContext,
  ledger: &'a Ledger,
  builder: B,
  publisher: P,
  push: bool,
}

impl<'a, B: PackBuilder, P: Publisher> Orchestrator<'a, B, P> {
  pub fn new(ctx: &'a ReleaseContext, ledger: &'a Ledger, builder: B, publisher: P) -> Self {
    Self {
      ctx,
      ledger,
      builder,
      publisher,
      push: ctx.config.ledger.push,
    }
  }

  /// Override the configured push behaviour (`--no-push`)
  pub fn with_push(mut self, push: bool) -> Self {
    self.push = push;
    self
  }

  pub fn into_parts(self) -> (B, P) {
    (self.builder, self.publisher)
  }

  /// Run the phases `mode` selects over `tracks` (sorted in track order first)
  pub fn run(&mut self, mode: RunMode, tracks: &[Track]) -> ReleaseResult<RunReport> {
    let started_at = Utc::now();
    let mut tracks = tracks.to_vec();
    tracks.sort();
    tracks.dedup();

    let mut phase_one = PhaseOne {
      checks: Vec::new(),
      tags: Vec::new(),
      pushed: false,
      push_error: None,
    };
    let mut publishes = Vec::new();

    if mode.checks() {
      ui::phase_banner("PHASE 1: CHECK AND TAG");
      phase_one = self.check_and_tag(&tracks)?;
    }

    if mode.publishes() {
      let to_publish: Vec<Track> = if mode.checks() {
        phase_one
          .checks
          .iter()
          .filter(|c| !c.is_error())
          .map(|c| c.track.clone())
          .collect()
      } else {
        tracks
      };
      if !to_publish.is_empty() {
        if mode.checks() {
          // Phase 1 committed everything it kept; what is left is its build output
          self.ledger.git().clean_working_tree(&self.ctx.preserved_paths())?;
        } else {
          self.ledger.ensure_clean(&self.ctx.preserved_paths())?;
        }
        ui::phase_banner("PHASE 2: PUBLISH");
        publishes = self.publish(&to_publish)?;
      }
    }

    Ok(RunReport {
      mode,
      started_at,
      finished_at: Utc::now(),
      checks: phase_one.checks,
      publishes,
      tags: phase_one.tags,
      pushed: phase_one.pushed,
      push_error: phase_one.push_error,
    })
  }

  fn check_and_tag(&mut self, tracks: &[Track]) -> ReleaseResult<PhaseOne> {
    // An exhausted release number only fails the tracks that would start from it
    let first_release = match self.ledger.first_release(self.ctx.config.ledger.align_new_tracks) {
      Ok(release) => Ok(release),
      Err(ReleaseError::Ledger(LedgerError::ReleaseOverflow { release })) => Err(release),
      Err(e) => return Err(e),
    };
    let mut checks = Vec::new();
    let mut pending = Vec::new();

    for (index, track) in tracks.iter().enumerate() {
      ui::track_header(index + 1, tracks.len(), track);
      match self.check_track(track, &first_release) {
        Ok(p) => pending.push(p),
        Err(e) => {
          ui::track_error(track, &e);
          checks.push(TrackCheck {
            track: track.clone(),
            outcome: CheckOutcome::Error { message: e.to_string() },
          });
        }
      }
    }

    let changed: Vec<&ReleaseTag> = pending
      .iter()
      .filter_map(|p| match p {
        Pending::Changed { tag, .. } => Some(tag),
        Pending::Unchanged { .. } => None,
      })
      .collect();
    let tag_unchanged = self.ctx.config.ledger.tag_unchanged;

    let new_commit: Result<Option<String>, String> = if changed.is_empty() {
      Ok(None)
    } else {
      let names: Vec<String> = changed.iter().map(|t| t.name()).collect();
      let message = format!("Release {}", names.join(", "));
      self
        .ledger
        .commit_all(&message, &self.ctx.preserved_paths())
        .map(Some)
        .map_err(|e| e.to_string())
    };
    if let Ok(Some(commit)) = &new_commit {
      println!("\n✅ Committed changes as {}", short(commit));
    }

    let mut tags = Vec::new();
    for p in pending {
      let check = match p {
        Pending::Changed { previous, tag } => {
          let track = tag.track.clone();
          match &new_commit {
            Ok(Some(commit)) => match self.create_tag(&tag, "", commit) {
              Ok(()) => {
                tags.push(tag.clone());
                let outcome = match previous {
                  Some(previous) => CheckOutcome::Changed {
                    previous: previous.name(),
                    tag: tag.name(),
                    commit: commit.clone(),
                  },
                  None => CheckOutcome::New {
                    tag: tag.name(),
                    commit: commit.clone(),
                  },
                };
                TrackCheck { track, outcome }
              }
              Err(e) => error_check(track, &e),
            },
            Ok(None) => error_check(track, &ReleaseError::message("No commit was created for a changed track")),
            Err(message) => TrackCheck {
              track,
              outcome: CheckOutcome::Error {
                message: format!("Commit failed: {}", message),
              },
            },
          }
        }
        Pending::Unchanged { previous, tag, commit } => {
          let track = tag.track.clone();
          if !tag_unchanged {
            TrackCheck {
              track,
              outcome: CheckOutcome::Unchanged {
                previous: previous.name(),
                tag: None,
                commit,
              },
            }
          } else {
            let note = format!(" (no changes from {})", previous);
            match self.create_tag(&tag, &note, &commit) {
              Ok(()) => {
                tags.push(tag.clone());
                TrackCheck {
                  track,
                  outcome: CheckOutcome::Unchanged {
                    previous: previous.name(),
                    tag: Some(tag.name()),
                    commit,
                  },
                }
              }
              Err(e) => error_check(track, &e),
            }
          }
        }
      };
      checks.push(check);
    }
    checks.sort_by(|a, b| a.track.cmp(&b.track));

    let mut pushed = false;
    let mut push_error = None;
    if self.push && !tags.is_empty() {
      println!("\n📤 Pushing {} tag(s) to {}...", tags.len(), self.ledger.remote());
      match self.ledger.push(PushTarget::Tags(&tags)) {
        Ok(()) => {
          pushed = true;
          println!("✅ Pushed tags");
        }
        Err(e) => {
          ui::push_error(&e);
          push_error = Some(e.to_string());
        }
      }
    }

    Ok(PhaseOne {
      checks,
      tags: tags.iter().map(ReleaseTag::name).collect(),
      pushed,
      push_error,
    })
  }

  fn check_track(&mut self, track: &Track, first_release: &Result<ReleaseVersion, String>) -> ReleaseResult<Pending> {
    let previous = self.ledger.latest_tag(track)?;
    let release = match &previous {
      Some(p) => {
        println!("  ✓ Latest release: {}", p);
        p.release.increment().ok_or_else(|| LedgerError::ReleaseOverflow {
          release: p.release.to_string(),
        })?
      }
      None => {
        let first = first_release
          .clone()
          .map_err(|release| LedgerError::ReleaseOverflow { release })?;
        println!("  ! No release yet, starting at {}", first);
        first
      }
    };
    let tag = ReleaseTag::new(track.clone(), release);
    let config = TrackConfig::new(track.clone(), release);

    let snapshot = self.builder.install(&config)?;
    let detector = ChangeDetector::new(self.ledger, &self.ctx.config.pack);
    if detector.needs_release_since(previous.as_ref(), &snapshot) {
      println!("  ✓ Changes detected, will release {}", tag);
      self.persist(track, &snapshot)?;
      return Ok(Pending::Changed { previous, tag });
    }

    // needs_release_since is true whenever there is no previous tag
    let previous = previous.ok_or_else(|| ReleaseError::message("Unchanged track without a previous release"))?;
    let commit = self.ledger.commit_of(&previous)?;
    println!("  ⏭  No changes since {}", previous);
    Ok(Pending::Unchanged { previous, tag, commit })
  }

  /// Write the track's state file and README
  fn persist(&self, track: &Track, snapshot: &InstallationSnapshot) -> ReleaseResult<()> {
    let pack = &self.ctx.config.pack;
    let state_file = self.ctx.resolve(Path::new(&pack.state_file_for(track)));
    snapshot.save(&state_file)?;
    if let Some(readme) = &pack.readme {
      report::update_readme(
        &self.ctx.resolve(readme),
        &pack.readme_section,
        &self.ctx.config.items,
        snapshot,
      )?;
    }
    Ok(())
  }

  /// Create `tag` at `commit`; an identical existing tag counts as created
  fn create_tag(&self, tag: &ReleaseTag, note: &str, commit: &str) -> ReleaseResult<()> {
    if self.ledger.tag_exists(tag)? {
      let existing = self.ledger.commit_of(tag)?;
      if existing == commit {
        println!("  ⏭  Tag {} already exists at {}", tag, short(commit));
        return Ok(());
      }
      return Err(ReleaseError::Ledger(LedgerError::TagExists { tag: tag.name() }));
    }
    let message = format!("Release {} for {}{}", tag.release, tag.track, note);
    self.ledger.create(tag, &message, Some(commit))?;
    println!("  ✓ Created tag {} at {}{}", tag, short(commit), note);
    Ok(())
  }

  fn publish(&mut self, tracks: &[Track]) -> ReleaseResult<Vec<TrackPublish>> {
    let restore = self.ledger.restore_point(self.ctx.config.ledger.primary_branch.as_deref())?;
    let mut results = Vec::new();

    for (index, track) in tracks.iter().enumerate() {
      ui::track_header(index + 1, tracks.len(), track);
      let outcome = match self.publish_track(track, &restore) {
        Ok(outcome) => outcome,
        Err(e) => {
          ui::track_error(track, &e);
          PublishOutcome::Error { message: e.to_string() }
        }
      };
      results.push(TrackPublish {
        track: track.clone(),
        outcome,
      });
    }

    Ok(results)
  }

  fn publish_track(&mut self, track: &Track, restore: &str) -> ReleaseResult<PublishOutcome> {
    let Some(latest) = self.ledger.latest_tag(track)? else {
      println!("  ⏭  No release tag");
      return Ok(PublishOutcome::Skipped {
        reason: "No release tag".to_string(),
      });
    };

    let latest_commit = self.ledger.commit_of(&latest)?;
    let previous_commit = match latest.previous() {
      Some(previous) if self.ledger.tag_exists(&previous)? => Some(self.ledger.commit_of(&previous)?),
      _ => None,
    };

    let reason = match publish_decision(&latest, &latest_commit, previous_commit.as_deref()) {
      PublishDecision::Skip(reason) => {
        println!("  ⏭  {}", reason);
        return Ok(PublishOutcome::Skipped { reason });
      }
      PublishDecision::Publish(reason) => reason,
    };
    println!("  ✓ Publishing {} ({:?})", latest, reason);

    let _guard = self.ledger.checkout_tag(&latest, restore, &self.ctx.preserved_paths())?;
    let config = TrackConfig::new(track.clone(), latest.release);
    let output = self.builder.build(&config)?;

    let mut uploads = Vec::new();
    for artifact in &output.artifacts {
      let request = PublishRequest::for_artifact(&self.ctx.config.pack, &config, artifact);
      let outcome = self.publisher.publish(&request)?;
      match &outcome {
        UploadOutcome::Uploaded { id } => println!("  ✅ Uploaded {} ({})", request.version_number, id),
        UploadOutcome::Duplicate => println!("  ⏭  {} already published", request.version_number),
      }
      uploads.push(UploadRecord {
        variant: artifact.variant.clone(),
        version_number: request.version_number,
        outcome,
      });
    }

    Ok(PublishOutcome::Published {
      tag: latest.name(),
      reason,
      uploads,
    })
  }
}

fn error_check(track: Track, error: &ReleaseError) -> TrackCheck {
  ui::track_error(&track, error);
  TrackCheck {
    track,
    outcome: CheckOutcome::Error {
      message: error.to_string(),
    },
  }
}

fn short(commit: &str) -> &str {
  commit.get(..8).unwrap_or(commit)
}
