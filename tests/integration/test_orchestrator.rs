//! Both release phases end to end, with fake builder and publisher collaborators

use crate::helpers::{TestRepo, git};
use anyhow::Result;
use pack_release::build::{Artifact, BuildOutput, PackBuilder};
use pack_release::core::config::TrackConfig;
use pack_release::core::context::ReleaseContext;
use pack_release::core::error::{LedgerError, ReleaseError, ReleaseResult};
use pack_release::publish::{PublishRequest, Publisher, UploadOutcome};
use pack_release::release::ledger::Ledger;
use pack_release::release::orchestrator::{
  CheckOutcome, Orchestrator, PublishOutcome, PublishReason, RunMode, RunReport,
};
use pack_release::release::snapshot::{FailedRecord, InstallationSnapshot, ItemRecord};
use pack_release::release::track::Track;
use pretty_assertions::assert_eq;
use std::collections::{HashMap, HashSet};

fn installed(ids: &[&str]) -> InstallationSnapshot {
  InstallationSnapshot {
    successful: ids.iter().map(|id| ItemRecord::new(*id, "optimization")).collect(),
    failed: Vec::new(),
    alternative_installed: Vec::new(),
  }
}

#[derive(Default)]
struct FakeBuilder {
  snapshots: HashMap<String, InstallationSnapshot>,
  broken: HashSet<String>,
  installs: Vec<String>,
  builds: Vec<String>,
}

impl FakeBuilder {
  fn with(tracks: &[(&str, InstallationSnapshot)]) -> Self {
    Self {
      snapshots: tracks.iter().map(|(t, s)| (t.to_string(), s.clone())).collect(),
      ..Self::default()
    }
  }

  fn snapshot(&self, track: &TrackConfig) -> ReleaseResult<InstallationSnapshot> {
    if self.broken.contains(track.track.as_str()) {
      return Err(ReleaseError::message(format!("installer crashed on {}", track.track)));
    }
    Ok(self.snapshots.get(track.track.as_str()).cloned().unwrap_or_default())
  }
}

impl PackBuilder for FakeBuilder {
  fn install(&mut self, track: &TrackConfig) -> ReleaseResult<InstallationSnapshot> {
    self.installs.push(track.track.to_string());
    self.snapshot(track)
  }

  fn build(&mut self, track: &TrackConfig) -> ReleaseResult<BuildOutput> {
    self.builds.push(format!("{}@{}", track.track, track.release));
    let snapshot = self.snapshot(track)?;
    let artifacts = ["safe", "full"]
      .iter()
      .map(|variant| Artifact {
        variant: variant.to_string(),
        label: variant.to_string(),
        changelog: format!("{} build for {}", variant, track.track),
        path: format!("dist/{}_{}_{}.mrpack", track.track, track.release, variant).into(),
      })
      .collect();
    Ok(BuildOutput { snapshot, artifacts })
  }
}

#[derive(Default)]
struct FakePublisher {
  requests: Vec<PublishRequest>,
}

impl Publisher for FakePublisher {
  fn publish(&mut self, request: &PublishRequest) -> ReleaseResult<UploadOutcome> {
    self.requests.push(request.clone());
    Ok(UploadOutcome::Uploaded {
      id: format!("v{}", self.requests.len()),
    })
  }
}

fn tracks(names: &[&str]) -> Vec<Track> {
  names.iter().map(|n| Track::from(*n)).collect()
}

fn run(
  ctx: &ReleaseContext,
  mode: RunMode,
  builder: FakeBuilder,
  names: &[&str],
) -> Result<(RunReport, FakeBuilder, FakePublisher)> {
  let ledger = Ledger::open(&ctx.root, "origin")?;
  let mut orchestrator = Orchestrator::new(ctx, &ledger, builder, FakePublisher::default()).with_push(false);
  let report = orchestrator.run(mode, &tracks(names))?;
  let (builder, publisher) = orchestrator.into_parts();
  Ok((report, builder, publisher))
}

fn two_tracks() -> FakeBuilder {
  FakeBuilder::with(&[
    ("1.20.1", installed(&["sodium", "lithium"])),
    ("1.21", installed(&["sodium", "lithium"])),
  ])
}

#[test]
fn test_first_run_tags_and_publishes_every_track() -> Result<()> {
  let repo = TestRepo::new()?;
  let ctx = repo.context()?;

  let (report, builder, publisher) = run(&ctx, RunMode::CheckAndPublish, two_tracks(), &["1.21", "1.20.1"])?;

  assert!(!report.has_errors());
  assert_eq!(builder.installs, ["1.20.1", "1.21"]);
  assert_eq!(repo.tags()?, ["1.20.1_0.1.0", "1.21_0.1.0"]);

  let head = repo.head()?;
  assert_eq!(repo.tag_commit("1.20.1_0.1.0")?, head);
  assert_eq!(repo.tag_commit("1.21_0.1.0")?, head);
  assert!(matches!(report.checks[0].outcome, CheckOutcome::New { .. }));
  assert!(repo.path.join("release-state/1.20.1.json").exists());
  assert!(repo.path.join("release-state/1.21.json").exists());

  assert_eq!(builder.builds, ["1.20.1@0.1.0", "1.21@0.1.0"]);
  let versions: Vec<_> = publisher.requests.iter().map(|r| r.version_number.as_str()).collect();
  assert_eq!(
    versions,
    ["0.1.0_1.20.1_safe", "0.1.0_1.20.1_full", "0.1.0_1.21_safe", "0.1.0_1.21_full"]
  );
  for publish in &report.publishes {
    assert!(matches!(
      publish.outcome,
      PublishOutcome::Published {
        reason: PublishReason::FirstRelease,
        ..
      }
    ));
  }
  assert_eq!(repo.current_branch()?, "main");
  Ok(())
}

#[test]
fn test_unchanged_rerun_tags_previous_commit_and_publishes_nothing() -> Result<()> {
  let repo = TestRepo::new()?;
  let ctx = repo.context()?;
  run(&ctx, RunMode::CheckAndPublish, two_tracks(), &["1.20.1", "1.21"])?;
  let released = repo.head()?;

  let (report, _, publisher) = run(&ctx, RunMode::CheckAndPublish, two_tracks(), &["1.20.1", "1.21"])?;

  assert!(!report.has_errors());
  assert_eq!(repo.head()?, released, "no commit when nothing changed");
  assert_eq!(repo.tag_commit("1.20.1_0.1.1")?, released);
  assert_eq!(repo.tag_commit("1.21_0.1.1")?, released);
  assert_eq!(
    report.checks[0].outcome,
    CheckOutcome::Unchanged {
      previous: "1.20.1_0.1.0".into(),
      tag: Some("1.20.1_0.1.1".into()),
      commit: released.clone(),
    }
  );

  assert!(publisher.requests.is_empty());
  assert_eq!(
    report.publishes[0].outcome,
    PublishOutcome::Skipped {
      reason: "No changes from 1.20.1_0.1.0".into()
    }
  );
  Ok(())
}

#[test]
fn test_one_changed_track_gets_new_commit() -> Result<()> {
  let repo = TestRepo::new()?;
  let ctx = repo.context()?;
  run(&ctx, RunMode::CheckAndPublish, two_tracks(), &["1.20.1", "1.21"])?;
  let released = repo.head()?;

  let mut builder = two_tracks();
  builder.snapshots.insert(
    "1.21".into(),
    InstallationSnapshot {
      successful: vec![ItemRecord::new("sodium", "optimization")],
      failed: vec![FailedRecord {
        identifier: "lithium".into(),
        category: "optimization".into(),
        attempted_alternatives: Vec::new(),
      }],
      alternative_installed: Vec::new(),
    },
  );
  let (report, _, publisher) = run(&ctx, RunMode::CheckAndPublish, builder, &["1.20.1", "1.21"])?;

  assert!(!report.has_errors());
  let new_head = repo.head()?;
  assert_ne!(new_head, released);
  assert_eq!(repo.tag_commit("1.21_0.1.1")?, new_head);
  assert_eq!(repo.tag_commit("1.20.1_0.1.1")?, released);
  assert!(matches!(report.checks[1].outcome, CheckOutcome::Changed { .. }));

  let versions: Vec<_> = publisher.requests.iter().map(|r| r.version_number.as_str()).collect();
  assert_eq!(versions, ["0.1.1_1.21_safe", "0.1.1_1.21_full"]);
  assert!(matches!(
    report.publishes[1].outcome,
    PublishOutcome::Published {
      reason: PublishReason::ContentChanged,
      ..
    }
  ));
  Ok(())
}

#[test]
fn test_new_track_aligns_with_existing_releases() -> Result<()> {
  let repo = TestRepo::new()?;
  let ctx = repo.context()?;
  run(&ctx, RunMode::CheckAndPublish, two_tracks(), &["1.20.1", "1.21"])?;

  let mut builder = two_tracks();
  builder.snapshots.insert("1.21.1".into(), installed(&["sodium"]));
  let (report, _, publisher) = run(&ctx, RunMode::CheckAndPublish, builder, &["1.20.1", "1.21", "1.21.1"])?;

  assert!(repo.tags()?.contains(&"1.21.1_0.1.1".to_string()));
  assert!(matches!(report.checks[2].outcome, CheckOutcome::New { .. }));
  assert!(matches!(
    report.publishes[2].outcome,
    PublishOutcome::Published {
      reason: PublishReason::NoPreviousTag,
      ..
    }
  ));
  assert_eq!(publisher.requests.len(), 2);
  Ok(())
}

#[test]
fn test_failing_track_does_not_stop_others() -> Result<()> {
  let repo = TestRepo::new()?;
  let ctx = repo.context()?;
  let mut builder = two_tracks();
  builder.broken.insert("1.20.1".into());

  let (report, _, _) = run(&ctx, RunMode::CheckOnly, builder, &["1.20.1", "1.21"])?;

  assert!(report.has_errors());
  assert!(report.checks[0].is_error());
  assert!(matches!(report.checks[1].outcome, CheckOutcome::New { .. }));
  assert_eq!(repo.tags()?, ["1.21_0.1.0"]);
  assert!(report.publishes.is_empty());
  Ok(())
}

#[test]
fn test_nothing_changed_without_unchanged_tagging() -> Result<()> {
  let repo = TestRepo::new()?;
  let mut ctx = repo.context()?;
  run(&ctx, RunMode::CheckOnly, two_tracks(), &["1.20.1", "1.21"])?;

  ctx.config.ledger.tag_unchanged = false;
  let (report, _, _) = run(&ctx, RunMode::CheckOnly, two_tracks(), &["1.20.1", "1.21"])?;

  assert!(report.nothing_to_do());
  assert!(report.tags.is_empty());
  assert_eq!(repo.tags()?, ["1.20.1_0.1.0", "1.21_0.1.0"]);
  Ok(())
}

#[test]
fn test_publish_without_tags_skips() -> Result<()> {
  let repo = TestRepo::new()?;
  let ctx = repo.context()?;

  let (report, builder, publisher) = run(&ctx, RunMode::PublishOnly, two_tracks(), &["1.21"])?;

  assert!(!report.has_errors());
  assert!(report.checks.is_empty());
  assert!(builder.builds.is_empty());
  assert!(publisher.requests.is_empty());
  assert_eq!(
    report.publishes[0].outcome,
    PublishOutcome::Skipped {
      reason: "No release tag".into()
    }
  );
  Ok(())
}

#[test]
fn test_publish_refuses_dirty_tree_and_keeps_local_edits() -> Result<()> {
  let repo = TestRepo::new()?;
  let ctx = repo.context()?;
  run(&ctx, RunMode::CheckOnly, two_tracks(), &["1.21"])?;

  repo.write_file("pack.toml", "name = \"Edited Pack\"\n")?;
  repo.write_file("notes.txt", "local notes\n")?;

  let ledger = Ledger::open(&ctx.root, "origin")?;
  let mut orchestrator = Orchestrator::new(&ctx, &ledger, two_tracks(), FakePublisher::default()).with_push(false);
  let err = orchestrator.run(RunMode::PublishOnly, &tracks(&["1.21"])).unwrap_err();
  let (builder, publisher) = orchestrator.into_parts();

  let ReleaseError::Ledger(LedgerError::DirtyWorkingTree { paths }) = &err else {
    panic!("expected a dirty working tree error, got {:?}", err);
  };
  assert!(paths.iter().any(|p| p == "pack.toml"), "paths: {:?}", paths);
  assert!(paths.iter().any(|p| p == "notes.txt"), "paths: {:?}", paths);
  assert!(builder.builds.is_empty());
  assert!(publisher.requests.is_empty());

  assert_eq!(std::fs::read_to_string(repo.path.join("pack.toml"))?, "name = \"Edited Pack\"\n");
  assert!(repo.path.join("notes.txt").exists());
  assert_eq!(repo.current_branch()?, "main");
  Ok(())
}

#[test]
fn test_publish_ignores_artifacts_in_output_dir() -> Result<()> {
  let repo = TestRepo::new()?;
  let ctx = repo.context()?;
  run(&ctx, RunMode::CheckOnly, two_tracks(), &["1.21"])?;
  repo.write_file("dist/Test Pack-1.21_0.1.0_full.mrpack", "zip")?;

  let (report, _, publisher) = run(&ctx, RunMode::PublishOnly, two_tracks(), &["1.21"])?;

  assert!(!report.has_errors());
  assert_eq!(publisher.requests.len(), 2);
  assert!(repo.path.join("dist/Test Pack-1.21_0.1.0_full.mrpack").exists());
  Ok(())
}

#[test]
fn test_exhausted_release_number_fails_only_affected_tracks() -> Result<()> {
  let repo = TestRepo::new()?;
  let ctx = repo.context()?;
  git(&repo.path, &["tag", "1.21_0.1.18446744073709551615"])?;

  let (report, builder, _) = run(&ctx, RunMode::CheckOnly, two_tracks(), &["1.20.1", "1.21"])?;

  assert!(report.has_errors());
  for check in &report.checks {
    let CheckOutcome::Error { message } = &check.outcome else {
      panic!("expected {} to error, got {:?}", check.track, check.outcome);
    };
    assert!(message.contains("cannot be incremented"), "{}", message);
  }
  assert!(builder.installs.is_empty());
  assert_eq!(repo.tags()?, ["1.21_0.1.18446744073709551615"]);
  Ok(())
}

#[test]
fn test_exhausted_release_on_other_track_without_alignment() -> Result<()> {
  let repo = TestRepo::new()?;
  let mut ctx = repo.context()?;
  ctx.config.ledger.align_new_tracks = false;
  git(&repo.path, &["tag", "1.21_0.1.18446744073709551615"])?;

  let (report, _, _) = run(&ctx, RunMode::CheckOnly, two_tracks(), &["1.20.1", "1.21"])?;

  assert!(matches!(report.checks[0].outcome, CheckOutcome::New { .. }));
  assert!(report.checks[1].is_error());
  assert!(repo.tags()?.contains(&"1.20.1_0.1.0".to_string()));
  Ok(())
}
