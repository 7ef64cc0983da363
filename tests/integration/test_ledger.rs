//! Tag ledger against a real git repository

use crate::helpers::{TestRemote, TestRepo};
use anyhow::Result;
use pack_release::core::error::{LedgerError, NetworkError, ReleaseError};
use pack_release::release::detector::ChangeDetector;
use pack_release::release::ledger::{Ledger, PushTarget};
use pack_release::release::snapshot::{InstallationSnapshot, ItemRecord};
use pack_release::release::tag::ReleaseTag;
use pack_release::release::track::Track;
use pack_release::release::version::ReleaseVersion;
use std::path::Path;

fn tag(name: &str) -> ReleaseTag {
  ReleaseTag::parse(name).unwrap()
}

#[test]
fn test_latest_tag_compares_numerically() -> Result<()> {
  let repo = TestRepo::new()?;
  let ledger = Ledger::open(&repo.path, "origin")?;

  for name in ["1.21_0.1.9", "1.21_0.1.10", "1.21.1_0.2.0"] {
    ledger.create(&tag(name), "release", None)?;
  }
  repo.lightweight_tag("v1.0")?;
  repo.lightweight_tag("1.21_latest")?;

  let latest = ledger.latest_tag(&Track::from("1.21"))?;
  assert_eq!(latest, Some(tag("1.21_0.1.10")));
  assert_eq!(ledger.latest_tag(&Track::from("1.20.1"))?, None);
  assert_eq!(ledger.release_tags()?.len(), 3);
  Ok(())
}

#[test]
fn test_first_release_aligns_with_highest_global() -> Result<()> {
  let repo = TestRepo::new()?;
  let ledger = Ledger::open(&repo.path, "origin")?;

  assert_eq!(ledger.highest_global_release()?, ReleaseVersion::ZERO);
  assert_eq!(ledger.first_release(true)?, ReleaseVersion::INITIAL);

  ledger.create(&tag("1.20.1_0.1.0"), "release", None)?;
  ledger.create(&tag("1.21_0.1.3"), "release", None)?;

  assert_eq!(ledger.highest_global_release()?, ReleaseVersion::new(0, 1, 3));
  assert_eq!(ledger.first_release(true)?, ReleaseVersion::new(0, 1, 4));
  assert_eq!(ledger.first_release(false)?, ReleaseVersion::INITIAL);
  Ok(())
}

#[test]
fn test_create_at_explicit_commit() -> Result<()> {
  let repo = TestRepo::new()?;
  let first = repo.head()?;
  repo.write_file("mods/sodium.pw.toml", "name = \"Sodium\"\n")?;
  let second = repo.commit("Add sodium")?;
  let ledger = Ledger::open(&repo.path, "origin")?;

  ledger.create(&tag("1.21_0.1.0"), "first", Some(&first))?;
  ledger.create(&tag("1.21_0.1.1"), "second", None)?;

  assert_eq!(ledger.commit_of(&tag("1.21_0.1.0"))?, first);
  assert_eq!(ledger.commit_of(&tag("1.21_0.1.1"))?, second);
  assert_eq!(repo.tag_commit("1.21_0.1.0")?, first);
  Ok(())
}

#[test]
fn test_read_file_at_tag_without_checkout() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_file("release-state/1.21.json", "{\"v\":1}\n")?;
  repo.commit("State v1")?;
  let ledger = Ledger::open(&repo.path, "origin")?;
  ledger.create(&tag("1.21_0.1.0"), "release", None)?;

  repo.write_file("release-state/1.21.json", "{\"v\":2}\n")?;
  repo.commit("State v2")?;

  let old = ledger.read_file_at(&tag("1.21_0.1.0"), Path::new("release-state/1.21.json"))?;
  assert_eq!(String::from_utf8(old)?, "{\"v\":1}\n");
  assert_eq!(repo.current_branch()?, "main");

  let missing = ledger.read_file_at(&tag("1.21_0.1.0"), Path::new("release-state/1.20.json"));
  assert!(matches!(
    missing,
    Err(ReleaseError::Ledger(LedgerError::FileNotFound { .. }))
  ));
  Ok(())
}

#[test]
fn test_duplicate_tag_is_rejected() -> Result<()> {
  let repo = TestRepo::new()?;
  let ledger = Ledger::open(&repo.path, "origin")?;
  ledger.create(&tag("1.21_0.1.0"), "release", None)?;

  let err = ledger.create(&tag("1.21_0.1.0"), "again", None).unwrap_err();
  assert!(matches!(err, ReleaseError::Ledger(LedgerError::TagExists { .. })));
  assert!(ledger.tag_exists(&tag("1.21_0.1.0"))?);
  assert!(!ledger.tag_exists(&tag("1.21_0.1.1"))?);
  Ok(())
}

#[test]
fn test_commit_all_excludes_preserved_paths() -> Result<()> {
  let repo = TestRepo::new()?;
  let ledger = Ledger::open(&repo.path, "origin")?;
  repo.write_file("release-state/1.21.json", "{}\n")?;
  repo.write_file("dist/Test Pack-1.21_0.1.0_full.mrpack", "zip")?;

  let commit = ledger.commit_all("Release 1.21_0.1.0", &["dist/".to_string()])?;
  assert_eq!(commit, repo.head()?);

  let committed = crate::helpers::git(&repo.path, &["ls-tree", "-r", "--name-only", "HEAD"])?;
  let committed = String::from_utf8_lossy(&committed.stdout);
  assert!(committed.contains("release-state/1.21.json"));
  assert!(!committed.contains("dist/"));
  assert!(repo.path.join("dist/Test Pack-1.21_0.1.0_full.mrpack").exists());
  Ok(())
}

#[test]
fn test_push_selected_and_all_tags() -> Result<()> {
  let repo = TestRepo::new()?;
  let remote = TestRemote::attach(&repo)?;
  let ledger = Ledger::open(&repo.path, "origin")?;
  let first = tag("1.21_0.1.0");
  let second = tag("1.20.1_0.1.0");
  ledger.create(&first, "release", None)?;
  ledger.create(&second, "release", None)?;

  ledger.push(PushTarget::Tags(std::slice::from_ref(&first)))?;
  assert_eq!(remote.tags()?, ["1.21_0.1.0"]);

  ledger.push(PushTarget::AllTags)?;
  assert_eq!(remote.tags()?, ["1.20.1_0.1.0", "1.21_0.1.0"]);
  Ok(())
}

#[test]
fn test_push_without_remote_is_network_error() -> Result<()> {
  let repo = TestRepo::new()?;
  let ledger = Ledger::open(&repo.path, "origin")?;
  let release = tag("1.21_0.1.0");
  ledger.create(&release, "release", None)?;

  let err = ledger.push(PushTarget::Tags(std::slice::from_ref(&release))).unwrap_err();
  assert!(matches!(err, ReleaseError::Network(NetworkError::PushFailed { .. })));
  Ok(())
}

#[test]
fn test_detector_compares_against_latest_tag() -> Result<()> {
  let repo = TestRepo::new()?;
  let ctx = repo.context()?;
  let ledger = Ledger::open(&repo.path, "origin")?;
  let detector = ChangeDetector::new(&ledger, &ctx.config.pack);
  let track = Track::from("1.21");

  let mut current = InstallationSnapshot::default();
  current.successful.push(ItemRecord::new("sodium", "optimization"));
  assert!(detector.needs_release(&track, &current)?, "new track");

  current.save(&repo.path.join("release-state/1.21.json"))?;
  repo.commit("State")?;
  ledger.create(&tag("1.21_0.1.0"), "release", None)?;
  assert!(!detector.needs_release(&track, &current)?);

  current.successful.push(ItemRecord::new("lithium", "optimization"));
  assert!(detector.needs_release(&track, &current)?);

  // Unreadable record fails open
  repo.write_file("release-state/1.21.json", "not json")?;
  repo.commit("Corrupt state")?;
  ledger.create(&tag("1.21_0.1.1"), "release", None)?;
  current.successful.pop();
  assert!(detector.needs_release(&track, &current)?);
  Ok(())
}
