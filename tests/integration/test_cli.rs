//! The compiled binary: exit codes and plain output

use crate::helpers::{MINIMAL_CONFIG, TestRepo, git, run_pack_release};
use anyhow::Result;

#[test]
fn test_publish_single_track_without_tags_exits_zero() -> Result<()> {
  let repo = TestRepo::new()?;

  let output = run_pack_release(&repo.path, &["publish", "--track", "1.21.10"])?;

  assert!(
    output.status.success(),
    "stderr: {}",
    String::from_utf8_lossy(&output.stderr)
  );
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("No release tag"));
  Ok(())
}

#[test]
fn test_latest_prints_tag_and_commit() -> Result<()> {
  let repo = TestRepo::new()?;
  let head = repo.head()?;
  git(&repo.path, &["tag", "-a", "1.21_0.1.4", "-m", "release"])?;
  git(&repo.path, &["tag", "-a", "1.21_0.1.10", "-m", "release"])?;

  let output = run_pack_release(&repo.path, &["latest", "1.21"])?;

  assert!(output.status.success());
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert_eq!(stdout.trim(), format!("1.21_0.1.10 {}", head));
  Ok(())
}

#[test]
fn test_latest_json_without_release() -> Result<()> {
  let repo = TestRepo::new()?;

  let output = run_pack_release(&repo.path, &["latest", "1.20.1", "--json"])?;

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(json["track"], "1.20.1");
  assert!(json["tag"].is_null());
  Ok(())
}

#[test]
fn test_missing_config_exits_with_failure() -> Result<()> {
  let dir = tempfile::TempDir::new()?;

  let output = run_pack_release(dir.path(), &["latest", "1.21"])?;

  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("release.toml"), "stderr: {}", stderr);
  Ok(())
}

#[test]
fn test_failed_track_exits_one_with_error_summary() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_file("release.toml", &format!("{}\n[installer]\nprogram = \"false\"\n", MINIMAL_CONFIG))?;
  repo.commit("Use a failing installer")?;

  let output = run_pack_release(&repo.path, &["check", "--track", "1.21", "--no-push"])?;

  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("ERRORS:"), "stderr: {}", stderr);
  assert!(stderr.contains("1.21:"), "stderr: {}", stderr);
  assert!(repo.tags()?.is_empty());
  Ok(())
}

#[test]
fn test_publish_with_local_edits_exits_without_touching_them() -> Result<()> {
  let repo = TestRepo::new()?;
  git(&repo.path, &["tag", "-a", "1.21_0.1.0", "-m", "release"])?;
  repo.write_file("notes.txt", "keep me\n")?;

  let output = run_pack_release(&repo.path, &["publish", "--track", "1.21"])?;

  assert_eq!(output.status.code(), Some(2));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("uncommitted changes"), "stderr: {}", stderr);
  assert!(stderr.contains("notes.txt"), "stderr: {}", stderr);
  assert_eq!(repo.read_file("notes.txt")?, "keep me\n");
  Ok(())
}
