//! Terminal output for release runs
//!
//! Progress lines go to stdout, errors to stderr. Machine-readable output
//! (`--json`) bypasses this module entirely.

use crate::core::error::ReleaseError;
use crate::release::orchestrator::{CheckOutcome, PublishOutcome, RunReport, TrackCheck, TrackPublish};
use crate::release::track::Track;

const RULE: &str = "════════════════════════════════════════";

pub fn phase_banner(title: &str) {
  println!();
  println!("{}", RULE);
  println!("{}", title);
  println!("{}", RULE);
}

pub fn track_header(index: usize, total: usize, track: &Track) {
  println!("\n📦 [{}/{}] {}", index, total, track);
}

pub fn track_error(track: &Track, error: &ReleaseError) {
  eprintln!("  ❌ {}: {}", track, error);
}

pub fn push_error(error: &ReleaseError) {
  eprintln!("❌ Failed to push tags: {}", error);
}

/// Per-phase counts
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Tally {
  pub primary: usize,
  pub secondary: usize,
  pub errors: usize,
}

/// New/changed, unchanged and errored phase 1 tracks
pub fn tally_checks(checks: &[TrackCheck]) -> Tally {
  let mut tally = Tally::default();
  for check in checks {
    match check.outcome {
      CheckOutcome::New { .. } | CheckOutcome::Changed { .. } => tally.primary += 1,
      CheckOutcome::Unchanged { .. } => tally.secondary += 1,
      CheckOutcome::Error { .. } => tally.errors += 1,
    }
  }
  tally
}

/// Published, skipped and errored phase 2 tracks
pub fn tally_publishes(publishes: &[TrackPublish]) -> Tally {
  let mut tally = Tally::default();
  for publish in publishes {
    match publish.outcome {
      PublishOutcome::Published { .. } => tally.primary += 1,
      PublishOutcome::Skipped { .. } => tally.secondary += 1,
      PublishOutcome::Error { .. } => tally.errors += 1,
    }
  }
  tally
}

pub fn print_report(report: &RunReport) {
  if !report.checks.is_empty() {
    let tally = tally_checks(&report.checks);
    phase_banner("CHECK SUMMARY");
    println!("  Changed:   {}", tally.primary);
    println!("  Unchanged: {}", tally.secondary);
    println!("  Errors:    {}", tally.errors);
    for check in &report.checks {
      match &check.outcome {
        CheckOutcome::New { tag, .. } => println!("  ✨ {} -> {} (new)", check.track, tag),
        CheckOutcome::Changed { previous, tag, .. } => println!("  ✅ {} -> {} (was {})", check.track, tag, previous),
        CheckOutcome::Unchanged { previous, tag: Some(tag), .. } => {
          println!("  ⏭  {} -> {} (same content as {})", check.track, tag, previous)
        }
        CheckOutcome::Unchanged { previous, tag: None, .. } => {
          println!("  ⏭  {} unchanged since {}", check.track, previous)
        }
        CheckOutcome::Error { .. } => {}
      }
    }
    if report.nothing_to_do() {
      println!("\n✅ Nothing to release");
    } else if report.pushed {
      println!("\n📤 Pushed {} tag(s)", report.tags.len());
    } else if !report.tags.is_empty() && report.push_error.is_none() {
      println!("\n🏷  Created {} tag(s) locally (not pushed)", report.tags.len());
    }
  }

  if !report.publishes.is_empty() {
    let tally = tally_publishes(&report.publishes);
    phase_banner("PUBLISH SUMMARY");
    println!("  Published: {}", tally.primary);
    println!("  Skipped:   {}", tally.secondary);
    println!("  Errors:    {}", tally.errors);
    for publish in &report.publishes {
      match &publish.outcome {
        PublishOutcome::Published { tag, uploads, .. } => {
          println!("  ✅ {} ({} file(s))", tag, uploads.len());
        }
        PublishOutcome::Skipped { reason } => println!("  ⏭  {}: {}", publish.track, reason),
        PublishOutcome::Error { .. } => {}
      }
    }
  }

  print_errors(report);
}

fn print_errors(report: &RunReport) {
  let check_errors = report.checks.iter().filter_map(|c| match &c.outcome {
    CheckOutcome::Error { message } => Some((&c.track, message)),
    _ => None,
  });
  let publish_errors = report.publishes.iter().filter_map(|p| match &p.outcome {
    PublishOutcome::Error { message } => Some((&p.track, message)),
    _ => None,
  });
  let errors: Vec<_> = check_errors.chain(publish_errors).collect();
  if errors.is_empty() && report.push_error.is_none() {
    return;
  }

  eprintln!();
  eprintln!("ERRORS:");
  for (track, message) in errors {
    eprintln!("  ❌ {}: {}", track, message);
  }
  if let Some(message) = &report.push_error {
    eprintln!("  ❌ push: {}", message);
  }
}
