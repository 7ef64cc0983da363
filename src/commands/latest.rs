//! `pack-release latest <track>`

use crate::core::context::ReleaseContext;
use crate::core::error::{ExitCode, ReleaseResult};
use crate::release::track::Track;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct LatestRelease {
  track: Track,
  tag: Option<String>,
  commit: Option<String>,
}

pub fn run_latest(ctx: &ReleaseContext, track: &str, json: bool) -> ReleaseResult<ExitCode> {
  let ledger = ctx.open_ledger()?;
  let track = Track::new(track);

  let latest = match ledger.latest_tag(&track)? {
    Some(tag) => {
      let commit = ledger.commit_of(&tag)?;
      LatestRelease {
        track,
        tag: Some(tag.name()),
        commit: Some(commit),
      }
    }
    None => LatestRelease {
      track,
      tag: None,
      commit: None,
    },
  };

  if json {
    println!("{}", serde_json::to_string_pretty(&latest)?);
  } else if let (Some(tag), Some(commit)) = (&latest.tag, &latest.commit) {
    println!("{} {}", tag, commit);
  } else {
    println!("⚠️  No release for {}", latest.track);
  }
  Ok(ExitCode::Success)
}
