//! `pack-release tracks`

use crate::catalog::Catalog;
use crate::core::context::ReleaseContext;
use crate::core::error::{ExitCode, ReleaseResult};
use crate::core::http::HttpClient;

pub fn run_tracks(ctx: &ReleaseContext, json: bool) -> ReleaseResult<ExitCode> {
  let http = HttpClient::new(ctx.retry_policy())?;
  let tracks = Catalog::new(&http, &ctx.config.catalog).list_valid_tracks()?;

  if json {
    println!("{}", serde_json::to_string_pretty(&tracks)?);
    return Ok(ExitCode::Success);
  }

  if tracks.is_empty() {
    println!("⚠️  The catalog lists no valid tracks");
    return Ok(ExitCode::Success);
  }
  println!("🎯 {} track(s):", tracks.len());
  for track in &tracks {
    println!("  {}", track);
  }
  Ok(ExitCode::Success)
}
