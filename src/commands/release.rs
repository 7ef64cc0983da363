//! `pack-release check | publish | run`

use super::resolve_tracks;
use crate::build::PackwizBuilder;
use crate::catalog::Catalog;
use crate::core::context::ReleaseContext;
use crate::core::error::{ExitCode, ReleaseResult};
use crate::core::http::HttpClient;
use crate::publish::ModrinthPublisher;
use crate::release::orchestrator::{Orchestrator, RunMode};
use crate::ui;

/// Options shared by the three release commands
#[derive(Debug, Clone, Default)]
pub struct ReleaseOptions {
  pub tracks: Vec<String>,
  pub no_push: bool,
  pub json: bool,
}

pub fn run_release(ctx: &ReleaseContext, mode: RunMode, options: &ReleaseOptions) -> ReleaseResult<ExitCode> {
  let http = HttpClient::new(ctx.retry_policy())?;
  let ledger = ctx.open_ledger()?;

  if mode != RunMode::PublishOnly {
    Catalog::new(&http, &ctx.config.catalog).preflight()?;
  }
  let tracks = resolve_tracks(ctx, &http, &options.tracks)?;
  if tracks.is_empty() {
    println!("⚠️  No tracks to process");
    return Ok(ExitCode::Success);
  }

  if !options.json {
    println!(
      "🚀 {} for {} track(s): {}",
      ctx.config.pack.display_title(),
      tracks.len(),
      tracks.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
    );
  }

  let builder = PackwizBuilder::new(ctx);
  let publisher = ModrinthPublisher::new(&http, &ctx.config.upload);
  let push = ctx.config.ledger.push && !options.no_push;
  let mut orchestrator = Orchestrator::new(ctx, &ledger, builder, publisher).with_push(push);
  let report = orchestrator.run(mode, &tracks)?;

  if options.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    ui::print_report(&report);
  }

  Ok(if report.has_errors() {
    ExitCode::Failure
  } else {
    ExitCode::Success
  })
}
