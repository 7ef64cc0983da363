use clap::{Parser, Subcommand};
use pack_release::commands::{self, release::ReleaseOptions};
use pack_release::core::context::ReleaseContext;
use pack_release::core::error::{ExitCode, ReleaseError, print_error};
use pack_release::release::orchestrator::RunMode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tag, diff and publish multi-track content packs
#[derive(Parser)]
#[command(name = "pack-release")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Path to release.toml (default: search from the current directory)
  #[arg(long, global = true, env = "PACK_RELEASE_CONFIG")]
  config: Option<PathBuf>,

  /// Log level for diagnostics on stderr (RUST_LOG takes precedence)
  #[arg(long, global = true, default_value = "info")]
  log_level: String,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List valid tracks from the version catalog
  Tracks {
    /// Output tracks in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Phase 1: build every track, detect changes and tag releases
  Check {
    /// Process only these tracks (skips the catalog)
    #[arg(long = "track")]
    tracks: Vec<String>,
    /// Create tags locally without pushing them
    #[arg(long)]
    no_push: bool,
    /// Output the run report in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Phase 2: publish the latest tag of every track that needs it
  Publish {
    /// Process only these tracks (skips the catalog)
    #[arg(long = "track")]
    tracks: Vec<String>,
    /// Output the run report in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Phase 1 followed by phase 2
  Run {
    /// Process only these tracks (skips the catalog)
    #[arg(long = "track")]
    tracks: Vec<String>,
    /// Create tags locally without pushing them
    #[arg(long)]
    no_push: bool,
    /// Output the run report in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Show the latest release tag of a track and its commit
  Latest {
    /// Track name, e.g. 1.21.10
    track: String,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  let yellow = Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow));
  let green = Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green));
  let red = Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red));
  clap::builder::Styles::styled()
    .usage(anstyle::Style::new().bold().underline().fg_color(yellow))
    .header(anstyle::Style::new().bold().underline().fg_color(yellow))
    .literal(anstyle::Style::new().fg_color(green))
    .invalid(anstyle::Style::new().bold().fg_color(red))
    .error(anstyle::Style::new().bold().fg_color(red))
    .valid(anstyle::Style::new().bold().underline().fg_color(green))
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Diagnostics go to stderr so stdout stays clean for `--json`
fn init_logging(level: &str) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_logging(&cli.log_level);

  let root = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => handle_error(ReleaseError::from(e).context("Failed to get current directory")),
  };

  let ctx = match ReleaseContext::build(&root, cli.config.as_deref()) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };
  tracing::debug!("loaded configuration for {}", ctx.config.pack.name);

  let result = match cli.command {
    Commands::Tracks { json } => commands::run_tracks(&ctx, json),
    Commands::Check { tracks, no_push, json } => commands::run_release(
      &ctx,
      RunMode::CheckOnly,
      &ReleaseOptions { tracks, no_push, json },
    ),
    Commands::Publish { tracks, json } => commands::run_release(
      &ctx,
      RunMode::PublishOnly,
      &ReleaseOptions {
        tracks,
        no_push: true,
        json,
      },
    ),
    Commands::Run { tracks, no_push, json } => commands::run_release(
      &ctx,
      RunMode::CheckAndPublish,
      &ReleaseOptions { tracks, no_push, json },
    ),
    Commands::Latest { track, json } => commands::run_latest(&ctx, &track, json),
  };

  match result {
    Ok(ExitCode::Success) => {}
    Ok(code) => std::process::exit(code.as_i32()),
    Err(err) => handle_error(err),
  }
}

fn handle_error(err: ReleaseError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
