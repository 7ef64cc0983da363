//! packwiz subprocess builder
//!
//! Each variant is installed from scratch: migrate to the track, empty the
//! content directories, add every included item (falling back through its
//! alternatives in order), then export and rename the `.mrpack`.

use super::{Artifact, BuildOutput, PackBuilder};
use crate::core::config::{ItemConfig, TrackConfig, VariantConfig};
use crate::core::context::ReleaseContext;
use crate::core::error::{ArtifactError, ReleaseError, ReleaseResult, ResultExt};
use crate::release::snapshot::{
  AlternativeAttempt, AlternativeOutcome, AlternativeRecord, FailedRecord, InstallationSnapshot, ItemOutcome,
  ItemRecord,
};
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::LazyLock;

/// packwiz's "exported to <file>.mrpack" line
static EXPORT_LINE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)to\s+(.+\.mrpack)").expect("export regex is valid"));

pub struct PackwizBuilder<'a> {
  ctx: &'a ReleaseContext,
}

impl<'a> PackwizBuilder<'a> {
  pub fn new(ctx: &'a ReleaseContext) -> Self {
    Self { ctx }
  }

  fn command(&self, args: &[&str]) -> Command {
    let mut cmd = Command::new(&self.ctx.config.installer.program);
    cmd.args(args).current_dir(&self.ctx.root);
    cmd
  }

  fn describe(&self, args: &[&str]) -> String {
    format!("{} {}", self.ctx.config.installer.program, args.join(" "))
  }

  /// Run the installer, failing on a non-zero exit
  fn run(&self, args: &[&str]) -> ReleaseResult<String> {
    tracing::debug!("{}", self.describe(args));
    let output = self.command(args).output().map_err(|e| ArtifactError::InstallerFailed {
      command: self.describe(args),
      stderr: e.to_string(),
    })?;
    if !output.status.success() {
      return Err(ReleaseError::Artifact(ArtifactError::InstallerFailed {
        command: self.describe(args),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }

  fn try_add(&self, identifier: &str) -> bool {
    match self.run(&["modrinth", "add", identifier, "-y"]) {
      Ok(_) => true,
      Err(e) => {
        tracing::debug!("install of {} failed: {}", identifier, e);
        false
      }
    }
  }

  fn clear_content(&self) -> ReleaseResult<()> {
    for dir in &self.ctx.config.installer.content_dirs {
      let path = self.ctx.resolve(dir);
      if path.exists() {
        fs::remove_dir_all(&path).with_context(|| format!("Failed to clear {}", path.display()))?;
      }
      fs::create_dir_all(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    }
    self.run(&["refresh"])?;
    Ok(())
  }

  fn install_variant(&self, track: &TrackConfig, variant: &VariantConfig) -> ReleaseResult<InstallationSnapshot> {
    println!("  🔧 Installing {} variant for {}", variant.name, track.track);
    self.run(&["migrate", "minecraft", track.track.as_str(), "-y"])?;
    self.clear_content()?;

    let mut snapshot = InstallationSnapshot::default();
    for item in self.ctx.config.items.iter().filter(|i| variant.includes(i)) {
      let outcome = install_with_fallback(item, |id| self.try_add(id));
      match &outcome {
        ItemOutcome::Installed(_) => {}
        ItemOutcome::ViaAlternative(r) => {
          println!("     ↪ {} via {}", r.identifier, r.installed_alternative.identifier)
        }
        ItemOutcome::Failed(r) => println!("     ⚠️  {} failed to install", r.identifier),
      }
      snapshot.record(outcome);
    }
    println!(
      "     {} installed, {} via alternative, {} failed",
      snapshot.successful.len(),
      snapshot.alternative_installed.len(),
      snapshot.failed.len()
    );
    Ok(snapshot)
  }

  fn export(&self, track: &TrackConfig, variant: &VariantConfig) -> ReleaseResult<PathBuf> {
    let stdout = self.run(&["modrinth", "export"])?;
    let produced = parse_export_output(&stdout).ok_or_else(|| ArtifactError::ExportMissing { output: stdout.clone() })?;
    let source = self.ctx.root.join(&produced);
    if !source.exists() {
      return Err(ReleaseError::Artifact(ArtifactError::ExportMissing { output: stdout }));
    }

    let relative = self.ctx.config.pack.artifact_path(track, &variant.name);
    let dest = self.ctx.resolve(&relative);
    if let Some(parent) = dest.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::rename(&source, &dest)
      .with_context(|| format!("Failed to move {} to {}", source.display(), dest.display()))?;
    println!("  📦 Exported {}", relative.display());
    Ok(dest)
  }
}

impl PackBuilder for PackwizBuilder<'_> {
  fn install(&mut self, track: &TrackConfig) -> ReleaseResult<InstallationSnapshot> {
    let primary = self
      .ctx
      .config
      .primary_variant()
      .ok_or_else(|| ReleaseError::message("Primary variant missing from configuration"))?;
    self.install_variant(track, primary)
  }

  fn build(&mut self, track: &TrackConfig) -> ReleaseResult<BuildOutput> {
    let mut artifacts = Vec::new();
    let mut primary_snapshot = None;

    for variant in self.ctx.config.variants_in_build_order() {
      let snapshot = self.install_variant(track, variant)?;
      let path = self.export(track, variant)?;
      artifacts.push(Artifact {
        variant: variant.name.clone(),
        label: variant.display_label().to_string(),
        changelog: variant.changelog_for(&track.track),
        path,
      });
      if variant.name == self.ctx.config.pack.primary_variant {
        primary_snapshot = Some(snapshot);
      }
    }

    let snapshot =
      primary_snapshot.ok_or_else(|| ReleaseError::message("Primary variant missing from configuration"))?;
    Ok(BuildOutput { snapshot, artifacts })
  }
}

/// Install an item, trying alternatives in order until one succeeds
///
/// Alternatives after the successful one are recorded as not attempted.
pub fn install_with_fallback(item: &ItemConfig, mut try_install: impl FnMut(&str) -> bool) -> ItemOutcome {
  if try_install(&item.identifier) {
    return ItemOutcome::Installed(ItemRecord::new(item.identifier.as_str(), item.category.as_str()));
  }

  let mut attempts = Vec::new();
  let mut installed: Option<ItemRecord> = None;
  for alt in &item.alternatives {
    let category = item.alternative_category(alt).to_string();
    if installed.is_some() {
      attempts.push(AlternativeAttempt {
        identifier: alt.identifier.clone(),
        category,
        outcome: AlternativeOutcome::NotAttempted,
      });
      continue;
    }
    if try_install(&alt.identifier) {
      installed = Some(ItemRecord::new(alt.identifier.as_str(), category));
    } else {
      attempts.push(AlternativeAttempt {
        identifier: alt.identifier.clone(),
        category,
        outcome: AlternativeOutcome::TriedAndFailed,
      });
    }
  }

  match installed {
    Some(installed_alternative) => ItemOutcome::ViaAlternative(AlternativeRecord {
      identifier: item.identifier.clone(),
      category: item.category.clone(),
      installed_alternative,
      attempted_alternatives: attempts,
    }),
    None => ItemOutcome::Failed(FailedRecord {
      identifier: item.identifier.clone(),
      category: item.category.clone(),
      attempted_alternatives: attempts,
    }),
  }
}

/// File named in packwiz's "exported to <file>.mrpack" line
pub fn parse_export_output(stdout: &str) -> Option<PathBuf> {
  let captures = EXPORT_LINE.captures(stdout)?;
  Some(PathBuf::from(captures.get(1)?.as_str().trim()))
}
