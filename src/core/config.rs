use crate::core::error::{ConfigError, ReleaseError, ReleaseResult, ResultExt};
use crate::release::track::Track;
use crate::release::version::ReleaseVersion;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for pack-release
/// Searched in order: release.toml, .release.toml, .config/release.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
  pub pack: PackConfig,
  #[serde(default)]
  pub catalog: CatalogConfig,
  #[serde(default)]
  pub ledger: LedgerConfig,
  #[serde(default)]
  pub installer: InstallerConfig,
  #[serde(default)]
  pub upload: UploadConfig,
  #[serde(default)]
  pub retry: RetryConfig,
  #[serde(default = "default_variants")]
  pub variants: Vec<VariantConfig>,
  #[serde(default)]
  pub items: Vec<ItemConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackConfig {
  /// Pack name, used in artifact file names
  pub name: String,

  /// Display title for uploads (default: name)
  #[serde(default)]
  pub title: Option<String>,

  /// Per-track snapshot file, relative to the repository root. Must contain `{track}`.
  #[serde(default = "default_state_file")]
  pub state_file: String,

  /// Directory that receives exported artifacts
  #[serde(default = "default_output_dir")]
  pub output_dir: PathBuf,

  /// README rewritten with the item list after each build
  #[serde(default)]
  pub readme: Option<PathBuf>,

  /// Heading after which the README item list is written
  #[serde(default = "default_readme_section")]
  pub readme_section: String,

  /// Variant whose snapshot is the record of truth for change detection
  #[serde(default = "default_primary_variant")]
  pub primary_variant: String,
}

fn default_state_file() -> String {
  "release-state/{track}.json".to_string()
}

fn default_output_dir() -> PathBuf {
  PathBuf::from("dist")
}

fn default_readme_section() -> String {
  "## Mod List".to_string()
}

fn default_primary_variant() -> String {
  "full".to_string()
}

impl PackConfig {
  pub fn display_title(&self) -> &str {
    self.title.as_deref().unwrap_or(&self.name)
  }

  /// State file path for a track (relative to the repository root)
  pub fn state_file_for(&self, track: &Track) -> String {
    self.state_file.replace("{track}", track.as_str())
  }

  /// `{output_dir}/{name}-{track}_{release}_{variant}.mrpack`
  pub fn artifact_path(&self, track: &TrackConfig, variant: &str) -> PathBuf {
    self.output_dir.join(format!(
      "{}-{}_{}_{}.mrpack",
      self.name, track.track, track.release, variant
    ))
  }
}

/// Remote catalog of tracks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
  #[serde(default = "default_catalog_url")]
  pub url: String,

  /// Only entries of this type are considered
  #[serde(default = "default_release_type")]
  pub release_type: String,

  /// Probed once before any build when set
  #[serde(default)]
  pub preflight_url: Option<String>,
}

fn default_catalog_url() -> String {
  "https://api.modrinth.com/v2/tag/game_version".to_string()
}

fn default_release_type() -> String {
  "release".to_string()
}

impl Default for CatalogConfig {
  fn default() -> Self {
    Self {
      url: default_catalog_url(),
      release_type: default_release_type(),
      preflight_url: None,
    }
  }
}

/// Tag ledger behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
  /// Remote that receives tags (default: "origin")
  #[serde(default = "default_remote")]
  pub remote: String,

  /// Branch restored after checkout-based operations (default: branch checked out at start)
  #[serde(default)]
  pub primary_branch: Option<String>,

  /// Push created tags at the end of phase 1
  #[serde(default = "default_true")]
  pub push: bool,

  /// Start new tracks at the highest release already in the ledger
  #[serde(default = "default_true")]
  pub align_new_tracks: bool,

  /// Mint a tag at the previous commit for tracks that did not change
  #[serde(default = "default_true")]
  pub tag_unchanged: bool,
}

fn default_remote() -> String {
  "origin".to_string()
}

fn default_true() -> bool {
  true
}

impl Default for LedgerConfig {
  fn default() -> Self {
    Self {
      remote: default_remote(),
      primary_branch: None,
      push: true,
      align_new_tracks: true,
      tag_unchanged: true,
    }
  }
}

/// Content installer subprocess
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerConfig {
  #[serde(default = "default_installer_program")]
  pub program: String,

  /// Directories emptied before each variant is installed
  #[serde(default = "default_content_dirs")]
  pub content_dirs: Vec<PathBuf>,
}

fn default_installer_program() -> String {
  "packwiz".to_string()
}

fn default_content_dirs() -> Vec<PathBuf> {
  vec![PathBuf::from("mods"), PathBuf::from("resourcepacks")]
}

impl Default for InstallerConfig {
  fn default() -> Self {
    Self {
      program: default_installer_program(),
      content_dirs: default_content_dirs(),
    }
  }
}

/// Upload service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
  #[serde(default = "default_api_url")]
  pub api_url: String,

  /// Required for publishing, not for checking
  #[serde(default)]
  pub project_id: Option<String>,

  /// Environment variable holding the API token, read at publish time
  #[serde(default = "default_token_env")]
  pub token_env: String,

  #[serde(default = "default_loaders")]
  pub loaders: Vec<String>,

  #[serde(default = "default_release_type")]
  pub version_type: String,

  #[serde(default = "default_true")]
  pub featured: bool,
}

fn default_api_url() -> String {
  "https://api.modrinth.com/v2".to_string()
}

fn default_token_env() -> String {
  "MODRINTH_PAT_TOKEN".to_string()
}

fn default_loaders() -> Vec<String> {
  vec!["fabric".to_string()]
}

impl Default for UploadConfig {
  fn default() -> Self {
    Self {
      api_url: default_api_url(),
      project_id: None,
      token_env: default_token_env(),
      loaders: default_loaders(),
      version_type: default_release_type(),
      featured: true,
    }
  }
}

impl UploadConfig {
  pub fn require_project_id(&self) -> ReleaseResult<&str> {
    self.project_id.as_deref().ok_or_else(|| {
      ReleaseError::Config(ConfigError::MissingField {
        field: "upload.project_id".to_string(),
      })
    })
  }

  /// Read the API token from the configured environment variable
  pub fn token(&self) -> ReleaseResult<String> {
    match std::env::var(&self.token_env) {
      Ok(token) if !token.is_empty() => Ok(token),
      _ => Err(ReleaseError::Config(ConfigError::MissingEnv {
        name: self.token_env.clone(),
      })),
    }
  }
}

/// Bounded exponential backoff for network calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,

  #[serde(default = "default_initial_delay_ms")]
  pub initial_delay_ms: u64,

  /// Per-attempt timeout
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
}

pub const MAX_RETRIES_CEILING: u32 = 10;

fn default_max_retries() -> u32 {
  5
}

fn default_initial_delay_ms() -> u64 {
  1000
}

fn default_timeout_ms() -> u64 {
  10_000
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_retries: default_max_retries(),
      initial_delay_ms: default_initial_delay_ms(),
      timeout_ms: default_timeout_ms(),
    }
  }
}

impl RetryConfig {
  pub fn initial_delay(&self) -> Duration {
    Duration::from_millis(self.initial_delay_ms)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

/// One artifact flavour built per track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariantConfig {
  pub name: String,

  /// Human label used in upload titles (default: name)
  #[serde(default)]
  pub label: Option<String>,

  /// Item categories left out of this variant
  #[serde(default)]
  pub exclude_categories: Vec<String>,

  /// Upload changelog; `{track}` is replaced with the track name
  #[serde(default)]
  pub changelog: Option<String>,
}

impl VariantConfig {
  pub fn display_label(&self) -> &str {
    self.label.as_deref().unwrap_or(&self.name)
  }

  pub fn includes(&self, item: &ItemConfig) -> bool {
    !self.exclude_categories.contains(&item.category)
  }

  pub fn changelog_for(&self, track: &Track) -> String {
    match &self.changelog {
      Some(template) => template.replace("{track}", track.as_str()),
      None => format!("{} build for {}", self.display_label(), track),
    }
  }
}

fn default_variants() -> Vec<VariantConfig> {
  vec![
    VariantConfig {
      name: "safe".to_string(),
      label: Some("Safe".to_string()),
      exclude_categories: vec!["cheating".to_string()],
      changelog: Some("Safe to use version for servers for Minecraft {track}".to_string()),
    },
    VariantConfig {
      name: "full".to_string(),
      label: Some("Full".to_string()),
      exclude_categories: Vec::new(),
      changelog: Some(
        "Full version with all mods including possibly unsafe mods to use on servers for Minecraft {track}".to_string(),
      ),
    },
  ]
}

/// A primary item to install, with ordered fallbacks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemConfig {
  pub identifier: String,
  pub category: String,

  /// Project type used for README links (default: "mod")
  #[serde(default = "default_project_type")]
  pub project_type: String,

  #[serde(default)]
  pub alternatives: Vec<AlternativeConfig>,
}

fn default_project_type() -> String {
  "mod".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlternativeConfig {
  pub identifier: String,

  /// Defaults to the primary item's category
  #[serde(default)]
  pub category: Option<String>,
}

impl ItemConfig {
  pub fn alternative_category<'a>(&'a self, alt: &'a AlternativeConfig) -> &'a str {
    alt.category.as_deref().unwrap_or(&self.category)
  }
}

/// The per-track parameter threaded through build and publish calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackConfig {
  pub track: Track,
  pub release: ReleaseVersion,
}

impl TrackConfig {
  pub fn new(track: Track, release: ReleaseVersion) -> Self {
    Self { track, release }
  }
}

impl ReleaseConfig {
  /// Find config file in search order: release.toml, .release.toml, .config/release.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join("release.toml"),
      path.join(".release.toml"),
      path.join(".config").join("release.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config, either from an explicit path or by searching `root`
  pub fn load(root: &Path, explicit: Option<&Path>) -> ReleaseResult<Self> {
    let config_path = match explicit {
      Some(path) => path.to_path_buf(),
      None => Self::find_config_path(root).ok_or_else(|| {
        ReleaseError::Config(ConfigError::NotFound {
          search_root: root.to_path_buf(),
        })
      })?,
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    Self::parse(&content).with_context(|| format!("Invalid configuration in {}", config_path.display()))
  }

  /// Parse and validate config text
  pub fn parse(content: &str) -> ReleaseResult<Self> {
    let config: ReleaseConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> ReleaseResult<()> {
    if self.pack.name.trim().is_empty() {
      return Err(ReleaseError::Config(ConfigError::MissingField {
        field: "pack.name".to_string(),
      }));
    }

    if !self.pack.state_file.contains("{track}") {
      return Err(ReleaseError::with_help(
        format!("pack.state_file '{}' does not contain {{track}}", self.pack.state_file),
        "Each track needs its own state file so tracks sharing one commit keep their own record, e.g. \"release-state/{track}.json\"",
      ));
    }

    if self.variants.is_empty() {
      return Err(ReleaseError::Config(ConfigError::Invalid {
        field: "variants".to_string(),
        reason: "at least one variant is required".to_string(),
      }));
    }

    let mut names = HashSet::new();
    for variant in &self.variants {
      if !names.insert(variant.name.as_str()) {
        return Err(ReleaseError::Config(ConfigError::Invalid {
          field: "variants".to_string(),
          reason: format!("duplicate variant name '{}'", variant.name),
        }));
      }
    }

    if self.primary_variant().is_none() {
      return Err(ReleaseError::Config(ConfigError::Invalid {
        field: "pack.primary_variant".to_string(),
        reason: format!("no variant named '{}'", self.pack.primary_variant),
      }));
    }

    let mut identifiers = HashSet::new();
    for item in &self.items {
      if !identifiers.insert(item.identifier.as_str()) {
        return Err(ReleaseError::Config(ConfigError::Invalid {
          field: "items".to_string(),
          reason: format!("duplicate item identifier '{}'", item.identifier),
        }));
      }
    }

    if self.retry.max_retries > MAX_RETRIES_CEILING {
      return Err(ReleaseError::Config(ConfigError::Invalid {
        field: "retry.max_retries".to_string(),
        reason: format!("{} exceeds the ceiling of {}", self.retry.max_retries, MAX_RETRIES_CEILING),
      }));
    }

    Ok(())
  }

  pub fn primary_variant(&self) -> Option<&VariantConfig> {
    self.variants.iter().find(|v| v.name == self.pack.primary_variant)
  }

  /// Variants in build order: secondary variants first, primary last
  pub fn variants_in_build_order(&self) -> Vec<&VariantConfig> {
    let (primary, mut rest): (Vec<_>, Vec<_>) = self
      .variants
      .iter()
      .partition(|v| v.name == self.pack.primary_variant);
    rest.extend(primary);
    rest
  }
}
