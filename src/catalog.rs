//! Version discovery: the set of tracks to release, from a remote catalog

use crate::core::config::CatalogConfig;
use crate::core::error::{NetworkError, ReleaseError, ReleaseResult, ResultExt};
use crate::core::http::HttpClient;
use crate::release::track::Track;
use serde::Deserialize;

/// One catalog record
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
  pub version: String,
  pub version_type: String,
  #[serde(default)]
  pub date: String,
  #[serde(default)]
  pub major: bool,
}

/// Release-type entries that pass the validity predicate, in track order, deduplicated
pub fn select_valid_tracks(entries: &[CatalogEntry], release_type: &str) -> Vec<Track> {
  let mut tracks: Vec<Track> = entries
    .iter()
    .filter(|e| e.version_type == release_type)
    .map(|e| Track::new(e.version.as_str()))
    .filter(Track::is_valid)
    .collect();
  tracks.sort();
  tracks.dedup();
  tracks
}

pub struct Catalog<'a> {
  http: &'a HttpClient,
  config: &'a CatalogConfig,
}

impl<'a> Catalog<'a> {
  pub fn new(http: &'a HttpClient, config: &'a CatalogConfig) -> Self {
    Self { http, config }
  }

  /// Fetch every entry from the catalog service
  pub fn fetch_entries(&self) -> ReleaseResult<Vec<CatalogEntry>> {
    let response = self.http.get(&self.config.url)?;
    let entries: Vec<CatalogEntry> = response
      .json()
      .map_err(|e| NetworkError::from_reqwest(&e))
      .with_context(|| format!("Failed to decode catalog from {}", self.config.url))?;
    tracing::debug!("catalog returned {} entries", entries.len());
    Ok(entries)
  }

  pub fn list_valid_tracks(&self) -> ReleaseResult<Vec<Track>> {
    let entries = self.fetch_entries()?;
    Ok(select_valid_tracks(&entries, &self.config.release_type))
  }

  /// Probe the upstream service once (with a single retry) before any build
  pub fn preflight(&self) -> ReleaseResult<()> {
    let Some(url) = self.config.preflight_url.as_deref() else {
      return Ok(());
    };
    let policy = self.http.policy().single_retry();
    self.http.get_with(url, &policy).map(|_| ()).map_err(|e| {
      ReleaseError::with_help(
        format!("Preflight check against {} failed: {}", url, e),
        "The upstream service may be down. Nothing was built or tagged; try again later.",
      )
    })
  }
}
