//! Modrinth upload client
//!
//! Uploads are idempotent: an artifact whose SHA-512 is already known to the
//! service, or a 400 response reporting a duplicate, counts as published.

use super::{PublishRequest, Publisher, UploadOutcome};
use crate::core::config::UploadConfig;
use crate::core::error::{ArtifactError, NetworkError, ReleaseError, ReleaseResult};
use crate::core::http::{Attempt, HttpClient, classify_send_error, with_retry};
use crate::utils::file_name_lossy;
use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use serde::Serialize;
use sha2::{Digest, Sha512};
use std::fs;

const FILE_PART: &str = "file";

/// The `data` part of a version upload
#[derive(Debug, Serialize)]
struct VersionData<'a> {
  name: &'a str,
  version_number: &'a str,
  changelog: &'a str,
  dependencies: Vec<serde_json::Value>,
  game_versions: &'a [String],
  version_type: &'a str,
  loaders: &'a [String],
  featured: bool,
  project_id: &'a str,
  file_parts: [&'a str; 1],
}

pub struct ModrinthPublisher<'a> {
  http: &'a HttpClient,
  config: &'a UploadConfig,
}

impl<'a> ModrinthPublisher<'a> {
  pub fn new(http: &'a HttpClient, config: &'a UploadConfig) -> Self {
    Self { http, config }
  }

  fn api(&self, path: &str) -> String {
    format!("{}/{}", self.config.api_url.trim_end_matches('/'), path.trim_start_matches('/'))
  }

  /// Whether a file with this SHA-512 is already hosted
  fn already_uploaded(&self, token: &str, hash: &str) -> ReleaseResult<bool> {
    let url = self.api(&format!("version_file/{}?algorithm=sha512", hash));
    let response = self.http.send("duplicate lookup", self.http.policy(), |client| {
      client.get(&url).header("Authorization", token)
    })?;
    match response.status() {
      StatusCode::NOT_FOUND => Ok(false),
      status if status.is_success() => Ok(true),
      status => Err(ReleaseError::Network(NetworkError::Status {
        url,
        status: status.as_u16(),
        body: response.text().unwrap_or_default(),
      })),
    }
  }
}

impl Publisher for ModrinthPublisher<'_> {
  fn publish(&mut self, request: &PublishRequest) -> ReleaseResult<UploadOutcome> {
    let project_id = self.config.require_project_id()?;
    let token = self.config.token()?;

    let bytes = fs::read(&request.path).map_err(|e| ArtifactError::Unreadable {
      path: request.path.clone(),
      reason: e.to_string(),
    })?;
    let hash = sha512_hex(&bytes);

    if self.already_uploaded(&token, &hash)? {
      tracing::info!("{} already hosted (sha512 {}), skipping upload", request.version_number, &hash[..12]);
      return Ok(UploadOutcome::Duplicate);
    }

    let data = VersionData {
      name: &request.title,
      version_number: &request.version_number,
      changelog: &request.changelog,
      dependencies: Vec::new(),
      game_versions: &request.game_versions,
      version_type: &self.config.version_type,
      loaders: &self.config.loaders,
      featured: self.config.featured,
      project_id,
      file_parts: [FILE_PART],
    };
    let data = serde_json::to_string(&data)?;
    let file_name = file_name_lossy(&request.path);
    let url = self.api("version");

    with_retry(self.http.policy(), &format!("upload {}", request.version_number), |attempt| {
      tracing::debug!("POST {} (attempt {})", url, attempt + 1);
      // Multipart bodies are consumed on send, so the form is rebuilt per attempt
      let file = match Part::bytes(bytes.clone()).file_name(file_name.clone()).mime_str("application/zip") {
        Ok(part) => part,
        Err(e) => return classify_send_error(e),
      };
      let form = Form::new().text("data", data.clone()).part(FILE_PART, file);
      let response = match self
        .http
        .client()
        .post(&url)
        .header("Authorization", &token)
        .multipart(form)
        .send()
      {
        Ok(response) => response,
        Err(e) => return classify_send_error(e),
      };
      let status = response.status();
      let body = response.text().unwrap_or_default();
      classify_upload_response(&url, status, &body)
    })
  }
}

/// Map an upload response onto success, duplicate, retry or failure
pub fn classify_upload_response(url: &str, status: StatusCode, body: &str) -> Attempt<UploadOutcome> {
  if status.is_success() {
    let id = serde_json::from_str::<serde_json::Value>(body)
      .ok()
      .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string))
      .unwrap_or_default();
    return Attempt::Done(Ok(UploadOutcome::Uploaded { id }));
  }
  if status == StatusCode::TOO_MANY_REQUESTS {
    return Attempt::Retry(format!("rate limited by {}", url));
  }
  if status == StatusCode::BAD_REQUEST && body.to_ascii_lowercase().contains("duplicate") {
    return Attempt::Done(Ok(UploadOutcome::Duplicate));
  }
  Attempt::Done(Err(ReleaseError::Network(NetworkError::Status {
    url: url.to_string(),
    status: status.as_u16(),
    body: body.to_string(),
  })))
}

/// Lowercase hex SHA-512 of the artifact
pub fn sha512_hex(bytes: &[u8]) -> String {
  let digest = Sha512::digest(bytes);
  format!("{:x}", digest)
}
