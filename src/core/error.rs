//! Error types for pack-release with contextual messages and exit codes
//!
//! Errors are scoped per track by the orchestrator: a track that fails ends in
//! the errored state and the run continues. Only failures that happen before
//! track processing (config, catalog, preflight) abort the whole run.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for pack-release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// Full success, or nothing to do
  Success = 0,
  /// A track errored, or a user/config error
  Failure = 1,
  /// System error before any track was processed (git, network, I/O)
  System = 2,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for pack-release
#[derive(Debug)]
pub enum ReleaseError {
  /// Configuration errors
  Config(ConfigError),

  /// Tag ledger (git) errors. Never retried.
  Ledger(LedgerError),

  /// Remote catalog / upload / push errors
  Network(NetworkError),

  /// Persisted snapshot could not be loaded
  Snapshot(SnapshotError),

  /// Build, install or export failures
  Artifact(ArtifactError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ReleaseError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ReleaseError::Message { message, context, help } => ReleaseError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ReleaseError::Io(e) => ReleaseError::Message {
        message: ctx_str,
        context: Some(format!("I/O error: {}", e)),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ReleaseError::Config(_) => ExitCode::Failure,
      ReleaseError::Ledger(_) => ExitCode::System,
      ReleaseError::Network(_) => ExitCode::System,
      ReleaseError::Snapshot(_) => ExitCode::Failure,
      ReleaseError::Artifact(_) => ExitCode::Failure,
      ReleaseError::Io(_) => ExitCode::System,
      ReleaseError::Message { .. } => ExitCode::Failure,
    }
  }

  /// Whether retrying the same operation could succeed
  pub fn is_transient(&self) -> bool {
    matches!(
      self,
      ReleaseError::Network(NetworkError::RateLimited { .. } | NetworkError::Timeout { .. } | NetworkError::Connection { .. })
    )
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::Config(e) => e.help_message(),
      ReleaseError::Ledger(e) => e.help_message(),
      ReleaseError::Network(e) => e.help_message(),
      ReleaseError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::Config(e) => write!(f, "{}", e),
      ReleaseError::Ledger(e) => write!(f, "{}", e),
      ReleaseError::Network(e) => write!(f, "{}", e),
      ReleaseError::Snapshot(e) => write!(f, "{}", e),
      ReleaseError::Artifact(e) => write!(f, "{}", e),
      ReleaseError::Io(e) => write!(f, "I/O error: {}", e),
      ReleaseError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ReleaseError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ReleaseError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ReleaseError {
  fn from(err: io::Error) -> Self {
    ReleaseError::Io(err)
  }
}

impl From<String> for ReleaseError {
  fn from(msg: String) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<&str> for ReleaseError {
  fn from(msg: &str) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<toml_edit::de::Error> for ReleaseError {
  fn from(err: toml_edit::de::Error) -> Self {
    ReleaseError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for ReleaseError {
  fn from(err: serde_json::Error) -> Self {
    ReleaseError::message(format!("JSON error: {}", err))
  }
}

impl From<regex::Error> for ReleaseError {
  fn from(err: regex::Error) -> Self {
    ReleaseError::message(format!("Regex error: {}", err))
  }
}

impl From<reqwest::Error> for ReleaseError {
  fn from(err: reqwest::Error) -> Self {
    ReleaseError::Network(NetworkError::from_reqwest(&err))
  }
}

impl From<LedgerError> for ReleaseError {
  fn from(err: LedgerError) -> Self {
    ReleaseError::Ledger(err)
  }
}

impl From<NetworkError> for ReleaseError {
  fn from(err: NetworkError) -> Self {
    ReleaseError::Network(err)
  }
}

impl From<SnapshotError> for ReleaseError {
  fn from(err: SnapshotError) -> Self {
    ReleaseError::Snapshot(err)
  }
}

impl From<ArtifactError> for ReleaseError {
  fn from(err: ArtifactError) -> Self {
    ReleaseError::Artifact(err)
  }
}

impl From<ConfigError> for ReleaseError {
  fn from(err: ConfigError) -> Self {
    ReleaseError::Config(err)
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// release.toml not found
  NotFound { search_root: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// Field present but unusable
  Invalid { field: String, reason: String },

  /// Required environment variable not set
  MissingEnv { name: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Create a release.toml at the repository root or pass --config <path>.".to_string())
      }
      ConfigError::MissingEnv { name } => Some(format!("Export {} before publishing.", name)),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { search_root } => {
        write!(
          f,
          "No pack-release configuration found.\nSearched for release.toml under: {}",
          search_root.display()
        )
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::Invalid { field, reason } => {
        write!(f, "Invalid config value for {}: {}", field, reason)
      }
      ConfigError::MissingEnv { name } => {
        write!(f, "Required environment variable \"{}\" is not set", name)
      }
    }
  }
}

/// Tag ledger errors
#[derive(Debug)]
pub enum LedgerError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Tag already exists (tags are immutable)
  TagExists { tag: String },

  /// Tag does not exist
  TagNotFound { tag: String },

  /// Tag name does not follow `{track}_{major}.{minor}.{patch}`
  InvalidTagName { tag: String },

  /// File not present at the commit a tag is bound to
  FileNotFound { reference: String, path: String },

  /// Release number whose patch component cannot be incremented
  ReleaseOverflow { release: String },

  /// Uncommitted changes would be lost by checking out a tag
  DirtyWorkingTree { paths: Vec<String> },
}

impl LedgerError {
  fn help_message(&self) -> Option<String> {
    match self {
      LedgerError::TagExists { tag } => Some(format!(
        "Tags are never rewritten. Inspect it with `git show {}` and delete it manually if it was created by an interrupted run.",
        tag
      )),
      LedgerError::RepoNotFound { path } => Some(format!(
        "Run pack-release from inside the pack repository: {}",
        path.display()
      )),
      LedgerError::ReleaseOverflow { .. } => {
        Some("Delete the malformed release tag from the repository and the remote.".to_string())
      }
      LedgerError::DirtyWorkingTree { .. } => {
        Some("Commit or stash these changes before publishing; publishing checks out release tags.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for LedgerError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LedgerError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr.trim_end())
      }
      LedgerError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      LedgerError::TagExists { tag } => write!(f, "Tag already exists: {}", tag),
      LedgerError::TagNotFound { tag } => write!(f, "Tag not found: {}", tag),
      LedgerError::InvalidTagName { tag } => {
        write!(f, "Invalid release tag '{}': expected {{track}}_{{major}}.{{minor}}.{{patch}}", tag)
      }
      LedgerError::FileNotFound { reference, path } => {
        write!(f, "File {} does not exist at {}", path, reference)
      }
      LedgerError::ReleaseOverflow { release } => {
        write!(f, "Release {} cannot be incremented: patch is at its maximum", release)
      }
      LedgerError::DirtyWorkingTree { paths } => {
        write!(f, "Working tree has uncommitted changes:")?;
        for path in paths {
          write!(f, "\n  {}", path)?;
        }
        Ok(())
      }
    }
  }
}

/// Network errors (catalog, upload, tag push)
#[derive(Debug)]
pub enum NetworkError {
  /// HTTP 429
  RateLimited { url: String },

  /// A single attempt exceeded its timeout
  Timeout { url: String },

  /// Connection could not be established
  Connection { url: String, reason: String },

  /// Non-retryable HTTP status
  Status { url: String, status: u16, body: String },

  /// Transient failures exhausted the retry budget
  RetriesExhausted {
    operation: String,
    attempts: u32,
    last_error: String,
  },

  /// `git push` was rejected or could not reach the remote
  PushFailed { remote: String, reason: String },

  /// Anything else reqwest reports
  Other { reason: String },
}

impl NetworkError {
  /// Classify a reqwest error into the retryable/non-retryable taxonomy
  pub fn from_reqwest(err: &reqwest::Error) -> Self {
    let url = err.url().map(|u| u.to_string()).unwrap_or_default();
    if err.is_timeout() {
      NetworkError::Timeout { url }
    } else if err.is_connect() {
      NetworkError::Connection {
        url,
        reason: err.to_string(),
      }
    } else if let Some(status) = err.status() {
      if status.as_u16() == 429 {
        NetworkError::RateLimited { url }
      } else {
        NetworkError::Status {
          url,
          status: status.as_u16(),
          body: String::new(),
        }
      }
    } else {
      NetworkError::Other {
        reason: err.to_string(),
      }
    }
  }

  fn help_message(&self) -> Option<String> {
    match self {
      NetworkError::RetriesExhausted { .. } => {
        Some("The remote service may be rate limiting or down. Re-run later; completed tracks are not redone.".to_string())
      }
      NetworkError::PushFailed { reason, .. } => {
        if reason.contains("permission denied") || reason.contains("403") {
          Some("Check the credentials used for pushing tags to the remote.".to_string())
        } else {
          Some("Tags were created locally. Push them with `git push --tags` once the remote is reachable.".to_string())
        }
      }
      _ => None,
    }
  }
}

impl fmt::Display for NetworkError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NetworkError::RateLimited { url } => write!(f, "Rate limited by {}", url),
      NetworkError::Timeout { url } => write!(f, "Request timeout: {}", url),
      NetworkError::Connection { url, reason } => write!(f, "Connection to {} failed: {}", url, reason),
      NetworkError::Status { url, status, body } => {
        write!(f, "HTTP {} from {}", status, url)?;
        if !body.is_empty() {
          write!(f, "\n{}", body)?;
        }
        Ok(())
      }
      NetworkError::RetriesExhausted {
        operation,
        attempts,
        last_error,
      } => write!(f, "{} failed after {} attempt(s): {}", operation, attempts, last_error),
      NetworkError::PushFailed { remote, reason } => write!(f, "Push to {} failed: {}", remote, reason.trim_end()),
      NetworkError::Other { reason } => write!(f, "Network error: {}", reason),
    }
  }
}

/// Persisted snapshot load errors. Always recovered as "assume changed".
#[derive(Debug)]
pub enum SnapshotError {
  /// State file missing at the tag
  Missing { tag: String, path: String },

  /// State file is not valid snapshot JSON
  Malformed { source: String, reason: String },

  /// An identifier appears in more than one outcome set
  DuplicateIdentifier { identifier: String },
}

impl fmt::Display for SnapshotError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SnapshotError::Missing { tag, path } => write!(f, "No snapshot {} at tag {}", path, tag),
      SnapshotError::Malformed { source, reason } => write!(f, "Malformed snapshot in {}: {}", source, reason),
      SnapshotError::DuplicateIdentifier { identifier } => {
        write!(f, "Item '{}' appears in more than one outcome set", identifier)
      }
    }
  }
}

/// Build / export errors
#[derive(Debug)]
pub enum ArtifactError {
  /// Installer subprocess could not be started or exited non-zero
  InstallerFailed { command: String, stderr: String },

  /// Export ran but the produced file could not be located
  ExportMissing { output: String },

  /// Built artifact could not be read for upload
  Unreadable { path: PathBuf, reason: String },
}

impl fmt::Display for ArtifactError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ArtifactError::InstallerFailed { command, stderr } => {
        write!(f, "Installer command failed: {}\n{}", command, stderr.trim_end())
      }
      ArtifactError::ExportMissing { output } => {
        write!(f, "Could not determine exported file from installer output:\n{}", output.trim_end())
      }
      ArtifactError::Unreadable { path, reason } => {
        write!(f, "Failed to read artifact {}: {}", path.display(), reason)
      }
    }
  }
}

/// Result type alias for pack-release
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ReleaseError>,
{
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ReleaseError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
