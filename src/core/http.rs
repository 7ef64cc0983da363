//! Blocking HTTP client and bounded retry
//!
//! All network I/O is sequential. Each attempt carries its own timeout; rate
//! limits, timeouts and connection failures are retried with exponential
//! backoff (`initial_delay * 2^attempt`) up to `max_retries` extra attempts.

use crate::core::config::RetryConfig;
use crate::core::error::{NetworkError, ReleaseError, ReleaseResult};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use std::time::Duration;

const USER_AGENT: &str = concat!("pack-release/", env!("CARGO_PKG_VERSION"));

/// Retry ceiling and per-attempt timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_retries: u32,
  pub initial_delay: Duration,
  pub timeout: Duration,
}

impl RetryPolicy {
  /// Backoff before retry number `attempt + 1`
  pub fn delay_for(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    self.initial_delay.saturating_mul(factor)
  }

  /// Same timeout, a single retry (preflight probe)
  pub fn single_retry(&self) -> Self {
    Self {
      max_retries: 1,
      ..*self
    }
  }
}

impl From<&RetryConfig> for RetryPolicy {
  fn from(config: &RetryConfig) -> Self {
    Self {
      max_retries: config.max_retries,
      initial_delay: config.initial_delay(),
      timeout: config.timeout(),
    }
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::from(&RetryConfig::default())
  }
}

/// Result of a single attempt
#[derive(Debug)]
pub enum Attempt<T> {
  /// Finished, successfully or not
  Done(ReleaseResult<T>),
  /// Transient failure, worth retrying
  Retry(String),
}

/// Run `op` until it finishes or the retry budget is spent
pub fn with_retry<T>(policy: &RetryPolicy, operation: &str, op: impl FnMut(u32) -> Attempt<T>) -> ReleaseResult<T> {
  retry_with_sleep(policy, operation, op, std::thread::sleep)
}

pub(crate) fn retry_with_sleep<T>(
  policy: &RetryPolicy,
  operation: &str,
  mut op: impl FnMut(u32) -> Attempt<T>,
  mut sleep: impl FnMut(Duration),
) -> ReleaseResult<T> {
  let mut last_error = String::new();

  for attempt in 0..=policy.max_retries {
    match op(attempt) {
      Attempt::Done(result) => return result,
      Attempt::Retry(reason) => {
        if attempt < policy.max_retries {
          let delay = policy.delay_for(attempt);
          tracing::warn!(
            "{}: {}. Retrying in {}ms (attempt {}/{})",
            operation,
            reason,
            delay.as_millis(),
            attempt + 1,
            policy.max_retries
          );
          sleep(delay);
        }
        last_error = reason;
      }
    }
  }

  Err(ReleaseError::Network(NetworkError::RetriesExhausted {
    operation: operation.to_string(),
    attempts: policy.max_retries + 1,
    last_error,
  }))
}

/// Classify a transport error: transient ones are retried
pub fn classify_send_error<T>(err: reqwest::Error) -> Attempt<T> {
  let network = NetworkError::from_reqwest(&err);
  let error = ReleaseError::Network(network);
  if error.is_transient() {
    Attempt::Retry(error.to_string())
  } else {
    Attempt::Done(Err(error))
  }
}

/// Thin wrapper over a blocking reqwest client with the retry policy attached
pub struct HttpClient {
  client: Client,
  policy: RetryPolicy,
}

impl HttpClient {
  pub fn new(policy: RetryPolicy) -> ReleaseResult<Self> {
    let client = Client::builder()
      .user_agent(USER_AGENT)
      .connect_timeout(policy.timeout)
      .timeout(policy.timeout)
      .build()
      .map_err(|e| NetworkError::Other { reason: e.to_string() })?;
    Ok(Self { client, policy })
  }

  pub fn client(&self) -> &Client {
    &self.client
  }

  pub fn policy(&self) -> &RetryPolicy {
    &self.policy
  }

  /// Send a request built fresh for each attempt; 429 and transport failures are retried
  pub fn send(&self, operation: &str, policy: &RetryPolicy, build: impl Fn(&Client) -> RequestBuilder) -> ReleaseResult<Response> {
    with_retry(policy, operation, |attempt| {
      tracing::debug!("{} (attempt {})", operation, attempt + 1);
      match build(&self.client).send() {
        Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
          Attempt::Retry(format!("rate limited by {}", response.url()))
        }
        Ok(response) => Attempt::Done(Ok(response)),
        Err(e) => classify_send_error(e),
      }
    })
  }

  /// GET `url` and require a success status
  pub fn get(&self, url: &str) -> ReleaseResult<Response> {
    self.get_with(url, &self.policy)
  }

  pub fn get_with(&self, url: &str, policy: &RetryPolicy) -> ReleaseResult<Response> {
    let response = self.send(&format!("GET {}", url), policy, |client| client.get(url))?;
    ensure_success(url, response)
  }
}

/// Turn a non-success status into a `NetworkError::Status` carrying the body
pub fn ensure_success(url: &str, response: Response) -> ReleaseResult<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().unwrap_or_default();
  Err(ReleaseError::Network(NetworkError::Status {
    url: url.to_string(),
    status: status.as_u16(),
    body,
  }))
}
