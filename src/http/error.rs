use thiserror::Error;

use crate::session::StoreError;

/// Errors surfaced by the HTTP adapter and the domain adapters built on it.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("invalid request url: {0}")]
  Url(#[from] url::ParseError),

  #[error("failed to encode request body: {0}")]
  Encode(#[source] serde_json::Error),

  /// Network or transport failure. Never retried.
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  /// The backend rejected our credentials and re-authentication did not help.
  #[error("not authorized for {path}")]
  Unauthorized { path: String },

  /// The response body was not a backend envelope.
  #[error("malformed response (HTTP {status}): {source}")]
  Decode {
    status: u16,
    #[source]
    source: serde_json::Error,
  },

  /// The envelope carried an application-level failure code.
  #[error("{message} (code {code})")]
  Domain { code: i64, message: String },

  /// The envelope payload did not match the expected record shape.
  #[error("unexpected response data: {0}")]
  Translation(#[source] serde_json::Error),

  #[error("credential store: {0}")]
  Credentials(#[from] StoreError),
}
