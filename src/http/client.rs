use futures::future::BoxFuture;
use reqwest::{header, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::loading::LoadingCoordinator;
use crate::session::CredentialStore;

use super::{ApiError, Envelope, RequestDescriptor};

/// Result of a re-authentication attempt after a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReauthOutcome {
  /// Credentials were renewed; the original request may be replayed once.
  Refreshed,
  /// Nothing was renewed; the 401 is surfaced to the caller.
  Declined,
}

/// Hook invoked when a non-refresh endpoint answers 401.
///
/// `rejected` is the token the backend refused, if one was sent.
pub trait Reauthenticate: Send + Sync {
  fn reauthenticate<'a>(
    &'a self,
    path: &'a str,
    rejected: Option<&'a str>,
  ) -> BoxFuture<'a, ReauthOutcome>;
}

/// Default hook: records the attempt and declines.
pub struct NoRefresh;

impl Reauthenticate for NoRefresh {
  fn reauthenticate<'a>(
    &'a self,
    path: &'a str,
    _rejected: Option<&'a str>,
  ) -> BoxFuture<'a, ReauthOutcome> {
    Box::pin(async move {
      // TODO: exchange a refresh token here once the backend exposes the refresh endpoint
      warn!(
        "401 from {}: re-authentication requested but no refresh flow is configured",
        path
      );
      ReauthOutcome::Declined
    })
  }
}

/// Picks up a session renewed elsewhere, e.g. a `login` from another
/// process sharing the credential store while this one was running.
///
/// Reports [`ReauthOutcome::Refreshed`] when the store now holds a token
/// other than the rejected one.
pub struct ReloadStoredToken {
  credentials: Arc<dyn CredentialStore>,
}

impl ReloadStoredToken {
  pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
    Self { credentials }
  }
}

impl Reauthenticate for ReloadStoredToken {
  fn reauthenticate<'a>(
    &'a self,
    path: &'a str,
    rejected: Option<&'a str>,
  ) -> BoxFuture<'a, ReauthOutcome> {
    Box::pin(async move {
      match self.credentials.load_token() {
        Ok(Some(current)) if Some(current.as_str()) != rejected => {
          info!("Session token changed since the 401 from {}", path);
          ReauthOutcome::Refreshed
        }
        Ok(_) => {
          warn!("401 from {}: no renewed session in the credential store", path);
          ReauthOutcome::Declined
        }
        Err(e) => {
          warn!("Failed to reload session token: {}", e);
          ReauthOutcome::Declined
        }
      }
    })
  }
}

/// Backend HTTP client.
///
/// Every call is counted by the shared [`LoadingCoordinator`] and carries the
/// persisted bearer token, if any.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
  refresh_path: String,
  loading: LoadingCoordinator,
  credentials: Arc<dyn CredentialStore>,
  reauth: Arc<dyn Reauthenticate>,
}

impl ApiClient {
  pub fn new(
    config: &ApiConfig,
    loading: LoadingCoordinator,
    credentials: Arc<dyn CredentialStore>,
  ) -> Result<Self, ApiError> {
    let base_url = Url::parse(&config.base_url)?;
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;

    Ok(Self {
      http,
      base_url,
      refresh_path: config.refresh_path.clone(),
      loading,
      credentials,
      reauth: Arc::new(NoRefresh),
    })
  }

  /// Replace the 401 hook.
  pub fn with_reauthenticator(mut self, reauth: Arc<dyn Reauthenticate>) -> Self {
    self.reauth = reauth;
    self
  }

  #[cfg(test)]
  pub fn loading(&self) -> &LoadingCoordinator {
    &self.loading
  }

  /// Execute a request and return the backend envelope.
  ///
  /// Envelopes are returned for every status except 401, including HTTP
  /// error statuses; the caller inspects `code`. A 401 from any endpoint other
  /// than the refresh endpoint goes through the re-authentication hook first
  /// and is replayed once if the hook reports success.
  pub async fn request(&self, descriptor: &RequestDescriptor) -> Result<Envelope, ApiError> {
    let _in_flight = self.loading.begin();

    let token = self.credentials.load_token()?;
    let response = self.send(descriptor, token.as_deref()).await?;
    if response.status() != StatusCode::UNAUTHORIZED {
      return Self::decode(response).await;
    }

    if self.is_refresh_path(&descriptor.path) {
      warn!("401 from refresh endpoint {}", descriptor.path);
      return Err(self.unauthorized(descriptor));
    }

    match self
      .reauth
      .reauthenticate(&descriptor.path, token.as_deref())
      .await
    {
      ReauthOutcome::Refreshed => {
        info!("Replaying {} after re-authentication", descriptor.path);
        let renewed = self.credentials.load_token()?;
        let replay = self.send(descriptor, renewed.as_deref()).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
          warn!("401 from {} after re-authentication", descriptor.path);
          return Err(self.unauthorized(descriptor));
        }
        Self::decode(replay).await
      }
      ReauthOutcome::Declined => Err(self.unauthorized(descriptor)),
    }
  }

  async fn send(
    &self,
    descriptor: &RequestDescriptor,
    token: Option<&str>,
  ) -> Result<reqwest::Response, ApiError> {
    let url = self.url_for(descriptor)?;
    debug!("{:?} {}", descriptor.method, url);

    let mut builder = self
      .http
      .request(descriptor.method.into(), url)
      .header(header::ACCEPT, "application/json");

    if let Some(token) = token {
      builder = builder.bearer_auth(token);
    }
    if let Some(body) = &descriptor.body {
      builder = builder.json(body);
    }

    Ok(builder.send().await?)
  }

  async fn decode(response: reqwest::Response) -> Result<Envelope, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    let envelope: Envelope =
      serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
        status: status.as_u16(),
        source,
      })?;

    if !status.is_success() || !envelope.is_success() {
      debug!(
        "HTTP {} with application code {}: {}",
        status, envelope.code, envelope.message
      );
    }

    Ok(envelope)
  }

  /// Join the base address and a request path without dropping the base prefix.
  fn url_for(&self, descriptor: &RequestDescriptor) -> Result<Url, ApiError> {
    let joined = format!(
      "{}/{}",
      self.base_url.as_str().trim_end_matches('/'),
      descriptor.path.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined)?;
    if !descriptor.query.is_empty() {
      url.query_pairs_mut().extend_pairs(descriptor.query.iter());
    }
    Ok(url)
  }

  fn is_refresh_path(&self, path: &str) -> bool {
    path.trim_end_matches('/') == self.refresh_path.trim_end_matches('/')
  }

  fn unauthorized(&self, descriptor: &RequestDescriptor) -> ApiError {
    ApiError::Unauthorized {
      path: descriptor.path.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::session::MemoryCredentialStore;
  use crate::testing::{ok, spawn_backend, test_client, Hits};
  use axum::extract::Query;
  use axum::http::{HeaderMap, StatusCode as AxumStatus};
  use axum::routing::{get, post};
  use axum::{Json, Router};
  use serde_json::{json, Value};
  use std::collections::HashMap;

  struct CountingReauth {
    calls: Hits,
    outcome: ReauthOutcome,
  }

  impl Reauthenticate for CountingReauth {
    fn reauthenticate<'a>(
      &'a self,
      _path: &'a str,
      _rejected: Option<&'a str>,
    ) -> BoxFuture<'a, ReauthOutcome> {
      self.calls.bump();
      let outcome = self.outcome;
      Box::pin(async move { outcome })
    }
  }

  fn no_credentials() -> Arc<dyn CredentialStore> {
    Arc::new(MemoryCredentialStore::default())
  }

  #[tokio::test]
  async fn test_success_envelope_carries_token_and_clears_loading() {
    let routes = Router::new().route(
      "/users",
      get(|headers: HeaderMap| async move {
        let auth = headers
          .get("authorization")
          .and_then(|v| v.to_str().ok())
          .unwrap_or_default()
          .to_string();
        ok(json!([{ "auth": auth }]))
      }),
    );
    let base = spawn_backend(routes).await;

    let store = Arc::new(MemoryCredentialStore::default());
    store.save("tok-1", "kim").unwrap();
    let client = test_client(&base, store);

    let envelope = client
      .request(&RequestDescriptor::get("/users"))
      .await
      .unwrap();

    assert!(envelope.is_success());
    assert_eq!(envelope.count, 1);
    assert_eq!(envelope.data[0]["auth"], "Bearer tok-1");
    assert!(!client.loading().is_loading());
  }

  #[tokio::test]
  async fn test_query_parameters_and_base_prefix() {
    let routes = Router::new().route(
      "/holidays/date",
      get(|Query(params): Query<HashMap<String, String>>| async move {
        ok(json!([params.get("start"), params.get("end")]))
      }),
    );
    let base = spawn_backend(routes).await;
    let client = test_client(&base, no_credentials());

    let envelope = client
      .request(
        &RequestDescriptor::get("/holidays/date")
          .with_query("start", "2024-01-01")
          .with_query("end", "2024-12-31"),
      )
      .await
      .unwrap();

    assert_eq!(envelope.data, json!(["2024-01-01", "2024-12-31"]));
  }

  #[tokio::test]
  async fn test_error_envelope_is_returned_not_raised() {
    let routes = Router::new().route(
      "/schedule",
      post(|| async {
        (
          AxumStatus::BAD_REQUEST,
          Json(json!({ "code": 400, "message": "end before start", "count": 0, "data": null })),
        )
      }),
    );
    let base = spawn_backend(routes).await;
    let client = test_client(&base, no_credentials());

    let envelope = client
      .request(&RequestDescriptor::post("/schedule"))
      .await
      .unwrap();

    assert_eq!(envelope.code, 400);
    assert_eq!(envelope.message, "end before start");
    assert!(!envelope.is_success());
  }

  #[tokio::test]
  async fn test_401_reauthenticates_then_replays() {
    let hits = Hits::default();
    let h = hits.clone();
    let routes = Router::new().route(
      "/calendar/period",
      get(move || {
        let h = h.clone();
        async move {
          if h.bump() == 1 {
            (
              AxumStatus::UNAUTHORIZED,
              Json(json!({ "code": 401, "message": "expired" })),
            )
          } else {
            (AxumStatus::OK, ok(json!([])))
          }
        }
      }),
    );
    let base = spawn_backend(routes).await;

    let calls = Hits::default();
    let client = test_client(&base, no_credentials()).with_reauthenticator(Arc::new(CountingReauth {
      calls: calls.clone(),
      outcome: ReauthOutcome::Refreshed,
    }));

    let envelope = client
      .request(&RequestDescriptor::get("/calendar/period"))
      .await
      .unwrap();

    assert!(envelope.is_success());
    assert_eq!(calls.get(), 1);
    assert_eq!(hits.get(), 2);
    assert!(!client.loading().is_loading());
  }

  #[tokio::test]
  async fn test_401_declined_surfaces_after_attempt() {
    let routes = Router::new().route(
      "/users",
      get(|| async {
        (
          AxumStatus::UNAUTHORIZED,
          Json(json!({ "code": 401, "message": "expired" })),
        )
      }),
    );
    let base = spawn_backend(routes).await;

    let calls = Hits::default();
    let client = test_client(&base, no_credentials()).with_reauthenticator(Arc::new(CountingReauth {
      calls: calls.clone(),
      outcome: ReauthOutcome::Declined,
    }));

    let result = client.request(&RequestDescriptor::get("/users")).await;

    assert!(matches!(result, Err(ApiError::Unauthorized { ref path }) if path == "/users"));
    assert_eq!(calls.get(), 1);
  }

  #[tokio::test]
  async fn test_401_from_refresh_endpoint_skips_reauth() {
    let routes = Router::new().route(
      "/auth/refresh",
      post(|| async { (AxumStatus::UNAUTHORIZED, Json(Value::Null)) }),
    );
    let base = spawn_backend(routes).await;

    let calls = Hits::default();
    let client = test_client(&base, no_credentials()).with_reauthenticator(Arc::new(CountingReauth {
      calls: calls.clone(),
      outcome: ReauthOutcome::Refreshed,
    }));

    let result = client
      .request(&RequestDescriptor::post("/auth/refresh"))
      .await;

    assert!(matches!(result, Err(ApiError::Unauthorized { .. })));
    assert_eq!(calls.get(), 0);
  }

  #[tokio::test]
  async fn test_non_envelope_body_is_decode_error() {
    let routes = Router::new().route(
      "/users",
      get(|| async { (AxumStatus::BAD_GATEWAY, "<html>upstream down</html>") }),
    );
    let base = spawn_backend(routes).await;
    let client = test_client(&base, no_credentials());

    let result = client.request(&RequestDescriptor::get("/users")).await;

    assert!(matches!(result, Err(ApiError::Decode { status: 502, .. })));
  }

  #[tokio::test]
  async fn test_transport_failure_clears_loading() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = test_client(&format!("http://{}/api/v1", addr), no_credentials());
    let result = client.request(&RequestDescriptor::get("/users")).await;

    assert!(matches!(result, Err(ApiError::Transport(_))));
    assert!(!client.loading().is_loading());
  }

  fn unauthorized_route(hits: Hits) -> Router {
    Router::new().route(
      "/users",
      get(move || {
        let hits = hits.clone();
        async move {
          hits.bump();
          (
            AxumStatus::UNAUTHORIZED,
            Json(json!({ "code": 401, "message": "expired" })),
          )
        }
      }),
    )
  }

  #[tokio::test]
  async fn test_default_hook_declines_without_replay() {
    let hits = Hits::default();
    let base = spawn_backend(unauthorized_route(hits.clone())).await;
    let client = test_client(&base, no_credentials());

    let result = client.request(&RequestDescriptor::get("/users")).await;

    assert!(matches!(result, Err(ApiError::Unauthorized { ref path }) if path == "/users"));
    assert_eq!(hits.get(), 1);
    assert!(!client.loading().is_loading());
  }

  #[tokio::test]
  async fn test_reload_replays_with_token_renewed_elsewhere() {
    let store = Arc::new(MemoryCredentialStore::default());
    store.save("tok-1", "kim").unwrap();

    let hits = Hits::default();
    let (h, renewer) = (hits.clone(), store.clone());
    let routes = Router::new().route(
      "/users",
      get(move |headers: HeaderMap| {
        let (h, renewer) = (h.clone(), renewer.clone());
        async move {
          h.bump();
          let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
          if auth == Some("Bearer tok-2") {
            (AxumStatus::OK, ok(json!([])))
          } else {
            // Another process logs in while this request is rejected
            renewer.save("tok-2", "kim").unwrap();
            (
              AxumStatus::UNAUTHORIZED,
              Json(json!({ "code": 401, "message": "expired" })),
            )
          }
        }
      }),
    );
    let base = spawn_backend(routes).await;

    let client = test_client(&base, store.clone())
      .with_reauthenticator(Arc::new(ReloadStoredToken::new(store)));
    let envelope = client
      .request(&RequestDescriptor::get("/users"))
      .await
      .unwrap();

    assert!(envelope.is_success());
    assert_eq!(hits.get(), 2);
  }

  #[tokio::test]
  async fn test_reload_declines_when_token_unchanged() {
    let store = Arc::new(MemoryCredentialStore::default());
    store.save("tok-1", "kim").unwrap();

    let hits = Hits::default();
    let base = spawn_backend(unauthorized_route(hits.clone())).await;
    let client = test_client(&base, store.clone())
      .with_reauthenticator(Arc::new(ReloadStoredToken::new(store)));

    let result = client.request(&RequestDescriptor::get("/users")).await;

    assert!(matches!(result, Err(ApiError::Unauthorized { .. })));
    assert_eq!(hits.get(), 1);
  }
}
