//! Fixtures for tests that talk to an in-process backend.

use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ApiConfig;
use crate::http::ApiClient;
use crate::loading::LoadingCoordinator;
use crate::session::CredentialStore;

pub const BASE_PREFIX: &str = "/api/v1";

/// Serve `routes` under [`BASE_PREFIX`] on a random local port and return the base address.
pub async fn spawn_backend(routes: Router) -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let app = Router::new().nest(BASE_PREFIX, routes);

  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });

  format!("http://{}{}", addr, BASE_PREFIX)
}

pub fn api_config(base_url: &str) -> ApiConfig {
  ApiConfig {
    base_url: base_url.to_string(),
    refresh_path: "/auth/refresh".to_string(),
    timeout_secs: 5,
  }
}

pub fn test_client(base_url: &str, credentials: Arc<dyn CredentialStore>) -> ApiClient {
  ApiClient::new(&api_config(base_url), LoadingCoordinator::new(), credentials).unwrap()
}

/// Successful backend envelope around `data`.
pub fn ok(data: Value) -> Json<Value> {
  let count = data.as_array().map(|a| a.len()).unwrap_or(0);
  Json(json!({
    "code": 200,
    "message": "success",
    "count": count,
    "data": data,
  }))
}

/// Failed backend envelope (still served with HTTP 200, as the backend does).
pub fn failed(code: i64, message: &str) -> Json<Value> {
  Json(json!({
    "code": code,
    "message": message,
    "count": 0,
    "data": null,
  }))
}

/// Shared request counter for handlers.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
  /// Increment and return the new count.
  pub fn bump(&self) -> usize {
    self.0.fetch_add(1, Ordering::SeqCst) + 1
  }

  pub fn get(&self) -> usize {
    self.0.load(Ordering::SeqCst)
  }
}
