use serde::Serialize;
use serde_json::Value;

use super::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Delete,
}

impl From<Method> for reqwest::Method {
  fn from(method: Method) -> Self {
    match method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

/// A single backend call, built per request and dropped afterwards.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
  pub method: Method,
  /// Path relative to the configured base address, e.g. `/calendar/period`
  pub path: String,
  pub query: Vec<(String, String)>,
  pub body: Option<Value>,
}

impl RequestDescriptor {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      query: Vec::new(),
      body: None,
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::Get, path)
  }

  pub fn post(path: impl Into<String>) -> Self {
    Self::new(Method::Post, path)
  }

  pub fn delete(path: impl Into<String>) -> Self {
    Self::new(Method::Delete, path)
  }

  pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.query.push((key.into(), value.into()));
    self
  }

  pub fn with_json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
    self.body = Some(serde_json::to_value(body).map_err(ApiError::Encode)?);
    Ok(self)
  }
}
