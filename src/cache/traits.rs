//! Core traits and types for the query cache.

use std::fmt::Debug;
use std::hash::Hash;

/// A structured cache key.
///
/// Implementors are closed enums: one variant per query, carrying its
/// parameters. Two keys are equal iff their [`segments`](CacheKey::segments)
/// are element-wise equal.
pub trait CacheKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {
  /// Leading element of the key, used for prefix invalidation.
  type Scope: Copy + Eq + Debug + Send + Sync + 'static;

  fn scope(&self) -> Self::Scope;

  /// Ordered primitive representation, query name first.
  fn segments(&self) -> Vec<String>;

  /// Human-readable form for logs.
  fn description(&self) -> String {
    self.segments().join(":")
  }
}

/// Which cache entries an invalidation touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidate<K: CacheKey> {
  /// Exactly this key
  Exact(K),
  /// Every key whose leading element is this scope
  Scope(K::Scope),
}

impl<K: CacheKey> Invalidate<K> {
  pub fn matches(&self, key: &K) -> bool {
    match self {
      Invalidate::Exact(target) => target == key,
      Invalidate::Scope(scope) => key.scope() == *scope,
    }
  }
}

/// Result of a cached read, with metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  pub fn new(data: T, source: CacheSource) -> Self {
    Self { data, source }
  }
}

/// Indicates where the returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// This call issued the network request
  Network,
  /// This call joined a request another caller had already issued
  Shared,
  /// Fresh data served from the cache
  Cache,
}

/// Inline view state of a query, for consumers that render read status.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  #[cfg(test)]
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  #[cfg(test)]
  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  #[cfg(test)]
  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  #[cfg(test)]
  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}
