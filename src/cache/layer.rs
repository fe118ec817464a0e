//! Cache layer that orchestrates caching, deduplication and invalidation.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::http::ApiError;

use super::traits::{CacheKey, CacheResult, CacheSource, Invalidate, QueryState};

/// Error returned from cached reads and mutations.
///
/// Cheap to clone so every caller sharing a deduplicated request sees the
/// same failure.
#[derive(Debug, Clone, Error)]
#[error(transparent)]
pub struct QueryError(Arc<ApiError>);

impl QueryError {
  /// The underlying adapter error.
  pub fn api_error(&self) -> &ApiError {
    &self.0
  }
}

impl From<ApiError> for QueryError {
  fn from(error: ApiError) -> Self {
    Self(Arc::new(error))
  }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Value, QueryError>>>;

enum Slot {
  Pending(SharedFetch),
  Success(Value),
  Error(QueryError),
}

struct Entry {
  slot: Slot,
  /// Set by invalidation; the next read refetches
  stale: bool,
  fetched_at: Option<Instant>,
  last_access: Instant,
  /// Identifies the fetch that owns this entry
  generation: u64,
}

impl Entry {
  fn is_fresh(&self, now: Instant, stale_time: Duration) -> bool {
    !self.stale
      && self
        .fetched_at
        .is_some_and(|at| now.duration_since(at) < stale_time)
  }
}

struct Inner<K> {
  entries: HashMap<K, Entry>,
  next_generation: u64,
}

enum Lookup {
  Fresh(Value),
  Pending(SharedFetch),
  Miss,
}

/// Keyed cache of asynchronous read results.
///
/// Constructed once and handed to every consumer; clones share state.
pub struct QueryCache<K: CacheKey> {
  inner: Arc<Mutex<Inner<K>>>,
  /// How long a successful result is served without refetching
  stale_time: Duration,
  /// How long an unused entry is retained
  gc_time: Duration,
}

impl<K: CacheKey> QueryCache<K> {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        entries: HashMap::new(),
        next_generation: 0,
      })),
      stale_time: Duration::from_secs(5 * 60),
      gc_time: Duration::from_secs(10 * 60),
    }
  }

  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
    self.gc_time = gc_time;
    self
  }

  fn lock(&self) -> MutexGuard<'_, Inner<K>> {
    lock_inner(&self.inner)
  }

  /// Read through the cache.
  ///
  /// 1. Fresh entry: return it without calling `fetcher`
  /// 2. Request already in flight for `key`: wait for it instead of issuing another
  /// 3. Otherwise call `fetcher` and store the outcome under `key`
  ///
  /// A failed fetch leaves the entry in the error state with no data.
  ///
  /// `fetcher` runs before the cache lock is taken, so it may use this cache.
  /// The future it returns is only polled on a miss.
  pub async fn query<T, F, Fut>(&self, key: K, fetcher: F) -> Result<CacheResult<T>, QueryError>
  where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    self.gc();
    let request = fetcher();

    let (fetch, source) = {
      let mut inner = self.lock();
      let now = Instant::now();

      let lookup = match inner.entries.get_mut(&key) {
        Some(entry) => {
          entry.last_access = now;
          match &entry.slot {
            Slot::Success(data) if entry.is_fresh(now, self.stale_time) => {
              Lookup::Fresh(data.clone())
            }
            Slot::Pending(fetch) if !entry.stale => Lookup::Pending(fetch.clone()),
            _ => Lookup::Miss,
          }
        }
        None => Lookup::Miss,
      };

      match lookup {
        Lookup::Fresh(data) => {
          debug!("Cache hit: {}", key.description());
          drop(inner);
          return decode(data).map(|data| CacheResult::new(data, CacheSource::Cache));
        }
        Lookup::Pending(fetch) => {
          debug!("Joining in-flight request: {}", key.description());
          (fetch, CacheSource::Shared)
        }
        Lookup::Miss => {
          debug!("Cache miss: {}", key.description());
          let fetch = self.start_fetch(&mut inner, key, request, now);
          (fetch, CacheSource::Network)
        }
      }
    };

    let data = fetch.await?;
    decode(data).map(|data| CacheResult::new(data, source))
  }

  /// Install a pending entry whose shared future settles the entry on completion.
  fn start_fetch<T, Fut>(
    &self,
    inner: &mut Inner<K>,
    key: K,
    request: Fut,
    now: Instant,
  ) -> SharedFetch
  where
    T: Serialize + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    inner.next_generation += 1;
    let generation = inner.next_generation;

    let cache = Arc::clone(&self.inner);
    let settle_key = key.clone();
    let fetch = async move {
      let result = match request.await {
        Ok(data) => {
          serde_json::to_value(&data).map_err(|e| QueryError::from(ApiError::Translation(e)))
        }
        Err(e) => Err(QueryError::from(e)),
      };
      settle(&cache, &settle_key, generation, &result);
      result
    }
    .boxed()
    .shared();

    inner.entries.insert(
      key,
      Entry {
        slot: Slot::Pending(fetch.clone()),
        stale: false,
        fetched_at: None,
        last_access: now,
        generation,
      },
    );

    fetch
  }

  /// Run a write. On success, entries matching any of `invalidate` are marked
  /// stale before the result is handed back; on failure the cache is untouched.
  pub async fn mutate<T, F, Fut>(
    &self,
    mutation: F,
    invalidate: &[Invalidate<K>],
  ) -> Result<T, QueryError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
  {
    match mutation().await {
      Ok(data) => {
        self.invalidate(invalidate);
        Ok(data)
      }
      Err(e) => {
        warn!("Mutation failed: {}", e);
        Err(QueryError::from(e))
      }
    }
  }

  /// Mark every entry matching any target as stale. Returns how many were marked.
  pub fn invalidate(&self, targets: &[Invalidate<K>]) -> usize {
    let mut inner = self.lock();
    let mut marked = 0;

    for (key, entry) in inner.entries.iter_mut() {
      if targets.iter().any(|target| target.matches(key)) {
        entry.stale = true;
        marked += 1;
        debug!("Invalidated: {}", key.description());
      }
    }

    marked
  }

  /// Current view state of `key`.
  pub fn state<T: DeserializeOwned>(&self, key: &K) -> QueryState<T> {
    let inner = self.lock();
    match inner.entries.get(key).map(|entry| &entry.slot) {
      None => QueryState::Idle,
      Some(Slot::Pending(_)) => QueryState::Loading,
      Some(Slot::Success(data)) => match decode(data.clone()) {
        Ok(data) => QueryState::Success(data),
        Err(e) => QueryState::Error(e.to_string()),
      },
      Some(Slot::Error(e)) => QueryState::Error(e.to_string()),
    }
  }

  /// Whether `key` would be refetched on the next read. `None` if absent.
  #[cfg(test)]
  pub fn is_stale(&self, key: &K) -> Option<bool> {
    let inner = self.lock();
    let now = Instant::now();
    inner.entries.get(key).map(|entry| match entry.slot {
      Slot::Pending(_) => entry.stale,
      _ => !entry.is_fresh(now, self.stale_time),
    })
  }

  /// Evict idle entries older than the retention time. Pending entries are kept.
  pub fn gc(&self) -> usize {
    let mut inner = self.lock();
    let now = Instant::now();
    let before = inner.entries.len();

    inner.entries.retain(|key, entry| {
      let keep = matches!(entry.slot, Slot::Pending(_))
        || now.duration_since(entry.last_access) < self.gc_time;
      if !keep {
        debug!("Evicted: {}", key.description());
      }
      keep
    });

    before - inner.entries.len()
  }

  /// Drop every entry, e.g. when the session changes.
  pub fn clear(&self) {
    self.lock().entries.clear();
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<K: CacheKey> Default for QueryCache<K> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K: CacheKey> Clone for QueryCache<K> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
      stale_time: self.stale_time,
      gc_time: self.gc_time,
    }
  }
}

fn lock_inner<K>(inner: &Mutex<Inner<K>>) -> MutexGuard<'_, Inner<K>> {
  // Entries are replaced wholesale, so a panic mid-update cannot leave one half-written.
  inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Record the outcome of fetch `generation`, unless a newer fetch or an
/// eviction has replaced its entry. An entry invalidated while pending stays stale.
fn settle<K: CacheKey>(
  inner: &Mutex<Inner<K>>,
  key: &K,
  generation: u64,
  result: &Result<Value, QueryError>,
) {
  let mut inner = lock_inner(inner);
  let Some(entry) = inner.entries.get_mut(key) else {
    return;
  };
  if entry.generation != generation {
    debug!("Discarding superseded result: {}", key.description());
    return;
  }

  entry.slot = match result {
    Ok(data) => Slot::Success(data.clone()),
    Err(e) => Slot::Error(e.clone()),
  };
  entry.fetched_at = Some(Instant::now());
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, QueryError> {
  serde_json::from_value(data).map_err(|e| QueryError::from(ApiError::Translation(e)))
}
