//! Keyed query cache with request deduplication and targeted invalidation.
//!
//! This module is domain-agnostic:
//! - Reads (`query`) are cached per key and deduplicated while in flight
//! - Writes (`mutate`) are never cached; on success they mark matching keys stale
//! - Keys are closed enums implementing [`CacheKey`], matched exactly or by scope
//! - Idle entries are evicted after a configurable retention time

mod layer;
mod traits;

pub use layer::{QueryCache, QueryError};
pub use traits::{CacheKey, CacheResult, CacheSource, Invalidate, QueryState};
