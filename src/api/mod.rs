//! Domain adapters for the dashboard backend.
//!
//! `api_types` mirrors the backend's wire records, `types` holds the
//! UI-facing shapes, `client` issues the calls and `cached_client` puts the
//! query cache and mutation notifications in front of it.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod types;

pub use cached_client::CachedDashboard;
pub use client::DashboardApi;
