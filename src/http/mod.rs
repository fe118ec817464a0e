//! HTTP adapter for the dashboard backend.
//!
//! All calls go through [`ApiClient::request`], which resolves the base
//! address, signals the loading coordinator, classifies 401 responses and
//! decodes the backend envelope. Non-401 responses are returned as envelopes
//! whatever their HTTP status, so callers branch on the application code.

mod client;
mod envelope;
mod error;
mod request;

pub use client::{ApiClient, ReloadStoredToken};
pub use envelope::Envelope;
pub use error::ApiError;
pub use request::RequestDescriptor;
