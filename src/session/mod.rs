//! Session state: persisted credentials, the mount-time gate and route gating.

mod gate;
mod router;
mod store;

pub use gate::{AuthState, SessionGate, StoredTokenCheck};
pub use router::{Route, Router};
pub use store::{CredentialStore, MemoryCredentialStore, SqliteCredentialStore, StoreError};
