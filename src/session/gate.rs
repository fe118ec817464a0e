//! Mount-time session resolution.

use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

use super::CredentialStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthState {
  /// The gate has not been resolved yet
  #[default]
  Unknown,
  Authenticated,
  Unauthenticated,
}

/// Decides whether the current context holds a usable session.
pub trait AuthCheck: Send + Sync {
  fn is_authenticated(&self) -> bool;
}

/// Treats a persisted, non-empty token as an authenticated session.
///
/// The token is not validated against the backend.
pub struct StoredTokenCheck {
  store: Arc<dyn CredentialStore>,
}

impl StoredTokenCheck {
  pub fn new(store: Arc<dyn CredentialStore>) -> Self {
    Self { store }
  }
}

impl AuthCheck for StoredTokenCheck {
  fn is_authenticated(&self) -> bool {
    match self.store.load_token() {
      Ok(token) => token.is_some_and(|t| !t.is_empty()),
      Err(e) => {
        warn!("Failed to read session token: {}", e);
        false
      }
    }
  }
}

/// Resolves the session once per mount and remembers the answer.
///
/// Navigation consults the stored state and never re-runs the check, so a
/// redirect cannot bounce between routes.
#[derive(Clone)]
pub struct SessionGate {
  check: Arc<dyn AuthCheck>,
  state: Arc<OnceLock<AuthState>>,
}

impl SessionGate {
  pub fn new(check: Arc<dyn AuthCheck>) -> Self {
    Self {
      check,
      state: Arc::new(OnceLock::new()),
    }
  }

  /// Resolve the session. Only the first call runs the check.
  pub fn resolve(&self) -> bool {
    let state = *self.state.get_or_init(|| {
      let state = if self.check.is_authenticated() {
        AuthState::Authenticated
      } else {
        AuthState::Unauthenticated
      };
      info!("Session resolved: {:?}", state);
      state
    });
    state == AuthState::Authenticated
  }

  pub fn state(&self) -> AuthState {
    self.state.get().copied().unwrap_or_default()
  }
}
