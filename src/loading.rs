//! In-flight request tracking for the global loading indicator.
//!
//! Every outbound call holds an [`InFlight`] guard for its whole lifetime.
//! The coordinator counts live guards, so overlapping calls keep the
//! indicator on until the last one settles.

use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot of outstanding requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingState {
  pub in_flight: usize,
}

impl LoadingState {
  pub fn is_loading(&self) -> bool {
    self.in_flight > 0
  }
}

/// Reference-counted loading flag with subscribe/notify semantics.
#[derive(Clone)]
pub struct LoadingCoordinator {
  tx: Arc<watch::Sender<LoadingState>>,
}

impl LoadingCoordinator {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(LoadingState::default());
    Self { tx: Arc::new(tx) }
  }

  /// Register a call as started. The call ends when the guard is dropped.
  pub fn begin(&self) -> InFlight {
    self.tx.send_modify(|state| state.in_flight += 1);
    InFlight {
      tx: Arc::clone(&self.tx),
    }
  }

  /// Observe loading transitions.
  pub fn subscribe(&self) -> watch::Receiver<LoadingState> {
    self.tx.subscribe()
  }

  #[cfg(test)]
  pub fn in_flight(&self) -> usize {
    self.tx.borrow().in_flight
  }

  #[cfg(test)]
  pub fn is_loading(&self) -> bool {
    self.tx.borrow().is_loading()
  }
}

impl Default for LoadingCoordinator {
  fn default() -> Self {
    Self::new()
  }
}

/// Guard for a single outstanding call.
///
/// Dropping it signals call-end on every exit path, including early returns
/// via `?` and futures dropped mid-flight.
#[must_use = "the call is considered finished as soon as the guard is dropped"]
pub struct InFlight {
  tx: Arc<watch::Sender<LoadingState>>,
}

impl Drop for InFlight {
  fn drop(&mut self) {
    self
      .tx
      .send_modify(|state| state.in_flight = state.in_flight.saturating_sub(1));
  }
}
