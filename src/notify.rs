//! Transient user-facing notifications for mutation outcomes.

use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level: Level,
  pub message: String,
}

impl std::fmt::Display for Notification {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let marker = match self.level {
      Level::Success => "ok",
      Level::Error => "error",
    };
    write!(f, "[{}] {}", marker, self.message)
  }
}

/// Broadcasts notifications to every subscriber.
#[derive(Clone)]
pub struct Notifier {
  tx: broadcast::Sender<Notification>,
}

impl Notifier {
  pub fn new(capacity: usize) -> Self {
    let (tx, _rx) = broadcast::channel(capacity);
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
    self.tx.subscribe()
  }

  pub fn success(&self, message: impl Into<String>) {
    self.send(Level::Success, message.into());
  }

  pub fn error(&self, message: impl Into<String>) {
    self.send(Level::Error, message.into());
  }

  fn send(&self, level: Level, message: String) {
    debug!("notification ({:?}): {}", level, message);
    // No subscribers is fine; nobody is looking.
    let _ = self.tx.send(Notification { level, message });
  }
}

impl Default for Notifier {
  fn default() -> Self {
    Self::new(32)
  }
}
