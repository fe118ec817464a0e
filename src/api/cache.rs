//! Cache keys for dashboard queries.

use chrono::NaiveDate;

use crate::cache::CacheKey;

/// One variant per cached backend read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DashboardKey {
  /// Calendar events in a date range
  Events { start: NaiveDate, end: NaiveDate },
  /// Public holidays in a date range
  Holidays { start: NaiveDate, end: NaiveDate },
  /// All users
  Users,
}

/// Leading element of a [`DashboardKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DashboardScope {
  Events,
  Holidays,
  Users,
}

impl DashboardScope {
  pub fn name(self) -> &'static str {
    match self {
      DashboardScope::Events => "events",
      DashboardScope::Holidays => "holidays",
      DashboardScope::Users => "users",
    }
  }
}

impl CacheKey for DashboardKey {
  type Scope = DashboardScope;

  fn scope(&self) -> DashboardScope {
    match self {
      DashboardKey::Events { .. } => DashboardScope::Events,
      DashboardKey::Holidays { .. } => DashboardScope::Holidays,
      DashboardKey::Users => DashboardScope::Users,
    }
  }

  fn segments(&self) -> Vec<String> {
    let head = self.scope().name().to_string();
    match self {
      DashboardKey::Events { start, end } | DashboardKey::Holidays { start, end } => {
        vec![head, start.to_string(), end.to_string()]
      }
      DashboardKey::Users => vec![head],
    }
  }
}
