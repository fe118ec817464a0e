//! Dashboard adapter behind the query cache.

use chrono::NaiveDate;

use crate::cache::{CacheResult, Invalidate, QueryCache, QueryError, QueryState};
use crate::notify::Notifier;

use super::cache::{DashboardKey, DashboardScope};
use super::client::DashboardApi;
use super::types::{CalendarEvent, Holiday, NewSchedule, Schedule, Session, User};

/// Dashboard client with cached reads and notifying writes.
///
/// Reads go through the [`QueryCache`] and report failures only through
/// their return value and [`QueryState`]. Every write emits exactly one
/// success or failure notification.
#[derive(Clone)]
pub struct CachedDashboard {
  inner: DashboardApi,
  cache: QueryCache<DashboardKey>,
  notifier: Notifier,
}

impl CachedDashboard {
  pub fn new(inner: DashboardApi, cache: QueryCache<DashboardKey>, notifier: Notifier) -> Self {
    Self {
      inner,
      cache,
      notifier,
    }
  }

  #[cfg(test)]
  pub fn cache(&self) -> &QueryCache<DashboardKey> {
    &self.cache
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  pub async fn get_events_by_period(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<CalendarEvent>, QueryError> {
    Ok(self.load_events(start, end).await?.data)
  }

  /// Like [`get_events_by_period`](Self::get_events_by_period), reporting where the data came from.
  pub async fn load_events(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<CacheResult<Vec<CalendarEvent>>, QueryError> {
    let inner = self.inner.clone();
    self
      .cache
      .query(DashboardKey::Events { start, end }, move || async move {
        inner.get_events_by_period(start, end).await
      })
      .await
  }

  pub async fn get_holidays(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<Holiday>, QueryError> {
    let inner = self.inner.clone();
    let result = self
      .cache
      .query(DashboardKey::Holidays { start, end }, move || async move {
        inner.get_holidays(start, end).await
      })
      .await?;

    Ok(result.data)
  }

  pub async fn get_users(&self) -> Result<Vec<User>, QueryError> {
    let inner = self.inner.clone();
    let result = self
      .cache
      .query(DashboardKey::Users, move || async move {
        inner.get_users().await
      })
      .await?;

    Ok(result.data)
  }

  /// Force the next read of this period to hit the network.
  pub fn invalidate_events(&self, start: NaiveDate, end: NaiveDate) {
    self
      .cache
      .invalidate(&[Invalidate::Exact(DashboardKey::Events { start, end })]);
  }

  /// Inline state of an events query, for rendering without fetching.
  pub fn events_state(&self, start: NaiveDate, end: NaiveDate) -> QueryState<Vec<CalendarEvent>> {
    self.cache.state(&DashboardKey::Events { start, end })
  }

  // ==========================================================================
  // Writes
  // ==========================================================================

  pub async fn post_schedule(&self, schedule: NewSchedule) -> Result<Schedule, QueryError> {
    let inner = self.inner.clone();
    let result = self
      .cache
      .mutate(
        move || async move { inner.post_schedule(&schedule).await },
        &[Invalidate::Scope(DashboardScope::Events)],
      )
      .await;

    self.report(&result, "Schedule created", "Failed to create schedule");
    result
  }

  pub async fn delete_schedule(&self, id: i64) -> Result<(), QueryError> {
    let inner = self.inner.clone();
    let result = self
      .cache
      .mutate(
        move || async move { inner.delete_schedule(id).await },
        &[Invalidate::Scope(DashboardScope::Events)],
      )
      .await;

    self.report(&result, "Schedule deleted", "Failed to delete schedule");
    result
  }

  /// Log in. Cached reads from any previous session are dropped.
  pub async fn login(&self, id: &str, pw: &str) -> Result<Session, QueryError> {
    let result = self.cache.mutate(|| self.inner.login(id, pw), &[]).await;
    if result.is_ok() {
      self.cache.clear();
    }

    self.report(&result, "Logged in", "Login failed");
    result
  }

  /// Log out and drop every cached read.
  pub async fn logout(&self) -> Result<(), QueryError> {
    let result = self.cache.mutate(|| self.inner.logout(), &[]).await;
    self.cache.clear();

    self.report(&result, "Logged out", "Logout failed");
    result
  }

  fn report<T>(&self, result: &Result<T, QueryError>, success: &str, failure: &str) {
    match result {
      Ok(_) => self.notifier.success(success),
      Err(e) => self.notifier.error(format!("{}: {}", failure, e)),
    }
  }
}
