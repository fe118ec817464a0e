use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use crate::http::{ApiClient, ApiError, RequestDescriptor};
use crate::session::CredentialStore;

use super::api_types::{
  ApiCalendarEvent, ApiHoliday, ApiLoginRequest, ApiLoginResponse, ApiNewSchedule, ApiSchedule,
  ApiUser,
};
use super::types::{CalendarEvent, Holiday, NewSchedule, Schedule, Session, User};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Dashboard backend adapter.
///
/// Turns envelopes into domain records: a failure code becomes
/// [`ApiError::Domain`], a malformed payload [`ApiError::Translation`].
#[derive(Clone)]
pub struct DashboardApi {
  http: ApiClient,
  credentials: Arc<dyn CredentialStore>,
}

impl DashboardApi {
  pub fn new(http: ApiClient, credentials: Arc<dyn CredentialStore>) -> Self {
    Self { http, credentials }
  }

  /// Log in and persist the token and user key.
  pub async fn login(&self, id: &str, pw: &str) -> Result<Session, ApiError> {
    let request = RequestDescriptor::post("/login").with_json(&ApiLoginRequest { id, pw })?;

    let response: ApiLoginResponse = self.http.request(&request).await?.into_data()?;
    self.credentials.save(&response.token, &response.user.id)?;
    info!("Logged in as {}", response.user.id);

    Ok(response.into())
  }

  /// Log out. Persisted credentials are removed even if the backend call fails.
  pub async fn logout(&self) -> Result<(), ApiError> {
    let outcome = match self.http.request(&RequestDescriptor::post("/logout")).await {
      Ok(envelope) => envelope.into_unit(),
      Err(e) => Err(e),
    };
    self.credentials.clear()?;
    info!("Logged out");
    outcome
  }

  /// Calendar events overlapping a period.
  pub async fn get_events_by_period(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<CalendarEvent>, ApiError> {
    let request = RequestDescriptor::get("/calendar/period")
      .with_query("startDate", start.format(DATE_FORMAT).to_string())
      .with_query("endDate", end.format(DATE_FORMAT).to_string());

    let events: Vec<ApiCalendarEvent> = self.http.request(&request).await?.into_data()?;
    Ok(events.into_iter().map(CalendarEvent::from).collect())
  }

  /// Public holidays within a period.
  pub async fn get_holidays(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<Holiday>, ApiError> {
    let request = RequestDescriptor::get("/holidays/date")
      .with_query("start", start.format(DATE_FORMAT).to_string())
      .with_query("end", end.format(DATE_FORMAT).to_string());

    let holidays: Vec<ApiHoliday> = self.http.request(&request).await?.into_data()?;
    Ok(holidays.into_iter().map(Holiday::from).collect())
  }

  pub async fn get_users(&self) -> Result<Vec<User>, ApiError> {
    let users: Vec<ApiUser> = self
      .http
      .request(&RequestDescriptor::get("/users"))
      .await?
      .into_data()?;
    Ok(users.into_iter().map(User::from).collect())
  }

  pub async fn post_schedule(&self, schedule: &NewSchedule) -> Result<Schedule, ApiError> {
    let request =
      RequestDescriptor::post("/schedule").with_json(&ApiNewSchedule::from(schedule))?;

    let created: ApiSchedule = self.http.request(&request).await?.into_data()?;
    Ok(created.into())
  }

  pub async fn delete_schedule(&self, id: i64) -> Result<(), ApiError> {
    self
      .http
      .request(&RequestDescriptor::delete(format!("/schedule/{}", id)))
      .await?
      .into_unit()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::session::MemoryCredentialStore;
  use crate::testing::{failed, ok, spawn_backend, test_client};
  use axum::extract::{Path, Query};
  use axum::routing::{delete, get, post};
  use axum::{Json, Router};
  use serde_json::{json, Value};
  use std::collections::HashMap;

  fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
  }

  async fn api_with(routes: Router) -> (DashboardApi, Arc<MemoryCredentialStore>) {
    let base = spawn_backend(routes).await;
    let store = Arc::new(MemoryCredentialStore::default());
    let http = test_client(&base, store.clone());
    (DashboardApi::new(http, store.clone()), store)
  }

  #[tokio::test]
  async fn test_get_events_by_period() {
    let routes = Router::new().route(
      "/calendar/period",
      get(|Query(params): Query<HashMap<String, String>>| async move {
        assert_eq!(params.get("startDate").map(String::as_str), Some("2024-01-01"));
        assert_eq!(params.get("endDate").map(String::as_str), Some("2024-01-31"));
        ok(json!([{
          "user_no": 1,
          "user_name": "A",
          "calendar_name": "C",
          "calendar_type": "T",
          "calendar_desc": "D",
          "start_date": "2024-01-05",
          "end_date": "2024-01-05",
          "domain_type": "X",
          "history_ids": [1],
          "schedule_id": 9
        }]))
      }),
    );
    let (api, _) = api_with(routes).await;

    let events = api
      .get_events_by_period(date("2024-01-01"), date("2024-01-31"))
      .await
      .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].user_no, 1);
    assert_eq!(events[0].schedule_id, 9);
    assert_eq!(events[0].history_ids, vec![1]);
    assert_eq!(events[0].calendar_name, "C");
  }

  #[tokio::test]
  async fn test_failure_code_raises_domain_error() {
    let routes = Router::new().route("/users", get(|| async { failed(500, "db unavailable") }));
    let (api, _) = api_with(routes).await;

    match api.get_users().await {
      Err(ApiError::Domain { code, message }) => {
        assert_eq!(code, 500);
        assert_eq!(message, "db unavailable");
      }
      other => panic!("expected domain error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_malformed_record_fails_whole_query() {
    let routes = Router::new().route(
      "/holidays/date",
      get(|| async {
        ok(json!([
          { "holiday_date": "2024-01-01", "holiday_name": "New Year" },
          { "holiday_date": "2024-03-01" }
        ]))
      }),
    );
    let (api, _) = api_with(routes).await;

    let result = api
      .get_holidays(date("2024-01-01"), date("2024-12-31"))
      .await;
    assert!(matches!(result, Err(ApiError::Translation(_))));
  }

  #[tokio::test]
  async fn test_login_persists_credentials() {
    let routes = Router::new().route(
      "/login",
      post(|Json(body): Json<Value>| async move {
        assert_eq!(body, json!({ "id": "kim", "pw": "secret" }));
        ok(json!({
          "token": "tok-1",
          "user": { "id": "kim", "name": "Kim", "email": "kim@example.com", "role": "ADMIN" }
        }))
      }),
    );
    let (api, store) = api_with(routes).await;

    let session = api.login("kim", "secret").await.unwrap();

    assert_eq!(session.token, "tok-1");
    assert_eq!(session.user.name, "Kim");
    assert_eq!(store.load_token().unwrap().as_deref(), Some("tok-1"));
    assert_eq!(store.load_user_key().unwrap().as_deref(), Some("kim"));
  }

  #[tokio::test]
  async fn test_failed_login_persists_nothing() {
    let routes = Router::new().route("/login", post(|| async { failed(401, "wrong password") }));
    let (api, store) = api_with(routes).await;

    assert!(api.login("kim", "nope").await.is_err());
    assert_eq!(store.load_token().unwrap(), None);
  }

  #[tokio::test]
  async fn test_logout_clears_credentials_even_on_failure() {
    let routes = Router::new().route("/logout", post(|| async { failed(500, "oops") }));
    let (api, store) = api_with(routes).await;
    store.save("tok-1", "kim").unwrap();

    assert!(api.logout().await.is_err());
    assert_eq!(store.load_token().unwrap(), None);
  }

  #[tokio::test]
  async fn test_post_and_delete_schedule() {
    let routes = Router::new()
      .route(
        "/schedule",
        post(|Json(body): Json<Value>| async move {
          ok(json!({
            "schedule_id": 77,
            "user_id": body["user_id"],
            "start_date": body["start_date"],
            "end_date": body["end_date"],
            "schedule_type": body["schedule_type"],
            "schedule_desc": body["schedule_desc"]
          }))
        }),
      )
      .route(
        "/schedule/{id}",
        delete(|Path(id): Path<i64>| async move {
          if id == 77 {
            ok(Value::Null)
          } else {
            failed(404, "no such schedule")
          }
        }),
      );
    let (api, _) = api_with(routes).await;

    let new = NewSchedule {
      user_no: 4,
      start_date: date("2024-02-01"),
      end_date: date("2024-02-02"),
      schedule_type: "VACATION".to_string(),
      description: "family trip".to_string(),
    };
    let created = api.post_schedule(&new).await.unwrap();
    assert_eq!(created.id, 77);
    assert_eq!(created.user_no, 4);
    assert_eq!(created.description, "family trip");

    api.delete_schedule(77).await.unwrap();
    assert!(matches!(
      api.delete_schedule(78).await,
      Err(ApiError::Domain { code: 404, .. })
    ));
  }
}
