//! UI-facing records. Serialized in camelCase.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A calendar entry (vacation, schedule, ...) within a queried period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
  pub user_no: i64,
  pub user_name: String,
  pub calendar_name: String,
  pub calendar_type: String,
  pub calendar_desc: String,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub domain_type: String,
  pub history_ids: Vec<i64>,
  pub schedule_id: i64,
}

/// Public holiday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
  pub date: NaiveDate,
  pub name: String,
}

/// Normalized user role. Unrecognized backend values are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
  Admin,
  User,
  Other(String),
}

impl Role {
  pub fn from_backend(value: &str) -> Self {
    match value.trim().to_ascii_uppercase().as_str() {
      "ADMIN" => Role::Admin,
      "USER" => Role::User,
      _ => Role::Other(value.to_string()),
    }
  }

  pub fn as_backend(&self) -> &str {
    match self {
      Role::Admin => "ADMIN",
      Role::User => "USER",
      Role::Other(value) => value,
    }
  }
}

impl From<String> for Role {
  fn from(value: String) -> Self {
    Role::from_backend(&value)
  }
}

impl From<Role> for String {
  fn from(role: Role) -> Self {
    role.as_backend().to_string()
  }
}

/// Employee record from the user list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub user_no: i64,
  pub id: String,
  pub name: String,
  pub email: String,
  pub role: Role,
}

/// The user attached to a login response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
  pub id: String,
  pub name: String,
  pub email: String,
  pub role: Role,
}

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub token: String,
  pub user: SessionUser,
}

/// Input for creating a schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSchedule {
  pub user_no: i64,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub schedule_type: String,
  pub description: String,
}

/// A schedule as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
  pub id: i64,
  pub user_no: i64,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub schedule_type: String,
  pub description: String,
}
