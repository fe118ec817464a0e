//! Serde types matching the backend's snake_case records.
//!
//! Every documented field is required: a record missing one fails to
//! deserialize instead of being translated partially.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::{
  CalendarEvent, Holiday, NewSchedule, Role, Schedule, Session, SessionUser, User,
};

// ============================================================================
// Calendar
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCalendarEvent {
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

// ============================================================================
// Holidays
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiHoliday {
  pub holiday_date: NaiveDate,
  pub holiday_name: String,
}

// ============================================================================
// Users and login
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUser {
  pub user_no: i64,
  pub user_id: String,
  pub user_name: String,
  pub user_email: String,
  pub user_role: String,
}

#[derive(Debug, Serialize)]
pub struct ApiLoginRequest<'a> {
  pub id: &'a str,
  pub pw: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiLoginUser {
  pub id: String,
  pub name: String,
  pub email: String,
  pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiLoginResponse {
  pub token: String,
  pub user: ApiLoginUser,
}

// ============================================================================
// Schedules
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiNewSchedule {
  pub user_id: i64,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub schedule_type: String,
  pub schedule_desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiSchedule {
  pub schedule_id: i64,
  pub user_id: i64,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub schedule_type: String,
  pub schedule_desc: String,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiCalendarEvent> for CalendarEvent {
  fn from(e: ApiCalendarEvent) -> Self {
    CalendarEvent {
      user_no: e.user_no,
      user_name: e.user_name,
      calendar_name: e.calendar_name,
      calendar_type: e.calendar_type,
      calendar_desc: e.calendar_desc,
      start_date: e.start_date,
      end_date: e.end_date,
      domain_type: e.domain_type,
      history_ids: e.history_ids,
      schedule_id: e.schedule_id,
    }
  }
}

impl From<CalendarEvent> for ApiCalendarEvent {
  fn from(e: CalendarEvent) -> Self {
    ApiCalendarEvent {
      user_no: e.user_no,
      user_name: e.user_name,
      calendar_name: e.calendar_name,
      calendar_type: e.calendar_type,
      calendar_desc: e.calendar_desc,
      start_date: e.start_date,
      end_date: e.end_date,
      domain_type: e.domain_type,
      history_ids: e.history_ids,
      schedule_id: e.schedule_id,
    }
  }
}

impl From<ApiHoliday> for Holiday {
  fn from(h: ApiHoliday) -> Self {
    Holiday {
      date: h.holiday_date,
      name: h.holiday_name,
    }
  }
}

impl From<ApiUser> for User {
  fn from(u: ApiUser) -> Self {
    User {
      user_no: u.user_no,
      id: u.user_id,
      name: u.user_name,
      email: u.user_email,
      role: Role::from_backend(&u.user_role),
    }
  }
}

impl From<ApiLoginResponse> for Session {
  fn from(resp: ApiLoginResponse) -> Self {
    let u = resp.user;
    Session {
      token: resp.token,
      user: SessionUser {
        id: u.id,
        name: u.name,
        email: u.email,
        role: Role::from_backend(&u.role),
      },
    }
  }
}

impl From<&NewSchedule> for ApiNewSchedule {
  fn from(s: &NewSchedule) -> Self {
    ApiNewSchedule {
      user_id: s.user_no,
      start_date: s.start_date,
      end_date: s.end_date,
      schedule_type: s.schedule_type.clone(),
      schedule_desc: s.description.clone(),
    }
  }
}

impl From<ApiSchedule> for Schedule {
  fn from(s: ApiSchedule) -> Self {
    Schedule {
      id: s.schedule_id,
      user_no: s.user_id,
      start_date: s.start_date,
      end_date: s.end_date,
      schedule_type: s.schedule_type,
      description: s.schedule_desc,
    }
  }
}
