use chrono::NaiveDate;
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::types::NewSchedule;
use crate::api::{CachedDashboard, DashboardApi};
use crate::cache::{CacheSource, QueryCache, QueryState};
use crate::commands::{Command, ScheduleCommand};
use crate::config::Config;
use crate::http::{ApiClient, ApiError, ReloadStoredToken};
use crate::loading::LoadingCoordinator;
use crate::notify::Notifier;
use crate::session::{
  CredentialStore, MemoryCredentialStore, Route, Router, SessionGate, SqliteCredentialStore,
  StoredTokenCheck,
};

/// Application context, built once at startup and passed explicitly.
pub struct App {
  config: Config,
  loading: LoadingCoordinator,
  notifier: Notifier,
  credentials: Arc<dyn CredentialStore>,
  gate: SessionGate,
  router: Router,
  dashboard: CachedDashboard,
}

impl App {
  /// Build the context. With `ephemeral`, the session lives in memory only.
  pub fn new(config: Config, ephemeral: bool) -> Result<Self> {
    let credentials: Arc<dyn CredentialStore> = if ephemeral {
      Arc::new(MemoryCredentialStore::default())
    } else {
      Arc::new(
        SqliteCredentialStore::open()
          .map_err(|e| eyre!("Failed to open session store: {}", e))?,
      )
    };
    Self::with_credentials(config, credentials)
  }

  pub fn with_credentials(config: Config, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
    let loading = LoadingCoordinator::new();
    let http = ApiClient::new(&config.api, loading.clone(), credentials.clone())
      .map_err(|e| eyre!("Failed to create API client: {}", e))?
      .with_reauthenticator(Arc::new(ReloadStoredToken::new(credentials.clone())));

    let cache = QueryCache::new()
      .with_stale_time(config.cache.stale_time())
      .with_gc_time(config.cache.gc_time());
    let notifier = Notifier::default();
    let dashboard = CachedDashboard::new(
      DashboardApi::new(http, credentials.clone()),
      cache,
      notifier.clone(),
    );

    let gate = SessionGate::new(Arc::new(StoredTokenCheck::new(credentials.clone())));
    let router = Router::new(gate.clone());

    Ok(Self {
      config,
      loading,
      notifier,
      credentials,
      gate,
      router,
      dashboard,
    })
  }

  /// Resolve the session for this run and return the landing route.
  pub fn mount(&self) -> Route {
    self.gate.resolve();
    self.router.navigate(Route::Home.path())
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    let landing = self.mount();
    debug!("Mounted at {}", landing.path());

    let mut notifications = self.notifier.subscribe();
    let loading_log = self.spawn_loading_log();

    let result = self.dispatch(command).await;

    loading_log.abort();
    while let Ok(notification) = notifications.try_recv() {
      eprintln!("{}", notification);
    }

    result
  }

  async fn dispatch(&self, command: Command) -> Result<()> {
    if !matches!(command, Command::Status) {
      let requested = command.route();
      let landed = self.router.navigate(requested.path());
      if landed != requested {
        return match landed {
          Route::Login => Err(eyre!("Not logged in. Run `hrdash login --id <id>` first.")),
          _ => {
            println!("Already logged in. Run `hrdash logout` first.");
            Ok(())
          }
        };
      }
    }

    match command {
      Command::Login { id, password } => {
        let password = match password {
          Some(p) => p,
          None => Config::get_password()?,
        };
        let session = self
          .dashboard
          .login(&id, &password)
          .await
          .map_err(|e| eyre!("Login failed: {}", e))?;
        print_json(&session.user)
      }
      Command::Logout => self
        .dashboard
        .logout()
        .await
        .map_err(|e| eyre!("Logout failed: {}", e)),
      Command::Status => self.print_status(),
      Command::Events { start, end } => {
        check_period(start, end)?;
        let events = self
          .dashboard
          .get_events_by_period(start, end)
          .await
          .map_err(|e| eyre!("Failed to load events: {}", e))?;
        print_json(&events)
      }
      Command::Holidays { start, end } => {
        check_period(start, end)?;
        let holidays = self
          .dashboard
          .get_holidays(start, end)
          .await
          .map_err(|e| eyre!("Failed to load holidays: {}", e))?;
        print_json(&holidays)
      }
      Command::Users => {
        let users = self
          .dashboard
          .get_users()
          .await
          .map_err(|e| eyre!("Failed to load users: {}", e))?;
        print_json(&users)
      }
      Command::Schedule(ScheduleCommand::Add {
        user,
        start,
        end,
        schedule_type,
        description,
      }) => {
        check_period(start, end)?;
        let created = self
          .dashboard
          .post_schedule(NewSchedule {
            user_no: user,
            start_date: start,
            end_date: end,
            schedule_type,
            description,
          })
          .await
          .map_err(|e| eyre!("Failed to create schedule: {}", e))?;
        print_json(&created)
      }
      Command::Schedule(ScheduleCommand::Delete { id }) => self
        .dashboard
        .delete_schedule(id)
        .await
        .map_err(|e| eyre!("Failed to delete schedule: {}", e)),
      Command::Watch {
        start,
        end,
        interval,
        count,
        no_cache,
      } => {
        check_period(start, end)?;
        self
          .watch(start, end, Duration::from_secs(interval), count, no_cache)
          .await
      }
    }
  }

  /// Re-read one period. A failed read is reported from the inline query
  /// state and the watch goes on; a rejected session ends it.
  async fn watch(
    &self,
    start: NaiveDate,
    end: NaiveDate,
    interval: Duration,
    count: u32,
    no_cache: bool,
  ) -> Result<()> {
    for read in 1..=count {
      if no_cache {
        self.dashboard.invalidate_events(start, end);
      }

      match self.dashboard.load_events(start, end).await {
        Ok(result) => {
          let source = match result.source {
            CacheSource::Network => "network",
            CacheSource::Shared => "shared request",
            CacheSource::Cache => "cache",
          };
          info!(
            "Watch read {} of {}: {} events from {}",
            read,
            count,
            result.data.len(),
            source
          );
          println!("read {}: {} events ({})", read, result.data.len(), source);
        }
        Err(e) if matches!(e.api_error(), ApiError::Unauthorized { .. }) => {
          return Err(eyre!("Session rejected: {}", e));
        }
        Err(_) => {
          let line = describe_state(&self.dashboard.events_state(start, end));
          warn!("Watch read {} of {} failed: {}", read, count, line);
          println!("read {}: {}", read, line);
        }
      }

      if read < count {
        tokio::time::sleep(interval).await;
      }
    }

    Ok(())
  }

  fn print_status(&self) -> Result<()> {
    let user_key = self
      .credentials
      .load_user_key()
      .map_err(|e| eyre!("Failed to read session: {}", e))?;

    let routes: serde_json::Map<String, serde_json::Value> = [
      Route::Home,
      Route::Calendar,
      Route::Work,
      Route::Culture,
      Route::Rule,
      Route::User,
      Route::Login,
    ]
    .iter()
    .map(|route| {
      (
        route.path().to_string(),
        json!(self.router.navigate(route.path()).path()),
      )
    })
    .collect();

    print_json(&json!({
      "session": format!("{:?}", self.gate.state()),
      "user": user_key,
      "baseUrl": self.config.api.base_url,
      "routes": routes,
    }))
  }

  fn spawn_loading_log(&self) -> JoinHandle<()> {
    let mut rx = self.loading.subscribe();
    tokio::spawn(async move {
      let mut was_loading = false;
      while rx.changed().await.is_ok() {
        let state = *rx.borrow_and_update();
        if state.is_loading() != was_loading {
          was_loading = state.is_loading();
          debug!("Loading: {} ({} in flight)", was_loading, state.in_flight);
        }
      }
    })
  }
}

/// One-line rendering of an inline query state.
fn describe_state<T>(state: &QueryState<T>) -> String {
  match state {
    QueryState::Idle => "not loaded".to_string(),
    QueryState::Loading => "loading".to_string(),
    QueryState::Success(_) => "loaded".to_string(),
    QueryState::Error(message) => format!("failed ({})", message),
  }
}

fn check_period(start: NaiveDate, end: NaiveDate) -> Result<()> {
  if end < start {
    return Err(eyre!("Period ends ({}) before it starts ({})", end, start));
  }
  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
