//! Command-line surface.

use chrono::NaiveDate;
use clap::Subcommand;

use crate::session::Route;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Log in and persist the session token
  Login {
    /// Account id
    #[arg(long)]
    id: String,
    /// Password (default: $HRDASH_PASSWORD)
    #[arg(long)]
    password: Option<String>,
  },
  /// Log out and forget the session token
  Logout,
  /// Show session state and where navigation lands
  Status,
  /// Calendar events in a period
  Events {
    #[arg(long)]
    start: NaiveDate,
    #[arg(long)]
    end: NaiveDate,
  },
  /// Public holidays in a period
  Holidays {
    #[arg(long)]
    start: NaiveDate,
    #[arg(long)]
    end: NaiveDate,
  },
  /// List users
  Users,
  /// Create or delete schedules
  #[command(subcommand)]
  Schedule(ScheduleCommand),
  /// Re-read a period repeatedly to observe cache behaviour
  Watch {
    #[arg(long)]
    start: NaiveDate,
    #[arg(long)]
    end: NaiveDate,
    /// Seconds between reads
    #[arg(long, default_value_t = 5)]
    interval: u64,
    /// Number of reads
    #[arg(long, default_value_t = 3)]
    count: u32,
    /// Invalidate the period before every read
    #[arg(long)]
    no_cache: bool,
  },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScheduleCommand {
  /// Create a schedule
  Add {
    /// User number the schedule belongs to
    #[arg(long)]
    user: i64,
    #[arg(long)]
    start: NaiveDate,
    #[arg(long)]
    end: NaiveDate,
    /// Schedule type, e.g. VACATION
    #[arg(long = "type")]
    schedule_type: String,
    #[arg(long, default_value = "")]
    description: String,
  },
  /// Delete a schedule by id
  Delete { id: i64 },
}

impl Command {
  /// The view this command stands in for, used for session gating.
  pub fn route(&self) -> Route {
    match self {
      Command::Login { .. } => Route::Login,
      Command::Logout | Command::Status => Route::Home,
      Command::Events { .. } | Command::Holidays { .. } | Command::Watch { .. } => {
        Route::Calendar
      }
      Command::Users => Route::User,
      Command::Schedule(_) => Route::Work,
    }
  }
}
