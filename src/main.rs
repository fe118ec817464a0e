mod api;
mod app;
mod cache;
mod commands;
mod config;
mod http;
mod loading;
mod notify;
mod session;

#[cfg(test)]
mod testing;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hrdash")]
#[command(about = "Command-line client for the company scheduling dashboard")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/hrdash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Keep the session in memory only; nothing is persisted
  #[arg(long)]
  ephemeral: bool,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Logs go to a file; stdout carries command output
  let _log_guard = init_logging()?;

  let config = config::Config::load(args.config.as_deref())?;

  let app = app::App::new(config, args.ephemeral)?;
  app.run(args.command).await?;

  Ok(())
}

fn init_logging() -> Result<WorkerGuard> {
  let log_dir = config::data_dir()
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("logs");
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&log_dir, "hrdash.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("HRDASH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}
