use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const API_URL_ENV: &str = "HRDASH_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Origin plus path prefix for every backend call
  pub base_url: String,
  /// Path of the token refresh endpoint; a 401 from it is never retried
  #[serde(default = "default_refresh_path")]
  pub refresh_path: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds a successful read is served without refetching
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// Seconds an unused entry is retained
  #[serde(default = "default_gc_secs")]
  pub gc_secs: u64,
}

impl CacheConfig {
  pub fn stale_time(&self) -> Duration {
    Duration::from_secs(self.stale_secs)
  }

  pub fn gc_time(&self) -> Duration {
    Duration::from_secs(self.gc_secs)
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
      gc_secs: default_gc_secs(),
    }
  }
}

fn default_refresh_path() -> String {
  "/auth/refresh".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_stale_secs() -> u64 {
  300
}

fn default_gc_secs() -> u64 {
  600
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./hrdash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/hrdash/config.yaml
  ///
  /// `HRDASH_API_URL` overrides `api.base_url`, and is enough on its own when
  /// no file exists.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let env_url = std::env::var(API_URL_ENV).ok();

    let mut config = match (path, env_url.as_deref()) {
      (Some(p), _) => Self::load_from_path(&p)?,
      (None, Some(url)) => Self::with_base_url(url),
      (None, None) => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/hrdash/config.yaml\n\
                 or set {}.",
          API_URL_ENV
        ))
      }
    };

    if let Some(url) = env_url {
      config.api.base_url = url;
    }

    config.validate()?;
    Ok(config)
  }

  pub fn with_base_url(base_url: &str) -> Self {
    Self {
      api: ApiConfig {
        base_url: base_url.to_string(),
        refresh_path: default_refresh_path(),
        timeout_secs: default_timeout_secs(),
      },
      cache: CacheConfig::default(),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("hrdash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("hrdash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    let url = url::Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url '{}': {}", self.api.base_url, e))?;

    if !matches!(url.scheme(), "http" | "https") {
      return Err(eyre!(
        "api.base_url must be http or https, got '{}'",
        url.scheme()
      ));
    }
    if !self.api.refresh_path.starts_with('/') {
      return Err(eyre!(
        "api.refresh_path must start with '/', got '{}'",
        self.api.refresh_path
      ));
    }

    Ok(())
  }

  /// Get the login password from the environment.
  ///
  /// Checks HRDASH_PASSWORD.
  pub fn get_password() -> Result<String> {
    std::env::var("HRDASH_PASSWORD")
      .map_err(|_| eyre!("Password not given. Pass --password or set HRDASH_PASSWORD."))
  }
}

/// Directory for the session database and logs.
pub fn data_dir() -> Option<PathBuf> {
  dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .map(|p| p.join("hrdash"))
}
