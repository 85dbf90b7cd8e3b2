use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the workspace backend, e.g. "https://api.example.com/v1/"
  pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds before fetched collections are considered stale.
  ///
  /// One window shared by every collection type; there are deliberately no
  /// per-collection TTLs.
  #[serde(default = "default_stale_after_secs")]
  pub stale_after_secs: u64,
}

fn default_stale_after_secs() -> u64 {
  180
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_after_secs: default_stale_after_secs(),
    }
  }
}

impl CacheConfig {
  /// The configured window as a duration.
  ///
  /// Values beyond what `chrono` can represent clamp to the maximum
  /// duration, which in practice means "never stale".
  pub fn stale_after(&self) -> chrono::Duration {
    i64::try_from(self.stale_after_secs)
      .ok()
      .and_then(chrono::Duration::try_seconds)
      .unwrap_or(chrono::Duration::MAX)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./satchel.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/satchel/config.yaml
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/satchel/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("satchel.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("satchel").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the backend API token from the environment.
  ///
  /// Checks SATCHEL_API_TOKEN.
  pub fn api_token() -> Result<String> {
    std::env::var("SATCHEL_API_TOKEN")
      .map_err(|_| eyre!("API token not found. Set the SATCHEL_API_TOKEN environment variable."))
  }
}
