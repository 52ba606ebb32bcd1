use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::Resource;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// List shown at startup
  #[serde(default, deserialize_with = "deserialize_resource")]
  pub default_resource: Resource,
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  /// Initial location query, e.g. "?deliveryStatus=DELIVERED"
  pub start_url: Option<String>,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Keep lookup lists in a session-scoped SQLite table as well as memory
  #[serde(default = "default_true")]
  pub persist_session: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      persist_session: true,
    }
  }
}

fn default_page_size() -> u32 {
  20
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_true() -> bool {
  true
}

fn deserialize_resource<'de, D>(deserializer: D) -> Result<Resource, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let s = String::deserialize(deserializer)?;
  s.parse().map_err(serde::de::Error::custom)
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./lensdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/lensdesk/config.yaml
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
        "No configuration file found. Create one at ~/.config/lensdesk/config.yaml\n\
                 with at least:\n\n  api:\n    url: https://api.example.com/v1"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("lensdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("lensdesk").join("config.yaml");
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
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    if config.page_size == 0 {
      return Err(eyre!("page_size must be at least 1"));
    }
    Ok(config)
  }

  /// Get the API token from environment variables.
  ///
  /// Checks LENSDESK_API_TOKEN first, then LENSDESK_TOKEN. A missing token
  /// is not an error; requests go out unauthenticated.
  pub fn api_token() -> Option<String> {
    std::env::var("LENSDESK_API_TOKEN")
      .or_else(|_| std::env::var("LENSDESK_TOKEN"))
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}
