use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub ui: UiConfig,
  /// Where filters and sort order are kept between runs
  /// (default: $XDG_DATA_HOME/hrdesk/state.db)
  pub state_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  /// Per-request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// How long a listing stays fresh, in seconds. 0 disables caching.
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { ttl_secs: 60 }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
  /// Quiet period before a search term is sent, in milliseconds
  pub debounce_ms: u64,
  /// Extra rows rendered above and below the viewport
  pub overscan: usize,
  /// Rows requested per API page
  pub page_size: u32,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self {
      debounce_ms: 300,
      overscan: 5,
      page_size: 500,
    }
  }
}

fn default_timeout_secs() -> u64 {
  15
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> Duration {
    Duration::from_secs(self.ttl_secs)
  }
}

impl UiConfig {
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./hrdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/hrdesk/config.yaml
  ///
  /// `api_url` overrides the file's url. With it, a missing config file is
  /// not an error and defaults are used for everything else.
  pub fn load(explicit_path: Option<&Path>, api_url: Option<String>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match (path, api_url) {
      (Some(p), url) => {
        let mut config = Self::load_from_path(&p)?;
        if let Some(url) = url {
          config.api.url = url;
        }
        Ok(config)
      }
      (None, Some(url)) => Ok(Self::for_url(url)),
      (None, None) => Err(eyre!(
        "No configuration file found. Create one at ~/.config/hrdesk/config.yaml\n\
                 with at least:\n\n  api:\n    url: https://hr.example.com/api"
      )),
    }
  }

  /// Default configuration against `url`
  pub fn for_url(url: String) -> Self {
    Self {
      api: ApiConfig {
        url,
        timeout_secs: default_timeout_secs(),
      },
      title: None,
      cache: CacheConfig::default(),
      ui: UiConfig::default(),
      state_path: None,
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("hrdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("hrdesk").join("config.yaml");
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

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Get the API token from environment variables.
  ///
  /// Checks HRDESK_API_TOKEN. A missing token is not an error: some
  /// deployments sit behind an authenticating proxy.
  pub fn get_api_token() -> Option<String> {
    std::env::var("HRDESK_API_TOKEN")
      .ok()
      .filter(|t| !t.is_empty())
  }

  /// Header title: configured title or the API host.
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    url::Url::parse(&self.api.url)
      .ok()
      .and_then(|u| u.host_str().map(String::from))
      .unwrap_or_else(|| self.api.url.clone())
  }
}
