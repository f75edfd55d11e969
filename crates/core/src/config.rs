//! Configuration system for Timble with per-repository overrides.
//!
//! Config priority: explicit path > repository-relative (.timble/config.toml) > user (~/.config/timble/config.toml)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

// ============================================================================
// Store Configuration
// ============================================================================

/// Where messages live on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  /// Repository root; messages are stored under `<root>/message/<channel>/`
  pub root: PathBuf,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      root: PathBuf::from("."),
    }
  }
}

// ============================================================================
// Page Configuration
// ============================================================================

/// Rendered page settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
  /// Maximum number of messages on one page (default: 50)
  pub max_messages: usize,

  /// Characters shown before a message body is truncated (default: 300)
  pub max_message_length: usize,

  /// Page title; the channel is appended as " - #<channel>"
  pub title: String,

  /// Directory holding chat_page.html, chat_message.html and chat_message_form.html.
  /// Built-in templates are used for any file that is missing.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub template_dir: Option<PathBuf>,
}

impl Default for PageConfig {
  fn default() -> Self {
    Self {
      max_messages: 50,
      max_message_length: 300,
      title: "Timble Chat".to_string(),
      template_dir: None,
    }
  }
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Time-to-live settings for the two in-memory caches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Rendered page TTL in seconds (default: 30)
  pub page_ttl_secs: u64,

  /// Mirror status TTL in seconds (default: 60)
  pub sync_status_ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      page_ttl_secs: 30,
      sync_status_ttl_secs: 60,
    }
  }
}

// ============================================================================
// Sync Configuration
// ============================================================================

/// External mirror (git) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Pull from the mirror on cache misses (default: true)
  pub enabled: bool,

  /// git executable (default: "git")
  pub git_binary: String,

  /// Remote to pull from (default: "origin")
  pub remote: String,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      git_binary: "git".to_string(),
      remote: "origin".to_string(),
    }
  }
}

// ============================================================================
// Submit Configuration
// ============================================================================

/// Limits applied to submitted messages before they are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
  /// Maximum author length in characters (default: 50)
  pub max_author_len: usize,

  /// Maximum body length in characters (default: 5000)
  pub max_body_len: usize,

  /// Maximum number of tags kept (default: 10)
  pub max_tags: usize,

  /// Maximum length of a single tag in characters (default: 30)
  pub max_tag_len: usize,
}

impl Default for SubmitConfig {
  fn default() -> Self {
    Self {
      max_author_len: 50,
      max_body_len: 5000,
      max_tags: 10,
      max_tag_len: 30,
    }
  }
}

// ============================================================================
// Aggregate Configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
  /// Parser worker threads (0 = available parallelism)
  pub workers: usize,
}

// ============================================================================
// Log Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Log level: "off", "error", "warn", "info", "debug", "trace"
  /// Default: "info"
  pub level: String,

  /// Log file rotation when logging to a file: "daily", "hourly", "never"
  /// Default: "daily"
  pub rotation: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      rotation: "daily".to_string(),
    }
  }
}

// ============================================================================
// Main Configuration
// ============================================================================

/// Timble configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub store: StoreConfig,
  pub page: PageConfig,
  pub cache: CacheConfig,
  pub sync: SyncConfig,
  pub submit: SubmitConfig,
  pub aggregate: AggregateConfig,
  pub log: LogConfig,
}

impl Config {
  /// Load config from an explicit path. Errors are reported, not swallowed.
  pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Load config for a repository, with fallback to user config, then defaults.
  ///
  /// A file that exists but fails to parse is logged and skipped.
  pub fn load_for_repo(repo_path: &Path) -> Self {
    let repo_config = Self::repo_config_path(repo_path);
    if repo_config.exists() {
      match Self::load_from(&repo_config) {
        Ok(config) => return config,
        Err(e) => warn!(error = %e, "Ignoring repository config"),
      }
    }

    if let Some(user_config) = Self::user_config_path()
      && user_config.exists()
    {
      match Self::load_from(&user_config) {
        Ok(config) => return config,
        Err(e) => warn!(error = %e, "Ignoring user config"),
      }
    }

    Self::default()
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }

    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
      return Some(PathBuf::from(path).join("timble").join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("timble").join("config.toml"))
  }

  /// Get the repository-relative config path
  pub fn repo_config_path(repo_path: &Path) -> PathBuf {
    repo_path.join(".timble").join("config.toml")
  }

  /// Directory holding `message/<channel>/` directories
  pub fn message_root(&self) -> PathBuf {
    self.store.root.join("message")
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    let defaults = Config::default();
    format!(
      r#"# Timble Configuration
# Place in .timble/config.toml (repository) or ~/.config/timble/config.toml (user)

# ============================================================================
# Store
# ============================================================================

[store]
# Repository root; messages live under <root>/message/<channel>/
root = "."

# ============================================================================
# Page Rendering
# ============================================================================

[page]
max_messages = {max_messages}
max_message_length = {max_message_length}
title = "{title}"
# Directory with chat_page.html, chat_message.html, chat_message_form.html
# template_dir = "template/html"

# ============================================================================
# Caching
# ============================================================================

[cache]
# Rendered pages are served from memory for this long after a miss
page_ttl_secs = {page_ttl}
# Mirror status lookups are cached slightly longer
sync_status_ttl_secs = {sync_ttl}

# ============================================================================
# External Mirror
# ============================================================================

[sync]
# Pull the channel directory in the background whenever a page is regenerated
enabled = true
git_binary = "git"
remote = "origin"

# ============================================================================
# Submission Limits
# ============================================================================

[submit]
max_author_len = {max_author_len}
max_body_len = {max_body_len}
max_tags = {max_tags}
max_tag_len = {max_tag_len}

# ============================================================================
# Aggregation
# ============================================================================

[aggregate]
# Parser threads (0 = available parallelism)
workers = 0

# ============================================================================
# Logging
# ============================================================================

[log]
# Level: off, error, warn, info, debug, trace (RUST_LOG overrides)
level = "info"
# Rotation when logging to a file: daily, hourly, never
rotation = "daily"
"#,
      max_messages = defaults.page.max_messages,
      max_message_length = defaults.page.max_message_length,
      title = defaults.page.title,
      page_ttl = defaults.cache.page_ttl_secs,
      sync_ttl = defaults.cache.sync_status_ttl_secs,
      max_author_len = defaults.submit.max_author_len,
      max_body_len = defaults.submit.max_body_len,
      max_tags = defaults.submit.max_tags,
      max_tag_len = defaults.submit.max_tag_len,
    )
  }
}
