use std::path::PathBuf;

/// Get the default base path for Timble data (logs)
///
/// Respects the following environment variables (in order of precedence):
/// 1. DATA_DIR - explicit data directory override
/// 2. XDG_DATA_HOME - standard XDG data home directory
/// 3. dirs::data_local_dir() - platform default
pub fn default_data_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("DATA_DIR") {
    return PathBuf::from(dir);
  }

  if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
    return PathBuf::from(xdg_data).join("timble");
  }

  dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("timble")
}

/// Directory rolling log files are written to
pub fn default_log_dir() -> PathBuf {
  default_data_dir().join("logs")
}
