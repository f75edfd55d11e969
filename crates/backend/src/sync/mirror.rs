//! The external mirror abstraction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PullOutcome {
  /// Local state moved; cached pages for the channel are stale.
  Changed,
  Unchanged,
}

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
  #[error("No mirror configured for {path}")]
  NotConfigured { path: PathBuf },
  #[error("Failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },
  #[error("`{command}` failed ({status}): {stderr}")]
  Command {
    command: String,
    status: String,
    stderr: String,
  },
}

impl MirrorError {
  pub fn is_not_configured(&self) -> bool {
    matches!(self, MirrorError::NotConfigured { .. })
  }
}

/// A remote copy of the message directory that can be pulled from.
#[async_trait]
pub trait Mirror: Send + Sync {
  /// Bring `dir` up to date with the remote.
  async fn pull(&self, dir: &Path) -> Result<PullOutcome, MirrorError>;

  /// Current revision of the checkout containing `dir`, `None` before the first commit.
  async fn head(&self, dir: &Path) -> Result<Option<String>, MirrorError>;
}

/// Used when synchronization is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMirror;

#[async_trait]
impl Mirror for NoMirror {
  async fn pull(&self, dir: &Path) -> Result<PullOutcome, MirrorError> {
    Err(MirrorError::NotConfigured { path: dir.to_path_buf() })
  }

  async fn head(&self, dir: &Path) -> Result<Option<String>, MirrorError> {
    Err(MirrorError::NotConfigured { path: dir.to_path_buf() })
  }
}
