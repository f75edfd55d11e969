//! Git-backed mirror.
//!
//! Every call shells out to `git -C <dir> ...`. A directory is considered
//! mirrored when it sits inside a work tree that has the configured remote.

use std::{
  path::{Path, PathBuf},
  process::Output,
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use super::mirror::{Mirror, MirrorError, PullOutcome};

#[derive(Debug, Clone)]
pub struct GitMirror {
  git: PathBuf,
  remote: String,
}

impl GitMirror {
  pub fn new(git: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
    Self {
      git: git.into(),
      remote: remote.into(),
    }
  }

  async fn run(&self, dir: &Path, args: &[&str]) -> Result<Output, MirrorError> {
    trace!(dir = %dir.display(), ?args, "Running git");
    Command::new(&self.git)
      .arg("-C")
      .arg(dir)
      .args(args)
      .env("GIT_TERMINAL_PROMPT", "0")
      .kill_on_drop(true)
      .output()
      .await
      .map_err(|source| MirrorError::Spawn {
        program: self.git.display().to_string(),
        source,
      })
  }

  /// Run and require success, returning trimmed stdout.
  async fn run_ok(&self, dir: &Path, args: &[&str]) -> Result<String, MirrorError> {
    let output = self.run(dir, args).await?;
    if !output.status.success() {
      return Err(MirrorError::Command {
        command: format!("git {}", args.join(" ")),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  async fn ensure_configured(&self, dir: &Path) -> Result<(), MirrorError> {
    let not_configured = || MirrorError::NotConfigured { path: dir.to_path_buf() };

    if !dir.is_dir() {
      return Err(not_configured());
    }

    let inside = self.run(dir, &["rev-parse", "--is-inside-work-tree"]).await?;
    if !inside.status.success() || String::from_utf8_lossy(&inside.stdout).trim() != "true" {
      return Err(not_configured());
    }

    let remotes = self.run_ok(dir, &["remote"]).await?;
    if !remotes.lines().any(|r| r.trim() == self.remote) {
      debug!(dir = %dir.display(), remote = %self.remote, "Remote not configured");
      return Err(not_configured());
    }
    Ok(())
  }

  async fn current_head(&self, dir: &Path) -> Result<Option<String>, MirrorError> {
    let output = self.run(dir, &["rev-parse", "--verify", "--quiet", "HEAD"]).await?;
    if !output.status.success() {
      // Unborn branch
      return Ok(None);
    }
    let head = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!head.is_empty()).then_some(head))
  }
}

impl Default for GitMirror {
  fn default() -> Self {
    Self::new("git", "origin")
  }
}

#[async_trait]
impl Mirror for GitMirror {
  async fn pull(&self, dir: &Path) -> Result<PullOutcome, MirrorError> {
    self.ensure_configured(dir).await?;

    let before = self.current_head(dir).await?;
    self.run_ok(dir, &["pull", "--ff-only", "--quiet", self.remote.as_str()]).await?;
    let after = self.current_head(dir).await?;

    let outcome = if before == after {
      PullOutcome::Unchanged
    } else {
      PullOutcome::Changed
    };
    debug!(dir = %dir.display(), ?outcome, "Pulled mirror");
    Ok(outcome)
  }

  async fn head(&self, dir: &Path) -> Result<Option<String>, MirrorError> {
    self.ensure_configured(dir).await?;
    self.current_head(dir).await
  }
}
