//! Mirror synchronization and the cache invalidation it drives.
//!
//! Reads never wait on a pull. [`SyncCoordinator::schedule_pull`] hands the pull
//! to a tracked background task and returns immediately; when the task sees new
//! upstream content it invalidates the channel's cache entries so the next read
//! rebuilds the page.

mod git;
mod mirror;

use std::{path::PathBuf, sync::Arc};

use serde::Serialize;
use timble_core::Channel;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

pub use self::{
  git::GitMirror,
  mirror::{Mirror, MirrorError, NoMirror, PullOutcome},
};
use crate::cache::{TtlCache, page_key, sync_status_key};

/// Rendered pages, keyed by [`page_key`].
pub type PageCache = TtlCache<Arc<str>>;

/// Mirror status, keyed by [`sync_status_key`].
pub type StatusCache = TtlCache<MirrorStatus>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorStatus {
  pub channel: String,
  pub head: Option<String>,
  pub configured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  pub channel: String,
  pub outcome: PullOutcome,
}

pub struct SyncCoordinator {
  mirror: Arc<dyn Mirror>,
  pages: Arc<PageCache>,
  statuses: Arc<StatusCache>,
  tracker: TaskTracker,
}

impl SyncCoordinator {
  pub fn new(mirror: Arc<dyn Mirror>, pages: Arc<PageCache>, statuses: Arc<StatusCache>) -> Self {
    Self {
      mirror,
      pages,
      statuses,
      tracker: TaskTracker::new(),
    }
  }

  /// Drop every cached artifact for `channel`, including the pseudo-channel
  /// page. Idempotent.
  pub fn invalidate(&self, channel: &Channel) {
    invalidate_channel(&self.pages, &self.statuses, channel);
  }

  /// Start a background pull of `dir` for `channel`. Must be called within a
  /// tokio runtime. Overlapping pulls for the same channel are not coalesced.
  pub fn schedule_pull(&self, channel: &Channel, dir: PathBuf) {
    let mirror = self.mirror.clone();
    let pages = self.pages.clone();
    let statuses = self.statuses.clone();
    let channel = channel.clone();

    self.tracker.spawn(async move {
      match mirror.pull(&dir).await {
        Ok(PullOutcome::Changed) => {
          debug!(channel = %channel, "Mirror changed, invalidating cache");
          invalidate_channel(&pages, &statuses, &channel);
        }
        Ok(PullOutcome::Unchanged) => {
          debug!(channel = %channel, "Mirror unchanged");
        }
        Err(e) if e.is_not_configured() => {
          debug!(channel = %channel, "No mirror configured, skipping pull");
        }
        Err(e) => {
          warn!(channel = %channel, error = %e, "Background pull failed");
        }
      }
    });
  }

  /// Pull `dir` and wait for the outcome.
  pub async fn pull_now(&self, channel: &Channel, dir: PathBuf) -> Result<PullOutcome, MirrorError> {
    let outcome = self.mirror.pull(&dir).await?;
    if outcome == PullOutcome::Changed {
      self.invalidate(channel);
    }
    Ok(outcome)
  }

  /// Mirror status for `channel`, from cache when fresh.
  pub async fn status(&self, channel: &Channel, dir: PathBuf) -> Result<MirrorStatus, MirrorError> {
    let key = sync_status_key(channel);
    if let Some(status) = self.statuses.get(&key) {
      return Ok(status);
    }
    let seen = self.statuses.generation(&key);

    let status = match self.mirror.head(&dir).await {
      Ok(head) => MirrorStatus {
        channel: channel.to_string(),
        head,
        configured: true,
      },
      Err(e) if e.is_not_configured() => MirrorStatus {
        channel: channel.to_string(),
        head: None,
        configured: false,
      },
      Err(e) => return Err(e),
    };

    if !self.statuses.set_if_current(key, seen, status.clone()) {
      debug!(channel = %channel, "Mirror status invalidated while reading, not caching");
    }
    Ok(status)
  }

  /// Number of background pulls still running.
  pub fn in_flight(&self) -> usize {
    self.tracker.len()
  }

  /// Wait for every background pull started so far.
  pub async fn drain(&self) {
    self.tracker.close();
    self.tracker.wait().await;
    self.tracker.reopen();
  }
}

fn invalidate_channel(pages: &PageCache, statuses: &StatusCache, channel: &Channel) {
  pages.invalidate(&page_key(channel));
  statuses.invalidate(&sync_status_key(channel));
  if !channel.is_all() {
    pages.invalidate(&page_key(&Channel::All));
  }
}
