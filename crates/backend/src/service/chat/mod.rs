//! The chat service: cached page reads, message writes and mirror sync.
//!
//! Read path: page cache lookup; on a miss, schedule a background pull, then
//! resolve files, aggregate, render and cache unless the page was invalidated
//! in the meantime. Write path: validate, write the file, then synchronously
//! invalidate every cache entry the new message affects.

mod submit;

use std::sync::Arc;

use chrono::Utc;
use timble_core::{Channel, Config, Page, generate_message_id};
use tracing::{debug, info, warn};

pub use self::submit::{SubmitReceipt, SubmitRequest, Submission};
use crate::{
  aggregate::Aggregator,
  cache::{Clock, SystemClock, page_key},
  render::{PageRenderer, RenderContext, TemplateRenderer},
  service::util::ServiceError,
  store::MessageStore,
  sync::{GitMirror, Mirror, MirrorStatus, NoMirror, PageCache, StatusCache, SyncCoordinator, SyncReport},
};

/// Collaborators that differ between production and tests.
pub struct ChatServiceDeps {
  pub mirror: Arc<dyn Mirror>,
  pub renderer: Arc<dyn PageRenderer>,
  pub clock: Arc<dyn Clock>,
}

impl ChatServiceDeps {
  /// Git mirror (unless sync is disabled), configured templates, wall clock.
  pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
    let mirror: Arc<dyn Mirror> = if config.sync.enabled {
      Arc::new(GitMirror::new(&config.sync.git_binary, &config.sync.remote))
    } else {
      Arc::new(NoMirror)
    };

    Ok(Self {
      mirror,
      renderer: Arc::new(TemplateRenderer::from_config(&config.page)?),
      clock: Arc::new(SystemClock),
    })
  }
}

pub struct ChatService {
  config: Arc<Config>,
  store: Arc<MessageStore>,
  aggregator: Aggregator,
  pages: Arc<PageCache>,
  sync: SyncCoordinator,
  renderer: Arc<dyn PageRenderer>,
}

impl ChatService {
  pub fn from_config(config: Config) -> Result<Self, ServiceError> {
    let deps = ChatServiceDeps::from_config(&config)?;
    Self::with_deps(config, deps)
  }

  pub fn with_deps(config: Config, deps: ChatServiceDeps) -> Result<Self, ServiceError> {
    let store = Arc::new(MessageStore::new(config.message_root()));
    let aggregator = Aggregator::new(store.clone(), config.aggregate.workers)?;

    let pages = Arc::new(PageCache::with_clock(
      "pages",
      std::time::Duration::from_secs(config.cache.page_ttl_secs),
      deps.clock.clone(),
    ));
    let statuses = Arc::new(StatusCache::with_clock(
      "sync_status",
      std::time::Duration::from_secs(config.cache.sync_status_ttl_secs),
      deps.clock,
    ));
    let sync = SyncCoordinator::new(deps.mirror, pages.clone(), statuses);

    info!(root = %store.root().display(), "Chat service ready");
    Ok(Self {
      config: Arc::new(config),
      store,
      aggregator,
      pages,
      sync,
      renderer: deps.renderer,
    })
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn store(&self) -> &MessageStore {
    &self.store
  }

  /// All channels, pseudo-channel first. Seeds the default channel in an empty store.
  pub async fn list_channels(&self) -> Result<Vec<Channel>, ServiceError> {
    let store = self.store.clone();
    let channels = tokio::task::spawn_blocking(move || store.list_channels()).await??;
    Ok(channels)
  }

  /// Aggregate the newest `limit` messages of `channel` into a page.
  ///
  /// Never consults the page cache.
  pub async fn aggregate_page(
    &self,
    channel: &Channel,
    limit: usize,
    max_body_length: usize,
  ) -> Result<Page, ServiceError> {
    let store = self.store.clone();
    let target = channel.clone();
    let paths = match tokio::task::spawn_blocking(move || store.resolve_files(&target)).await? {
      Ok(paths) => paths,
      Err(e) => {
        warn!(channel = %channel, error = %e, "Failed to resolve channel files");
        Vec::new()
      }
    };

    let records = self.aggregator.aggregate(paths, channel.clone(), limit).await?;
    Ok(Page::from_records(channel.clone(), records, max_body_length))
  }

  /// The cached read path. Returns rendered HTML for `channel`.
  pub async fn render_page(&self, channel: &Channel) -> Result<Arc<str>, ServiceError> {
    let key = page_key(channel);
    if let Some(html) = self.pages.get(&key) {
      debug!(channel = %channel, "Serving cached page");
      return Ok(html);
    }
    // Taken before the pull is scheduled so its invalidation also counts
    let seen = self.pages.generation(&key);

    self.sync.schedule_pull(channel, self.store.channel_path(channel));

    let page_config = &self.config.page;
    let page = self
      .aggregate_page(channel, page_config.max_messages, page_config.max_message_length)
      .await?;

    let channels = match self.list_channels().await {
      Ok(channels) => channels,
      Err(e) => {
        warn!(error = %e, "Failed to list channels for navigation");
        let mut fallback = vec![Channel::All];
        if !channel.is_all() {
          fallback.push(channel.clone());
        }
        fallback
      }
    };
    let ctx = RenderContext {
      channels,
      title: page_config.title.clone(),
      now: Utc::now(),
    };

    let html: Arc<str> = Arc::from(self.renderer.render(&page, &ctx)?);
    if self.pages.set_if_current(key, seen, html.clone()) {
      debug!(channel = %channel, messages = page.total_shown, "Rendered and cached page");
    } else {
      debug!(channel = %channel, "Page invalidated while rendering, not caching");
    }
    Ok(html)
  }

  /// Validate and persist a message, returning its id.
  pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitReceipt, ServiceError> {
    let submission = Submission::new(&self.config.submit, request)?;
    let message_id = generate_message_id(Utc::now());
    let content = submission.compose();

    let store = self.store.clone();
    let channel = submission.channel.clone();
    let id = message_id.clone();
    let path = tokio::task::spawn_blocking(move || store.write_message(&channel, &id, &content)).await??;

    let channel = Channel::Named(submission.channel);
    self.sync.invalidate(&channel);

    info!(
      channel = %channel,
      message_id = %message_id,
      path = %path.display(),
      "Message submitted"
    );
    Ok(SubmitReceipt {
      message_id,
      channel: channel.to_string(),
    })
  }

  /// Convenience wrapper over [`Self::submit`].
  pub async fn submit_message(
    &self,
    channel: &str,
    author: &str,
    body: &str,
    tags: &[String],
  ) -> Result<SubmitReceipt, ServiceError> {
    self
      .submit(SubmitRequest {
        channel: channel.to_string(),
        author: author.to_string(),
        body: body.to_string(),
        tags: tags.to_vec(),
        reply_to: None,
      })
      .await
  }

  /// Pull the mirror for `channel` and wait for the result.
  pub async fn sync_channel(&self, channel: &Channel) -> Result<SyncReport, ServiceError> {
    let dir = self.store.channel_path(channel);
    if !dir.is_dir() {
      return Err(ServiceError::not_found("channel", channel.as_str()));
    }

    let outcome = self.sync.pull_now(channel, dir).await?;
    info!(channel = %channel, ?outcome, "Manual sync finished");
    Ok(SyncReport {
      channel: channel.to_string(),
      outcome,
    })
  }

  pub async fn mirror_status(&self, channel: &Channel) -> Result<MirrorStatus, ServiceError> {
    let status = self.sync.status(channel, self.store.channel_path(channel)).await?;
    Ok(status)
  }

  /// Wait for background pulls to finish. Call before exiting a short-lived process.
  pub async fn shutdown(&self) {
    let pending = self.sync.in_flight();
    if pending > 0 {
      debug!(pending, "Waiting for background pulls");
    }
    self.sync.drain().await;
  }
}
