//! Shared test helpers for service-level integration tests.
//!
//! Provides `TestContext`, which wires a `ChatService` to a temporary message
//! store, a manual clock, a scripted mirror and a renderer that can be parked
//! mid-render.

use std::{
  fs,
  path::{Path, PathBuf},
  sync::{
    Arc, Barrier, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
  time::Duration,
};

use async_trait::async_trait;
use filetime::FileTime;
use tempfile::TempDir;
use timble_core::{Config, Page};

use crate::{
  cache::ManualClock,
  render::{PageRenderer, RenderContext, RenderError, TemplateRenderer},
  service::chat::{ChatService, ChatServiceDeps},
  sync::{Mirror, MirrorError, PullOutcome},
};

/// What the scripted mirror answers to the next pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorScript {
  Changed,
  Unchanged,
  Fail,
  NotConfigured,
}

pub struct ScriptedMirror {
  script: Mutex<MirrorScript>,
  pulls: AtomicUsize,
  heads: AtomicUsize,
}

impl ScriptedMirror {
  pub fn new(script: MirrorScript) -> Self {
    Self {
      script: Mutex::new(script),
      pulls: AtomicUsize::new(0),
      heads: AtomicUsize::new(0),
    }
  }

  pub fn set(&self, script: MirrorScript) {
    *self.script.lock().unwrap() = script;
  }

  pub fn pulls(&self) -> usize {
    self.pulls.load(Ordering::SeqCst)
  }

  pub fn heads(&self) -> usize {
    self.heads.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Mirror for ScriptedMirror {
  async fn pull(&self, dir: &Path) -> Result<PullOutcome, MirrorError> {
    self.pulls.fetch_add(1, Ordering::SeqCst);
    let script = *self.script.lock().unwrap();
    match script {
      MirrorScript::Changed => Ok(PullOutcome::Changed),
      MirrorScript::Unchanged => Ok(PullOutcome::Unchanged),
      MirrorScript::Fail => Err(MirrorError::Command {
        command: "git pull".to_string(),
        status: "exit status: 1".to_string(),
        stderr: "could not read from remote".to_string(),
      }),
      MirrorScript::NotConfigured => Err(MirrorError::NotConfigured { path: dir.to_path_buf() }),
    }
  }

  async fn head(&self, _dir: &Path) -> Result<Option<String>, MirrorError> {
    let n = self.heads.fetch_add(1, Ordering::SeqCst);
    Ok(Some(format!("rev{n}")))
  }
}

/// Renders with the built-in templates. Once armed, the next render parks
/// after the page has been aggregated until the test releases it.
pub struct GatedRenderer {
  inner: TemplateRenderer,
  armed: AtomicBool,
  entered: Arc<Barrier>,
  release: Arc<Barrier>,
}

impl GatedRenderer {
  pub fn new() -> Self {
    Self {
      inner: TemplateRenderer::default(),
      armed: AtomicBool::new(false),
      entered: Arc::new(Barrier::new(2)),
      release: Arc::new(Barrier::new(2)),
    }
  }

  pub fn arm(&self) {
    self.armed.store(true, Ordering::SeqCst);
  }

  /// Wait until the armed render is parked.
  pub async fn wait_entered(&self) {
    let entered = self.entered.clone();
    tokio::task::spawn_blocking(move || entered.wait()).await.unwrap();
  }

  /// Let the parked render finish.
  pub async fn release(&self) {
    let release = self.release.clone();
    tokio::task::spawn_blocking(move || release.wait()).await.unwrap();
  }
}

impl PageRenderer for GatedRenderer {
  fn render(&self, page: &Page, ctx: &RenderContext) -> Result<String, RenderError> {
    if self.armed.swap(false, Ordering::SeqCst) {
      self.entered.wait();
      self.release.wait();
    }
    self.inner.render(page, ctx)
  }
}

/// Test context providing a temp message store and a fully wired service.
///
/// The temp directory is cleaned up when the context is dropped.
pub struct TestContext {
  /// Temp directory - must be kept alive for the duration of the test
  _temp_dir: TempDir,
  pub clock: Arc<ManualClock>,
  pub mirror: Arc<ScriptedMirror>,
  pub renderer: Arc<GatedRenderer>,
  pub service: Arc<ChatService>,
}

impl TestContext {
  pub fn new() -> Self {
    Self::with_mirror(MirrorScript::Unchanged)
  }

  pub fn with_mirror(script: MirrorScript) -> Self {
    let temp_dir = TempDir::new().expect("create temp dir");

    let mut config = Config::default();
    config.store.root = temp_dir.path().to_path_buf();
    config.aggregate.workers = 2;

    let clock = Arc::new(ManualClock::new());
    let mirror = Arc::new(ScriptedMirror::new(script));
    let renderer = Arc::new(GatedRenderer::new());
    let deps = ChatServiceDeps {
      mirror: mirror.clone(),
      renderer: renderer.clone(),
      clock: clock.clone(),
    };
    let service = Arc::new(ChatService::with_deps(config, deps).expect("build chat service"));

    Self {
      _temp_dir: temp_dir,
      clock,
      mirror,
      renderer,
      service,
    }
  }

  pub fn root(&self) -> &Path {
    self.service.store().root()
  }

  /// Write a message file directly, bypassing the service, with a pinned mtime.
  pub fn write_file(&self, channel: &str, name: &str, content: &str, mtime_secs: i64) -> PathBuf {
    let dir = self.root().join(channel);
    fs::create_dir_all(&dir).expect("create channel dir");
    let path = dir.join(name);
    fs::write(&path, content).expect("write message");
    filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime_secs, 0)).expect("set mtime");
    path
  }

  /// Move the cache clock past the page TTL.
  pub fn expire_pages(&self) {
    let ttl = self.service.config().cache.page_ttl_secs;
    self.clock.advance(Duration::from_secs(ttl + 1));
  }
}
