//! Filesystem-backed message store.
//!
//! Layout: `<root>/<channel>/<message_id>.txt`, one message per file. Files are
//! created by [`MessageStore::write_message`] and never modified in place.
//!
//! All methods here block on the filesystem. Async callers go through
//! `spawn_blocking` (see [`crate::service`]).

pub mod decode;

use std::{
  fs::{self, OpenOptions},
  io::Write,
  path::{Component, Path, PathBuf},
};

use chrono::{DateTime, Utc};
use timble_core::{Channel, ChannelName, DEFAULT_CHANNEL, MESSAGE_EXTENSION, MessageMetadata, MessageRecord};
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

pub use decode::decode_text;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Failed to create directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to list {path}: {source}")]
  ListDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to write message {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// The message directory and everything that touches it.
#[derive(Debug, Clone)]
pub struct MessageStore {
  root: PathBuf,
}

impl MessageStore {
  /// `root` is the `message/` directory itself, not the repository root.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn channel_dir(&self, name: &ChannelName) -> PathBuf {
    self.root.join(name.as_str())
  }

  /// Directory a mirror pull for `channel` operates on.
  pub fn channel_path(&self, channel: &Channel) -> PathBuf {
    match channel {
      Channel::All => self.root.clone(),
      Channel::Named(name) => self.channel_dir(name),
    }
  }

  /// Enumerate channels: the pseudo-channel first, then every channel directory
  /// in lexicographic order.
  ///
  /// Seeds the default channel directory when there is none yet.
  pub fn list_channels(&self) -> Result<Vec<Channel>, StoreError> {
    let mut names = if self.root.is_dir() {
      self.channel_names()?
    } else {
      Vec::new()
    };

    if names.is_empty() {
      let default = self.seed_default_channel()?;
      names.push(default);
    }

    names.sort();
    Ok(std::iter::once(Channel::All).chain(names.into_iter().map(Channel::Named)).collect())
  }

  fn channel_names(&self) -> Result<Vec<ChannelName>, StoreError> {
    let entries = fs::read_dir(&self.root).map_err(|source| StoreError::ListDir {
      path: self.root.clone(),
      source,
    })?;

    let mut names = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
      if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
        continue;
      }
      let raw = entry.file_name().to_string_lossy().into_owned();
      match ChannelName::new(raw.as_str()) {
        Ok(name) => names.push(name),
        Err(e) => trace!(dir = %raw, error = %e, "Skipping non-channel directory"),
      }
    }
    Ok(names)
  }

  fn seed_default_channel(&self) -> Result<ChannelName, StoreError> {
    let name = ChannelName::default_channel();
    let dir = self.channel_dir(&name);
    create_dir(&dir)?;
    info!(path = %dir.display(), "Seeded default channel");
    Ok(name)
  }

  /// Collect every message file that may belong to `channel`.
  ///
  /// For a named channel the directory is created when missing. Hidden
  /// directories are never descended into. Paths come back sorted.
  pub fn resolve_files(&self, channel: &Channel) -> Result<Vec<PathBuf>, StoreError> {
    let base = match channel {
      Channel::All => {
        if !self.root.is_dir() {
          return Ok(Vec::new());
        }
        self.root.clone()
      }
      Channel::Named(name) => {
        let dir = self.channel_dir(name);
        if !dir.is_dir() {
          create_dir(&dir)?;
          debug!(channel = %name, "Created channel directory");
        }
        dir
      }
    };

    let walker = WalkDir::new(&base).follow_links(false).into_iter().filter_entry(|e| {
      // Skip hidden directories (.git and friends)
      !(e.depth() > 0 && e.file_name().to_string_lossy().starts_with('.'))
    });

    let mut files = Vec::new();
    for entry in walker {
      let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
          debug!(error = %e, "Skipping unreadable directory entry");
          continue;
        }
      };
      if entry.file_type().is_file() && is_message_file(entry.path()) {
        files.push(entry.into_path());
      }
    }

    files.sort();
    Ok(files)
  }

  /// The channel a file belongs to by placement: the first directory below
  /// the root. Files sitting directly in the root belong to the default channel.
  pub fn directory_channel(&self, path: &Path) -> String {
    if let Ok(relative) = path.strip_prefix(&self.root) {
      let mut components = relative.components();
      if let (Some(Component::Normal(first)), Some(_)) = (components.next(), components.next()) {
        return first.to_string_lossy().into_owned();
      }
      return DEFAULT_CHANNEL.to_string();
    }

    path
      .parent()
      .and_then(|p| p.file_name())
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| DEFAULT_CHANNEL.to_string())
  }

  /// Read and parse one message file.
  ///
  /// Any failure is logged and reported as `None` so a single bad file never
  /// takes down a page.
  pub fn read_record(&self, path: &Path) -> Option<MessageRecord> {
    let modified = match fs::metadata(path).and_then(|m| m.modified()) {
      Ok(modified) => modified,
      Err(e) => {
        warn!(path = %path.display(), error = %e, "Failed to stat message, skipping");
        return None;
      }
    };

    let bytes = match fs::read(path) {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!(path = %path.display(), error = %e, "Failed to read message, skipping");
        return None;
      }
    };

    let metadata = MessageMetadata::parse(&decode_text(&bytes));
    let fallback = self.directory_channel(path);
    Some(MessageRecord::from_parts(
      metadata,
      &fallback,
      path,
      DateTime::<Utc>::from(modified),
    ))
  }

  /// Persist a new message file. Never overwrites an existing file.
  pub fn write_message(&self, channel: &ChannelName, message_id: &str, content: &str) -> Result<PathBuf, StoreError> {
    let dir = self.channel_dir(channel);
    create_dir(&dir)?;

    let path = dir.join(format!("{message_id}.{MESSAGE_EXTENSION}"));
    let write_err = |source| StoreError::Write {
      path: path.clone(),
      source,
    };

    let mut file = OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(&path)
      .map_err(write_err)?;
    file.write_all(content.as_bytes()).map_err(write_err)?;
    file.sync_data().map_err(write_err)?;

    debug!(path = %path.display(), "Wrote message");
    Ok(path)
  }
}

fn create_dir(path: &Path) -> Result<(), StoreError> {
  fs::create_dir_all(path).map_err(|source| StoreError::CreateDir {
    path: path.to_path_buf(),
    source,
  })
}

fn is_message_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| ext.eq_ignore_ascii_case(MESSAGE_EXTENSION))
}
