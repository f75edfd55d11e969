//! Channel identity.
//!
//! A channel is either a named partition of the message store (one directory
//! under `message/`) or the `everything` pseudo-channel, which is the union of
//! all named partitions. The two are kept apart at the type level so that no
//! code path can branch on the string `"everything"`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Display name of the pseudo-channel.
pub const EVERYTHING: &str = "everything";

/// Names that resolve to the pseudo-channel and can never be used as a directory.
pub const RESERVED_NAMES: &[&str] = &[EVERYTHING, "all"];

/// Channel seeded when the message root has no channel directories yet.
pub const DEFAULT_CHANNEL: &str = "general";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
  #[error("channel name is empty")]
  Empty,
  #[error("channel name '{0}' may only contain letters, digits, '_' and '-'")]
  InvalidCharacters(String),
  #[error("channel name '{0}' is reserved")]
  Reserved(String),
}

/// A validated channel directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
  pub fn new(name: impl Into<String>) -> Result<Self, ChannelError> {
    let name = name.into();
    if name.is_empty() {
      return Err(ChannelError::Empty);
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
      return Err(ChannelError::InvalidCharacters(name));
    }
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(&name)) {
      return Err(ChannelError::Reserved(name));
    }
    Ok(Self(name))
  }

  /// The channel seeded into an empty store.
  pub fn default_channel() -> Self {
    Self(DEFAULT_CHANNEL.to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ChannelName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl<'de> Deserialize<'de> for ChannelName {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    ChannelName::new(raw).map_err(serde::de::Error::custom)
  }
}

/// A requested channel: the pseudo-channel or one named partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
  All,
  Named(ChannelName),
}

impl Channel {
  /// Parse a channel as requested by a reader.
  ///
  /// Reserved names map to [`Channel::All`]; everything else must be a valid
  /// directory name.
  pub fn parse(raw: &str) -> Result<Self, ChannelError> {
    let raw = raw.trim();
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(raw)) {
      return Ok(Channel::All);
    }
    ChannelName::new(raw).map(Channel::Named)
  }

  pub fn named(name: impl Into<String>) -> Result<Self, ChannelError> {
    ChannelName::new(name).map(Channel::Named)
  }

  /// The name used in cache keys, URLs and page titles.
  pub fn as_str(&self) -> &str {
    match self {
      Channel::All => EVERYTHING,
      Channel::Named(name) => name.as_str(),
    }
  }

  pub fn is_all(&self) -> bool {
    matches!(self, Channel::All)
  }

  /// Whether a record declared (or placed) in `record_channel` belongs on this channel's page.
  pub fn admits(&self, record_channel: &str) -> bool {
    match self {
      Channel::All => true,
      Channel::Named(name) => name.as_str() == record_channel,
    }
  }
}

impl fmt::Display for Channel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for Channel {
  type Err = ChannelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Channel::parse(s)
  }
}

impl Serialize for Channel {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}
