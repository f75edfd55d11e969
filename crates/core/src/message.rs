//! Message files and the records parsed from them.
//!
//! A message file is free text whose leading lines may carry `Author:`,
//! `Channel:` and `Reply-To:` headers (case-insensitive, any order). The body is
//! whatever remains once those lines are stripped.

use std::{
  path::{Path, PathBuf},
  sync::LazyLock,
};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// File extension of message files.
pub const MESSAGE_EXTENSION: &str = "txt";

/// Author shown for files that do not declare one.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Author written for submissions with a blank author.
pub const GUEST_AUTHOR: &str = "Guest";

static AUTHOR_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?im)^[ \t]*author:[ \t]*(.+)$").expect("valid author regex"));
static CHANNEL_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?im)^[ \t]*channel:[ \t]*(.+)$").expect("valid channel regex"));
static REPLY_TO_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?im)^[ \t]*reply-to:[ \t]*(.+)$").expect("valid reply-to regex"));
static HEADER_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?im)^[ \t]*(?:author|channel|reply-to):[ \t]*.+(?:\r?\n)?").expect("valid header regex")
});
static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\w+").expect("valid hashtag regex"));

/// Metadata extracted from decoded file content, before file facts are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMetadata {
  pub author: String,
  pub body: String,
  pub hashtags: Vec<String>,
  /// In-file `Channel:` declaration, which overrides directory placement.
  pub channel: Option<String>,
  pub reply_to: Option<String>,
}

impl MessageMetadata {
  /// Extract metadata from decoded message text. Never fails.
  pub fn parse(content: &str) -> Self {
    let author = first_header(&AUTHOR_RE, content).unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let channel = first_header(&CHANNEL_RE, content);
    let reply_to = first_header(&REPLY_TO_RE, content);
    let hashtags = HASHTAG_RE.find_iter(content).map(|m| m.as_str().to_string()).collect();
    let body = HEADER_LINE_RE.replace_all(content, "").trim().to_string();

    Self {
      author,
      body,
      hashtags,
      channel,
      reply_to,
    }
  }
}

fn first_header(re: &Regex, content: &str) -> Option<String> {
  re.captures(content)
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str().trim().to_string())
    .filter(|value| !value.is_empty())
}

/// A parsed message, the unit the aggregation pipeline operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
  pub author: String,
  pub body: String,
  /// File modification time; the ordering key.
  pub timestamp: DateTime<Utc>,
  pub hashtags: Vec<String>,
  pub channel: String,
  pub reply_to: Option<String>,
  pub message_id: String,
  pub source_path: PathBuf,
}

impl MessageRecord {
  /// Combine parsed metadata with the facts known about the file it came from.
  ///
  /// `fallback_channel` is the directory-derived channel, used only when the
  /// file does not declare one.
  pub fn from_parts(
    metadata: MessageMetadata,
    fallback_channel: &str,
    source_path: impl Into<PathBuf>,
    timestamp: DateTime<Utc>,
  ) -> Self {
    let source_path = source_path.into();
    let message_id = message_id_from_path(&source_path);
    Self {
      author: metadata.author,
      body: metadata.body,
      timestamp,
      hashtags: metadata.hashtags,
      channel: metadata.channel.unwrap_or_else(|| fallback_channel.to_string()),
      reply_to: metadata.reply_to,
      message_id,
      source_path,
    }
  }
}

/// The message id of a file is its base name without extension.
pub fn message_id_from_path(path: &Path) -> String {
  path
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_default()
}

/// Generate a new message id.
///
/// Microsecond UTC time keeps ids sortable; the random suffix keeps two writes
/// landing in the same microsecond apart.
pub fn generate_message_id(now: DateTime<Utc>) -> String {
  let random = uuid::Uuid::new_v4().simple().to_string();
  format!("{}_{}", now.format("%Y%m%d_%H%M%S_%6f"), &random[..8])
}

/// Serialize a submission into the on-disk message format.
pub fn compose_message_file(
  author: &str,
  channel: &str,
  reply_to: Option<&str>,
  body: &str,
  tags: &[String],
) -> String {
  let mut content = format!("Author: {author}\nChannel: {channel}\n");
  if let Some(parent) = reply_to {
    content.push_str(&format!("Reply-To: {parent}\n"));
  }
  content.push('\n');
  content.push_str(body);
  if !tags.is_empty() {
    content.push_str("\n\nTags: ");
    content.push_str(&tags.join(" "));
  }
  content.push('\n');
  content
}
