//! Page payload handed to renderers and API consumers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{channel::Channel, message::MessageRecord};

/// Marker appended to truncated bodies.
pub const ELLIPSIS: &str = "...";

/// Truncate `body` to at most `max_chars` characters.
///
/// Returns the (possibly) shortened text and whether truncation happened. A
/// truncated body is the first `max_chars` characters followed by [`ELLIPSIS`].
pub fn truncate_body(body: &str, max_chars: usize) -> (String, bool) {
  match body.char_indices().nth(max_chars) {
    None => (body.to_string(), false),
    Some((cut, _)) => (format!("{}{}", &body[..cut], ELLIPSIS), true),
  }
}

/// One message as presented on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMessage {
  pub author: String,
  pub body: String,
  pub truncated_body: String,
  pub is_truncated: bool,
  pub timestamp: DateTime<Utc>,
  pub hashtags: Vec<String>,
  pub message_id: String,
  pub reply_to: Option<String>,
  pub channel: String,
}

impl PageMessage {
  pub fn from_record(record: MessageRecord, max_body_length: usize) -> Self {
    let (truncated_body, is_truncated) = truncate_body(&record.body, max_body_length);
    Self {
      author: record.author,
      body: record.body,
      truncated_body,
      is_truncated,
      timestamp: record.timestamp,
      hashtags: record.hashtags,
      message_id: record.message_id,
      reply_to: record.reply_to,
      channel: record.channel,
    }
  }
}

/// An ordered, truncated view of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
  pub channel: Channel,
  pub messages: Vec<PageMessage>,
  pub total_shown: usize,
}

impl Page {
  /// Build a page from already ordered and limited records.
  pub fn from_records(channel: Channel, records: Vec<MessageRecord>, max_body_length: usize) -> Self {
    let messages: Vec<PageMessage> = records
      .into_iter()
      .map(|record| PageMessage::from_record(record, max_body_length))
      .collect();
    Self {
      channel,
      total_shown: messages.len(),
      messages,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_long_body() {
    assert_eq!(truncate_body("hello world", 10), ("hello worl...".to_string(), true));
  }

  #[test]
  fn test_short_body_unchanged() {
    assert_eq!(truncate_body("hello", 10), ("hello".to_string(), false));
  }

  #[test]
  fn test_body_at_limit_unchanged() {
    assert_eq!(truncate_body("0123456789", 10), ("0123456789".to_string(), false));
  }

  #[test]
  fn test_truncation_counts_chars_not_bytes() {
    let (text, truncated) = truncate_body("\u{e9}\u{e9}\u{e9}\u{e9}", 2);
    assert!(truncated);
    assert_eq!(text, "\u{e9}\u{e9}...");
  }

  #[test]
  fn test_zero_limit_truncates_everything() {
    assert_eq!(truncate_body("abc", 0), ("...".to_string(), true));
    assert_eq!(truncate_body("", 0), (String::new(), false));
  }
}
