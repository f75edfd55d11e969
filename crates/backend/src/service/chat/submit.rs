//! Submission validation and sanitation.
//!
//! Everything here runs before the store is touched, so a rejected submission
//! has no side effects.

use serde::{Deserialize, Serialize};
use timble_core::{Channel, ChannelName, GUEST_AUTHOR, SubmitConfig, compose_message_file};

use crate::service::util::ServiceError;

/// A message as submitted by a client, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitRequest {
  pub channel: String,
  #[serde(default)]
  pub author: String,
  #[serde(alias = "content")]
  pub body: String,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitReceipt {
  pub message_id: String,
  pub channel: String,
}

/// A validated submission, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
  pub channel: ChannelName,
  pub author: String,
  pub body: String,
  pub tags: Vec<String>,
  pub reply_to: Option<String>,
}

impl Submission {
  pub fn new(limits: &SubmitConfig, request: SubmitRequest) -> Result<Self, ServiceError> {
    let channel = match Channel::parse(&request.channel)? {
      Channel::Named(name) => name,
      Channel::All => {
        return Err(ServiceError::validation(format!(
          "cannot post to '{}', pick a named channel",
          request.channel.trim()
        )));
      }
    };

    let body = request.body.trim();
    if body.is_empty() {
      return Err(ServiceError::validation("message body is empty"));
    }
    let body = truncate_chars(body, limits.max_body_len);

    let author = single_line(&request.author);
    let author = if author.is_empty() {
      GUEST_AUTHOR.to_string()
    } else {
      truncate_chars(&author, limits.max_author_len)
    };

    let tags = request
      .tags
      .iter()
      .filter_map(|tag| normalize_tag(tag, limits.max_tag_len))
      .take(limits.max_tags)
      .collect();

    let reply_to = request
      .reply_to
      .as_deref()
      .map(|id| {
        id.chars()
          .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
          .collect::<String>()
      })
      .filter(|id| !id.is_empty());

    Ok(Self {
      channel,
      author,
      body,
      tags,
      reply_to,
    })
  }

  /// File content in the on-disk message format.
  pub fn compose(&self) -> String {
    compose_message_file(
      &self.author,
      self.channel.as_str(),
      self.reply_to.as_deref(),
      &self.body,
      &self.tags,
    )
  }
}

/// `#` followed by word characters only; `None` if nothing is left.
fn normalize_tag(raw: &str, max_len: usize) -> Option<String> {
  let name: String = raw
    .chars()
    .filter(|c| c.is_alphanumeric() || *c == '_')
    .take(max_len)
    .collect();
  (!name.is_empty()).then(|| format!("#{name}"))
}

/// Headers are line based; a newline in the author would forge another header.
fn single_line(raw: &str) -> String {
  raw
    .split(|c: char| c.is_control())
    .filter(|part| !part.trim().is_empty())
    .map(str::trim)
    .collect::<Vec<_>>()
    .join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
  text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  fn request(channel: &str, author: &str, body: &str) -> SubmitRequest {
    SubmitRequest {
      channel: channel.to_string(),
      author: author.to_string(),
      body: body.to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn test_valid_submission() {
    let sub = Submission::new(&SubmitConfig::default(), request("general", " alice ", "  hi  ")).unwrap();
    assert_eq!(sub.channel.as_str(), "general");
    assert_eq!(sub.author, "alice");
    assert_eq!(sub.body, "hi");
  }

  #[test]
  fn test_rejects_bad_channels() {
    let limits = SubmitConfig::default();
    for channel in ["../etc", "gen eral", "", "everything", "all"] {
      let err = Submission::new(&limits, request(channel, "a", "hi")).unwrap_err();
      assert!(matches!(err, ServiceError::Validation(_)), "{channel} should be rejected");
    }
  }

  #[test]
  fn test_rejects_empty_body() {
    let err = Submission::new(&SubmitConfig::default(), request("general", "a", " \n\t ")).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
  }

  #[test]
  fn test_blank_author_is_guest() {
    let sub = Submission::new(&SubmitConfig::default(), request("general", "   ", "hi")).unwrap();
    assert_eq!(sub.author, GUEST_AUTHOR);
  }

  #[test]
  fn test_author_cannot_inject_headers() {
    let sub = Submission::new(&SubmitConfig::default(), request("general", "eve\nChannel: random", "hi")).unwrap();
    assert_eq!(sub.author, "eve Channel: random");
  }

  #[test]
  fn test_limits() {
    let limits = SubmitConfig {
      max_author_len: 3,
      max_body_len: 5,
      max_tags: 2,
      max_tag_len: 4,
    };
    let mut req = request("general", "alexander", "hello world");
    req.tags = vec![
      "#release".to_string(),
      "  ".to_string(),
      "v2.0".to_string(),
      "third".to_string(),
    ];

    let sub = Submission::new(&limits, req).unwrap();
    assert_eq!(sub.author, "ale");
    assert_eq!(sub.body, "hello");
    assert_eq!(sub.tags, vec!["#rele", "#v20"]);
  }

  #[test]
  fn test_reply_to_is_sanitized() {
    let mut req = request("general", "a", "hi");
    req.reply_to = Some("20240101_000000\nAuthor: x".to_string());
    let sub = Submission::new(&SubmitConfig::default(), req).unwrap();
    assert_eq!(sub.reply_to.as_deref(), Some("20240101_000000Authorx"));

    let mut req = request("general", "a", "hi");
    req.reply_to = Some("  ".to_string());
    assert_eq!(Submission::new(&SubmitConfig::default(), req).unwrap().reply_to, None);
  }

  #[test]
  fn test_request_from_browser_payload() {
    let req: SubmitRequest = serde_json::from_str(
      r##"{"channel": "general", "content": "hi there", "tags": ["#x"], "reply_to": null}"##,
    )
    .unwrap();
    assert_eq!(req.body, "hi there");
    assert_eq!(req.author, "");
    assert_eq!(req.tags, vec!["#x"]);
    assert_eq!(req.reply_to, None);
  }

  #[test]
  fn test_compose() {
    let mut req = request("dev", "frank", "ship it");
    req.tags = vec!["deploy".to_string()];
    let sub = Submission::new(&SubmitConfig::default(), req).unwrap();
    assert_eq!(sub.compose(), "Author: frank\nChannel: dev\n\nship it\n\nTags: #deploy\n");
  }
}
