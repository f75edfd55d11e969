//! Page rendering, listing, posting and reading commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use timble::{ChatService, SubmitRequest};
use timble_core::{Channel, Config};
use tracing::info;

pub struct RenderArgs {
  pub channel: Channel,
  pub output: Option<PathBuf>,
  pub max_messages: Option<usize>,
  pub max_message_length: Option<usize>,
  pub title: Option<String>,
}

/// Render a channel page to a file or stdout
pub async fn cmd_render(mut config: Config, args: RenderArgs) -> Result<()> {
  if let Some(max) = args.max_messages {
    config.page.max_messages = max;
  }
  if let Some(max) = args.max_message_length {
    config.page.max_message_length = max;
  }
  if let Some(title) = args.title {
    config.page.title = title;
  }

  let service = ChatService::from_config(config)?;
  let html = service.render_page(&args.channel).await?;

  match args.output {
    Some(path) => {
      if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
      }
      std::fs::write(&path, html.as_bytes()).with_context(|| format!("writing {}", path.display()))?;
      info!(channel = %args.channel, path = %path.display(), "Page written");
      println!("Wrote {}", path.display());
    }
    None => print!("{html}"),
  }

  service.shutdown().await;
  Ok(())
}

/// List channels, pseudo-channel first
pub async fn cmd_channels(config: Config) -> Result<()> {
  let service = ChatService::from_config(config)?;
  for channel in service.list_channels().await? {
    if channel.is_all() {
      println!("{channel}  (all channels)");
    } else {
      println!("{channel}");
    }
  }
  Ok(())
}

/// Post a message
pub async fn cmd_post(
  config: Config,
  channel: String,
  author: String,
  tags: Vec<String>,
  reply_to: Option<String>,
  body: String,
) -> Result<()> {
  let service = ChatService::from_config(config)?;
  let receipt = service
    .submit(SubmitRequest {
      channel,
      author,
      body,
      tags,
      reply_to,
    })
    .await?;

  println!("Posted {} to #{}", receipt.message_id, receipt.channel);
  Ok(())
}

/// Print the newest messages of a channel
pub async fn cmd_show(config: Config, channel: &Channel, limit: Option<usize>, json: bool) -> Result<()> {
  let limit = limit.unwrap_or(config.page.max_messages);
  let max_length = config.page.max_message_length;
  let service = ChatService::from_config(config)?;
  let page = service.aggregate_page(channel, limit, max_length).await?;

  if json {
    println!("{}", serde_json::to_string_pretty(&page)?);
    return Ok(());
  }

  if page.messages.is_empty() {
    println!("No messages in #{channel}");
    return Ok(());
  }

  for msg in &page.messages {
    let reply = msg
      .reply_to
      .as_deref()
      .map(|id| format!(" (reply to {id})"))
      .unwrap_or_default();
    println!(
      "[{}] #{} {}{}:",
      msg.timestamp.format("%Y-%m-%d %H:%M:%S"),
      msg.channel,
      msg.author,
      reply
    );
    for line in msg.truncated_body.lines() {
      println!("    {line}");
    }
  }
  println!();
  println!("{} message(s) in #{}", page.total_shown, channel);
  Ok(())
}
