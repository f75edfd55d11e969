//! Mirror commands

use anyhow::Result;
use timble::{ChatService, PullOutcome};
use timble_core::{Channel, Config};

/// Pull the mirror for a channel and report whether anything changed
pub async fn cmd_sync(config: Config, channel: &Channel) -> Result<()> {
  let service = ChatService::from_config(config)?;
  let report = service.sync_channel(channel).await?;

  match report.outcome {
    PullOutcome::Changed => println!("#{}: pulled new messages", report.channel),
    PullOutcome::Unchanged => println!("#{}: already up to date", report.channel),
  }
  Ok(())
}

/// Show the mirror revision for a channel
pub async fn cmd_status(config: Config, channel: &Channel, json: bool) -> Result<()> {
  let service = ChatService::from_config(config)?;
  let status = service.mirror_status(channel).await?;

  if json {
    println!("{}", serde_json::to_string_pretty(&status)?);
    return Ok(());
  }

  println!("Channel:    #{}", status.channel);
  println!("Mirror:     {}", if status.configured { "configured" } else { "not configured" });
  println!("Revision:   {}", status.head.as_deref().unwrap_or("-"));
  Ok(())
}
