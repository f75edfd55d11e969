//! Timble CLI - file-backed chat pages, posting and mirror sync

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use timble_core::{Channel, ChannelError, Config};

mod commands;
mod logging;

use commands::{
  RenderArgs, cmd_channels, cmd_config_init, cmd_config_show, cmd_post, cmd_render, cmd_show, cmd_status, cmd_sync,
};
use logging::init_logging;

#[derive(Parser)]
#[command(name = "timble")]
#[command(about = "File-backed chat: aggregate, render and post channel messages")]
#[command(after_help = "\
QUICK START:
  timble config init                  # Write .timble/config.toml
  timble post -c general \"hello\"      # Post a message
  timble show -c everything           # Newest messages across channels
  timble render -c general -o chat/general.html

LAYOUT:
  message/<channel>/<message_id>.txt  # One file per message")]
struct Cli {
  /// Config file (default: <root>/.timble/config.toml, then user config)
  #[arg(long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Repository root holding message/ (overrides store.root)
  #[arg(long, global = true, value_name = "DIR")]
  root: Option<PathBuf>,

  /// Write logs to rolling files in the data directory instead of stderr
  #[arg(long, global = true)]
  log_file: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
  #[command(long_about = "Show the current effective configuration.\n\n\
    Displays which config file is being used and its contents as TOML.")]
  Show,

  #[command(long_about = "Initialize a configuration file with defaults.\n\n\
    Creates .timble/config.toml under the repository root, or the user config with --user.")]
  Init {
    /// Write the user-level config instead of the repository one
    #[arg(long)]
    user: bool,
    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
  },
}

fn parse_channel(raw: &str) -> Result<Channel, ChannelError> {
  Channel::parse(raw)
}

#[derive(Subcommand)]
enum Commands {
  /// Render a channel page to HTML
  #[command(after_help = "\
EXAMPLES:
  timble render -c general                     # Print to stdout
  timble render -c everything -o chat/all.html
  timble render -c dev --max-messages 20 --title \"Dev Chat\"")]
  Render {
    /// Channel to render ('everything' for all channels)
    #[arg(short, long, default_value = "general", value_parser = parse_channel)]
    channel: Channel,
    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Maximum number of messages on the page
    #[arg(long)]
    max_messages: Option<usize>,
    /// Maximum characters shown before a message is collapsed
    #[arg(long)]
    max_message_length: Option<usize>,
    /// Page title prefix
    #[arg(long)]
    title: Option<String>,
  },
  /// List channels
  Channels,
  /// Post a message
  Post {
    /// Channel to post to
    #[arg(short, long, default_value = "general")]
    channel: String,
    /// Author name (default: Guest)
    #[arg(short, long, default_value = "")]
    author: String,
    /// Tag to attach (repeatable)
    #[arg(short, long = "tag")]
    tags: Vec<String>,
    /// Message id this message replies to
    #[arg(long)]
    reply_to: Option<String>,
    /// Message body
    body: String,
  },
  /// Show the newest messages of a channel
  Show {
    #[arg(short, long, default_value = "general", value_parser = parse_channel)]
    channel: Channel,
    /// Number of messages (default: page.max_messages)
    #[arg(short, long)]
    limit: Option<usize>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
  /// Pull the mirror for a channel now
  Sync {
    #[arg(short, long, default_value = "general", value_parser = parse_channel)]
    channel: Channel,
  },
  /// Show mirror status for a channel
  Status {
    #[arg(short, long, default_value = "general", value_parser = parse_channel)]
    channel: Channel,
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
  #[command(after_help = "\
CONFIG LOCATIONS:
  Repository: .timble/config.toml
  User:       ~/.config/timble/config.toml")]
  Config {
    #[command(subcommand)]
    command: ConfigCommand,
  },
}

/// Resolve the effective config: explicit file, else repository/user/defaults.
fn load_config(explicit: Option<&Path>, root: Option<&Path>) -> Result<Config> {
  let mut config = match explicit {
    Some(path) => Config::load_from(path).with_context(|| format!("loading config {}", path.display()))?,
    None => {
      let base = match root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir().context("resolving current directory")?,
      };
      Config::load_for_repo(&base)
    }
  };

  if let Some(root) = root {
    config.store.root = root.to_path_buf();
  }
  Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let config = load_config(cli.config.as_deref(), cli.root.as_deref())?;
  let _guard = init_logging(&config.log, cli.log_file);

  match cli.command {
    Commands::Render {
      channel,
      output,
      max_messages,
      max_message_length,
      title,
    } => {
      let args = RenderArgs {
        channel,
        output,
        max_messages,
        max_message_length,
        title,
      };
      cmd_render(config, args).await
    }
    Commands::Channels => cmd_channels(config).await,
    Commands::Post {
      channel,
      author,
      tags,
      reply_to,
      body,
    } => cmd_post(config, channel, author, tags, reply_to, body).await,
    Commands::Show { channel, limit, json } => cmd_show(config, &channel, limit, json).await,
    Commands::Sync { channel } => cmd_sync(config, &channel).await,
    Commands::Status { channel, json } => cmd_status(config, &channel, json).await,
    Commands::Config { command } => match command {
      ConfigCommand::Show => cmd_config_show(&config, cli.config.as_deref(), cli.root.as_deref()),
      ConfigCommand::Init { user, force } => cmd_config_init(&config, user, force),
    },
  }
}
