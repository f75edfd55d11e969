//! Config commands

use std::path::Path;

use anyhow::{Context, Result, bail};
use timble_core::Config;
use tracing::info;

/// Show current effective configuration
pub fn cmd_config_show(config: &Config, explicit: Option<&Path>, root: Option<&Path>) -> Result<()> {
  let base = match root {
    Some(root) => root.to_path_buf(),
    None => std::env::current_dir()?,
  };
  let repo_config = Config::repo_config_path(&base);
  let user_config = Config::user_config_path();

  match explicit {
    Some(path) => println!("Using config: {}", path.display()),
    None if repo_config.exists() => println!("Using repository config: {}", repo_config.display()),
    None => match user_config {
      Some(ref user_path) if user_path.exists() => println!("Using user config: {}", user_path.display()),
      _ => println!("Using default configuration (no config file found)"),
    },
  }
  println!("Message root: {}", config.message_root().display());
  println!();

  let toml_str = toml::to_string_pretty(config)?;
  println!("{}", toml_str);
  Ok(())
}

/// Write a default configuration file
pub fn cmd_config_init(config: &Config, user: bool, force: bool) -> Result<()> {
  let config_path = if user {
    Config::user_config_path().context("no user config directory on this platform")?
  } else {
    Config::repo_config_path(&config.store.root)
  };

  if config_path.exists() && !force {
    bail!(
      "Config file already exists: {} (use --force to overwrite)",
      config_path.display()
    );
  }

  if let Some(parent) = config_path.parent() {
    std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
  }
  std::fs::write(&config_path, Config::generate_template())
    .with_context(|| format!("writing {}", config_path.display()))?;

  info!(path = %config_path.display(), "Config initialized");
  println!("Created {}", config_path.display());
  Ok(())
}
