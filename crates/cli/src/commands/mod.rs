//! CLI command implementations

mod chat;
mod config;
mod sync;

pub use chat::{RenderArgs, cmd_channels, cmd_post, cmd_render, cmd_show};
pub use config::{cmd_config_init, cmd_config_show};
pub use sync::{cmd_status, cmd_sync};
