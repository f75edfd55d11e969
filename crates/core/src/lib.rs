//! Domain types shared by the Timble crates: channels, message records,
//! page payloads and configuration.

pub mod channel;
pub mod config;
pub mod message;
pub mod page;

pub use channel::{Channel, ChannelError, ChannelName, DEFAULT_CHANNEL, EVERYTHING};
pub use config::{
  AggregateConfig, CacheConfig, Config, ConfigError, LogConfig, PageConfig, StoreConfig, SubmitConfig, SyncConfig,
};
pub use message::{
  GUEST_AUTHOR, MESSAGE_EXTENSION, MessageMetadata, MessageRecord, UNKNOWN_AUTHOR, compose_message_file,
  generate_message_id, message_id_from_path,
};
pub use page::{ELLIPSIS, Page, PageMessage, truncate_body};
