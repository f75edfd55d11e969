//! Timble chat backend: message store, aggregation, caching, mirror sync and
//! page rendering behind a single [`ChatService`].

pub mod aggregate;
pub mod cache;
pub mod dirs;
pub mod render;
pub mod service;
pub mod store;
pub mod sync;

pub use aggregate::{AggregateError, Aggregator};
pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use render::{PageRenderer, RenderContext, RenderError, TemplateRenderer};
pub use service::{
  chat::{ChatService, ChatServiceDeps, SubmitReceipt, SubmitRequest},
  util::ServiceError,
};
pub use store::{MessageStore, StoreError};
pub use sync::{GitMirror, Mirror, MirrorError, MirrorStatus, NoMirror, PullOutcome, SyncReport};
pub use timble_core::{config, config::Config};
