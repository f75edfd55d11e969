//! Unified error type for chat service operations.
//!
//! Every service entry point returns [`ServiceError`], which carries a
//! JSON-RPC style code so a front end can map failures without matching on
//! variants.

use timble_core::ChannelError;

use crate::{aggregate::AggregateError, render::RenderError, store::StoreError, sync::MirrorError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
  /// Caller input was rejected before any side effect.
  #[error("Validation error: {0}")]
  Validation(String),
  #[error("{item_type} not found: {id}")]
  NotFound { item_type: &'static str, id: String },
  /// Filesystem failure on the write path.
  #[error("I/O error: {0}")]
  Io(#[from] StoreError),
  #[error("Render error: {0}")]
  Render(#[from] RenderError),
  /// Only surfaced by an explicit sync; background pulls log instead.
  #[error("Mirror error: {0}")]
  Mirror(#[from] MirrorError),
  #[error("Internal error: {0}")]
  Internal(String),
}

impl ServiceError {
  /// Error codes follow JSON-RPC conventions:
  /// - `-32602`: invalid params (validation errors)
  /// - `-32001`: requested item does not exist
  /// - `-32000`: server error (everything else)
  pub fn code(&self) -> i32 {
    match self {
      Self::Validation(_) => -32602,
      Self::NotFound { .. } => -32001,
      _ => -32000,
    }
  }

  pub fn not_found(item_type: &'static str, id: impl Into<String>) -> Self {
    Self::NotFound {
      item_type,
      id: id.into(),
    }
  }

  pub fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }

  pub fn internal(msg: impl Into<String>) -> Self {
    Self::Internal(msg.into())
  }
}

impl From<ChannelError> for ServiceError {
  fn from(e: ChannelError) -> Self {
    Self::Validation(e.to_string())
  }
}

impl From<AggregateError> for ServiceError {
  fn from(e: AggregateError) -> Self {
    Self::internal(e.to_string())
  }
}

impl From<tokio::task::JoinError> for ServiceError {
  fn from(e: tokio::task::JoinError) -> Self {
    Self::internal(format!("blocking task failed: {e}"))
  }
}
