//! Shared utilities for the service layer.
//!
//! - `error` - Unified error type for service operations

mod error;

pub use error::ServiceError;
