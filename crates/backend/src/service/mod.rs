//! Business logic services.
//!
//! This module contains the service layer that front ends (the CLI, an HTTP
//! adapter) call into. It owns the caches and the background sync tasks.
//!
//! ## Available Services
//!
//! - [`chat`] - Cached page reads, message submission, mirror sync and status

pub mod chat;
pub mod util;

#[cfg(test)]
mod __tests__;
