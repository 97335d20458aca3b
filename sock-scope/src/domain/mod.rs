//! Domain model for sock-scope
//!
//! Core configuration and filtering types plus the structured errors shared
//! across the crate.

pub mod errors;
pub mod types;

pub use errors::{AttachError, HostError, ParseError, RewriteError};
pub use types::{Config, Direction, FilterEntry, SocketDescription};
