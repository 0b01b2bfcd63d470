//! Shared configuration, error types and constants for the rolodex server.

pub mod config;
pub mod constants;
pub mod error;
pub mod util;
