//! Domain operations for contacts, tags and accounts.
//!
//! ## Module Organization
//!
//! - `account`: registration, login and the emailed-link flows
//! - `auth`: password hashing, sessions, one-shot tokens and depot helpers
//! - `contact`: contact store operations plus export/import
//! - `mail`: outgoing mail abstraction
//! - `tag`: tag store operations

pub mod account;
pub mod auth;
pub mod contact;
pub mod error;
pub mod mail;
pub mod tag;
