//! HTTP layer of rolodex.
//!
//! ## Module Organization
//!
//! - `app`: the `/api` router and its handlers
//! - `config`, `db_handler`, `mail_handler`: hoops that put shared state into the depot
//! - `middleware`: session-cookie authentication
//! - `error`: mapping of failures to HTTP responses

pub mod app;
pub mod config;
pub mod db_handler;
pub mod error;
pub mod mail_handler;
pub mod middleware;
