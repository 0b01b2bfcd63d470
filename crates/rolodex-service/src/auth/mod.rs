//! Authentication primitives.
//!
//! ## Module Organization
//!
//! - `depot`: the authenticated user carried through a request
//! - `password`: password hashing and verification with Argon2
//! - `session`: cookie-backed login sessions stored by hash
//! - `token`: random tokens for sessions and emailed links

pub mod depot;
pub mod password;
pub mod session;
pub mod token;

pub use depot::{AuthenticatedUser, get_user_from_depot};
