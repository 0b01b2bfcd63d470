//! Random bearer tokens. The raw value goes to the client (cookie or emailed
//! link); only its SHA-256 is stored.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// A freshly generated token and the hash to persist for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedToken {
    pub raw: String,
    pub hash: String,
}

/// ## Summary
/// Generates 32 random bytes, encoded base64url without padding.
#[must_use]
pub fn generate_token() -> GeneratedToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let raw = URL_SAFE_NO_PAD.encode(bytes);
    let hash = hash_token(&raw);
    GeneratedToken { raw, hash }
}

/// ## Summary
/// Returns the lowercase hex SHA-256 of a raw token.
#[must_use]
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
