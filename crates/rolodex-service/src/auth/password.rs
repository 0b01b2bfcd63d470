//! Account passwords: argon2id hashes in PHC string form and the length
//! policy enforced on registration, reset and change.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use rolodex_core::constants::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};

use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Hashes `password` with argon2id and a fresh salt.
///
/// ## Errors
/// Returns `InvalidConfiguration` if argon2 rejects its parameters.
pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InvalidConfiguration(format!("Argon2 hashing failed: {e}")))
}

/// ## Summary
/// Returns true if `password` matches the stored `password_hash`. A hash
/// that does not parse counts as a mismatch.
#[must_use]
pub fn password_matches(password: &str, password_hash: &str) -> bool {
    let parsed = match PasswordHash::new(password_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// ## Summary
/// Checks the password length policy.
///
/// ## Errors
/// Returns a validation error on `field` when the password is too short or too long.
pub fn validate_password_policy(field: &str, password: &str) -> ServiceResult<()> {
    let length = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return Err(ServiceError::invalid(
            field,
            format!(
                "The password must be at least {MIN_PASSWORD_LENGTH} and at most {MAX_PASSWORD_LENGTH} characters long."
            ),
        ));
    }
    Ok(())
}
