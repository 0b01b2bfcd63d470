//! Depot helpers for the authenticated user of a request.

use crate::error::{ServiceError, ServiceResult};

pub mod depot_keys {
    pub const AUTHENTICATED_USER: &str = "__authenticated_user";
}

/// The caller of a request, resolved from the session cookie.
///
/// Passed explicitly into every store operation; nothing looks the current
/// user up implicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: uuid::Uuid,
    pub user_name: String,
    pub email: String,
    /// Hash of the session token this request came in with.
    pub session_hash: String,
}

/// Get the authenticated user from the depot.
///
/// ## Errors
///
/// Returns `NotAuthenticated` if no user is found in the depot.
pub fn get_user_from_depot(depot: &salvo::Depot) -> ServiceResult<&AuthenticatedUser> {
    depot
        .get::<AuthenticatedUser>(depot_keys::AUTHENTICATED_USER)
        .map_err(|_e| ServiceError::NotAuthenticated)
}

/// Check if the request carries an authenticated user.
#[must_use]
pub fn is_authenticated(depot: &salvo::Depot) -> bool {
    depot
        .get::<AuthenticatedUser>(depot_keys::AUTHENTICATED_USER)
        .is_ok()
}
