mod auth;
pub mod contacts;
mod healthcheck;
pub mod support;
pub mod tags;

use salvo::Router;

use crate::middleware::auth::AuthMiddleware;

pub use rolodex_core::constants::{
    API_ROUTE_COMPONENT, API_ROUTE_PREFIX, AUTH_ROUTE_PREFIX, CONTACTS_ROUTE_PREFIX,
    TAGS_ROUTE_PREFIX,
};

/// ## Summary
/// Constructs the `/api` router. Every request passes through the session
/// middleware; the contact, tag and account routes then require a caller.
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .hoop(AuthMiddleware)
        .push(healthcheck::routes())
        .push(auth::routes())
        .push(contacts::routes())
        .push(tags::routes())
}
