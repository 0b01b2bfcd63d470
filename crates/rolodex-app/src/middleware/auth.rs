use salvo::Depot;
use salvo::http::StatusCode;
use tracing::error;

use crate::error::AppError;
use crate::{config::get_config_from_depot, db_handler::get_db_from_depot};
use rolodex_service::auth::depot::{depot_keys, is_authenticated};
use rolodex_service::auth::session::resolve_session;
use rolodex_service::error::ServiceError;

/// ## Summary
/// Resolves the session cookie of a request into an `AuthenticatedUser`.
/// Requests without a cookie, or with an unknown or expired one, continue
/// anonymously; use [`RequireAuth`] on routes that need a caller.
///
/// ## Side Effects
/// Inserts the user into the depot under `depot_keys::AUTHENTICATED_USER`.
/// Slides the session expiry forward when it is due.
///
/// ## Errors
/// Responds 500 when the depot is missing its config or database provider,
/// and 503 when no database connection is available.
#[salvo::async_trait]
impl salvo::Handler for AuthMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        tracing::trace!("Authenticating request");

        if req.method() == salvo::http::Method::OPTIONS {
            return;
        }

        let config = match get_config_from_depot(depot) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(error = ?e, "Failed to get config from depot");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };

        let Some(raw_token) = req
            .cookie(&config.auth.cookie_name)
            .map(|cookie| cookie.value().to_owned())
            .filter(|value| !value.is_empty())
        else {
            tracing::trace!("No session cookie, treating as anonymous");
            return;
        };

        let provider = match get_db_from_depot(depot) {
            Ok(p) => p,
            Err(e) => {
                error!(error = ?e, "Failed to get database provider from depot");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };

        let mut conn = match provider.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!(error = ?e, "Failed to get database connection");
                res.status_code(StatusCode::SERVICE_UNAVAILABLE);
                ctrl.skip_rest();
                return;
            }
        };

        match resolve_session(&mut conn, &raw_token, &config.auth).await {
            Ok(Some(user)) => {
                tracing::debug!(user_id = %user.id, "User authenticated successfully");
                depot.insert(depot_keys::AUTHENTICATED_USER, user);
            }
            Ok(None) => {
                tracing::debug!("Session cookie did not match an active session");
            }
            Err(service_err) => {
                error!(error = ?service_err, "Authentication failed with error");
                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                res.body("Internal Server Error");
                ctrl.skip_rest();
            }
        }
    }
}

/// ## Summary
/// Middleware handler for session authentication.
/// Hooped once on the `/api` router.
pub struct AuthMiddleware;

/// ## Summary
/// Rejects requests that [`AuthMiddleware`] could not attach a user to.
///
/// ## Errors
/// Responds 401 with the JSON error body.
pub struct RequireAuth;

#[salvo::async_trait]
impl salvo::Handler for RequireAuth {
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        if req.method() == salvo::http::Method::OPTIONS || is_authenticated(depot) {
            return;
        }

        AppError::from(ServiceError::NotAuthenticated).render_into(res);
        ctrl.skip_rest();
    }
}
