//! Login sessions.
//!
//! A session is a random token handed to the browser as a cookie. The
//! database keeps its SHA-256 and an expiry that slides forward on use.

use chrono::{DateTime, Duration, Utc};

use rolodex_core::config::AuthConfig;
use rolodex_db::db::connection::DbConnection;
use rolodex_db::db::query::session;
use rolodex_db::model::session::NewUserSession;

use crate::auth::depot::AuthenticatedUser;
use crate::auth::token::{generate_token, hash_token};
use crate::error::ServiceResult;

/// A session that was just created; `token` goes into the cookie.
#[derive(Debug, Clone)]
pub struct StartedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// ## Summary
/// Returns the configured session lifetime.
#[must_use]
pub fn session_ttl(config: &AuthConfig) -> Duration {
    Duration::hours(i64::from(config.session_ttl_hours))
}

/// Returns true once less than half of the lifetime is left.
fn needs_refresh(expires_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    expires_at - now < ttl / 2
}

/// ## Summary
/// Creates a session for `user_id`.
///
/// ## Side Effects
/// - Deletes every expired `user_session` row
/// - Inserts a `user_session` row
///
/// ## Errors
/// Returns database errors if the purge or the insert fails.
#[tracing::instrument(skip(conn, config), fields(user_id = %user_id))]
pub async fn start_session(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    config: &AuthConfig,
) -> ServiceResult<StartedSession> {
    let now = Utc::now();
    let purged = session::delete_expired(conn, now).await?;
    if purged > 0 {
        tracing::debug!(purged, "Expired sessions removed");
    }

    let token = generate_token();
    let expires_at = now + session_ttl(config);

    session::insert(
        conn,
        &NewUserSession {
            token_hash: token.hash,
            user_id,
            expires_at,
        },
    )
    .await?;

    tracing::debug!(%expires_at, "Session started");

    Ok(StartedSession {
        token: token.raw,
        expires_at,
    })
}

/// ## Summary
/// Resolves a session cookie value to its user.
///
/// Returns `None` for unknown or expired sessions.
///
/// ## Side Effects
/// - Extends the session expiry once half of its lifetime has passed
///
/// ## Errors
/// Returns database errors if queries fail.
#[tracing::instrument(skip_all)]
pub async fn resolve_session(
    conn: &mut DbConnection<'_>,
    raw_token: &str,
    config: &AuthConfig,
) -> ServiceResult<Option<AuthenticatedUser>> {
    let token_hash = hash_token(raw_token);
    let now = Utc::now();

    let Some((user_session, user)) = session::find_active(conn, &token_hash, now).await? else {
        tracing::trace!("No active session for cookie");
        return Ok(None);
    };

    let ttl = session_ttl(config);
    if needs_refresh(user_session.expires_at, now, ttl) {
        session::extend(conn, &token_hash, now + ttl).await?;
        tracing::trace!(user_id = %user.id, "Session expiry extended");
    }

    Ok(Some(AuthenticatedUser {
        id: user.id,
        user_name: user.user_name,
        email: user.email,
        session_hash: token_hash,
    }))
}

/// ## Summary
/// Ends the session with the given hash.
///
/// ## Errors
/// Returns database errors if the delete fails.
pub async fn end_session(conn: &mut DbConnection<'_>, session_hash: &str) -> ServiceResult<()> {
    session::delete(conn, session_hash).await?;
    Ok(())
}
