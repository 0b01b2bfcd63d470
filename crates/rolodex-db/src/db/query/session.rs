//! Login session queries.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::{app_user, user_session};
use crate::error::DbResult;
use crate::model::session::{NewUserSession, UserSession};
use crate::model::user::User;

/// ## Summary
/// Stores a new session.
///
/// ## Errors
/// Returns database errors if the insert fails.
pub async fn insert(conn: &mut DbConnection<'_>, session: &NewUserSession) -> DbResult<UserSession> {
    Ok(diesel::insert_into(user_session::table)
        .values(session)
        .returning(UserSession::as_returning())
        .get_result::<UserSession>(conn)
        .await?)
}

/// ## Summary
/// Finds an unexpired session by token hash together with its user.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn find_active(
    conn: &mut DbConnection<'_>,
    token_hash: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> DbResult<Option<(UserSession, User)>> {
    Ok(user_session::table
        .inner_join(app_user::table)
        .filter(user_session::token_hash.eq(token_hash))
        .filter(user_session::expires_at.gt(now))
        .select((UserSession::as_select(), User::as_select()))
        .first::<(UserSession, User)>(conn)
        .await
        .optional()?)
}

/// ## Summary
/// Moves a session's expiry forward.
///
/// ## Errors
/// Returns database errors if the update fails.
pub async fn extend(
    conn: &mut DbConnection<'_>,
    token_hash: &str,
    expires_at: chrono::DateTime<chrono::Utc>,
) -> DbResult<usize> {
    Ok(diesel::update(user_session::table.find(token_hash))
        .set(user_session::expires_at.eq(expires_at))
        .execute(conn)
        .await?)
}

/// ## Summary
/// Deletes one session.
///
/// ## Errors
/// Returns database errors if the delete fails.
pub async fn delete(conn: &mut DbConnection<'_>, token_hash: &str) -> DbResult<usize> {
    Ok(diesel::delete(user_session::table.find(token_hash))
        .execute(conn)
        .await?)
}

/// ## Summary
/// Deletes every session of a user except, optionally, the one in use.
///
/// ## Errors
/// Returns database errors if the delete fails.
pub async fn delete_for_user(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    keep: Option<&str>,
) -> DbResult<usize> {
    let mut query = user_session::table
        .filter(user_session::user_id.eq(user_id))
        .into_boxed();
    if let Some(keep) = keep {
        query = query.filter(user_session::token_hash.ne(keep.to_owned()));
    }
    let hashes = query
        .select(user_session::token_hash)
        .load::<String>(conn)
        .await?;

    Ok(
        diesel::delete(user_session::table.filter(user_session::token_hash.eq_any(hashes)))
            .execute(conn)
            .await?,
    )
}

/// ## Summary
/// Removes sessions that expired before `now`.
///
/// ## Errors
/// Returns database errors if the delete fails.
pub async fn delete_expired(
    conn: &mut DbConnection<'_>,
    now: chrono::DateTime<chrono::Utc>,
) -> DbResult<usize> {
    Ok(
        diesel::delete(user_session::table.filter(user_session::expires_at.le(now)))
            .execute(conn)
            .await?,
    )
}
