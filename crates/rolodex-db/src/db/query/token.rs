//! One-shot token queries (email confirmation, password reset, email change).

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::enums::TokenPurpose;
use crate::db::schema::user_token;
use crate::error::DbResult;
use crate::model::token::{NewUserToken, UserToken};

/// ## Summary
/// Stores a token after deleting the user's unconsumed tokens of the same
/// purpose, so only the latest link works.
///
/// ## Errors
/// Returns database errors if either statement fails.
pub async fn replace(conn: &mut DbConnection<'_>, token: &NewUserToken) -> DbResult<UserToken> {
    diesel::delete(
        user_token::table
            .filter(user_token::user_id.eq(token.user_id))
            .filter(user_token::purpose.eq(token.purpose))
            .filter(user_token::consumed_at.is_null()),
    )
    .execute(conn)
    .await?;

    Ok(diesel::insert_into(user_token::table)
        .values(token)
        .returning(UserToken::as_returning())
        .get_result::<UserToken>(conn)
        .await?)
}

/// ## Summary
/// Finds an unconsumed, unexpired token matching all of the given keys.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn find_usable(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    purpose: TokenPurpose,
    token_hash: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> DbResult<Option<UserToken>> {
    Ok(user_token::table
        .filter(user_token::user_id.eq(user_id))
        .filter(user_token::purpose.eq(purpose))
        .filter(user_token::token_hash.eq(token_hash))
        .filter(user_token::consumed_at.is_null())
        .filter(user_token::expires_at.gt(now))
        .select(UserToken::as_select())
        .first::<UserToken>(conn)
        .await
        .optional()?)
}

/// ## Summary
/// Marks a token as used. Returns 0 if it was already consumed.
///
/// ## Errors
/// Returns database errors if the update fails.
pub async fn consume(
    conn: &mut DbConnection<'_>,
    id: i64,
    now: chrono::DateTime<chrono::Utc>,
) -> DbResult<usize> {
    Ok(diesel::update(
        user_token::table
            .filter(user_token::id.eq(id))
            .filter(user_token::consumed_at.is_null()),
    )
    .set(user_token::consumed_at.eq(Some(now)))
    .execute(conn)
    .await?)
}

/// ## Summary
/// Removes tokens that were consumed or expired before `now`. They can never
/// be redeemed again.
///
/// ## Errors
/// Returns database errors if the delete fails.
pub async fn delete_spent(
    conn: &mut DbConnection<'_>,
    now: chrono::DateTime<chrono::Utc>,
) -> DbResult<usize> {
    Ok(diesel::delete(
        user_token::table.filter(
            user_token::consumed_at
                .is_not_null()
                .or(user_token::expires_at.le(now)),
        ),
    )
    .execute(conn)
    .await?)
}
