//! Account queries.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::app_user;
use crate::error::DbResult;
use crate::model::user::{NewUser, User, UserProfileChangeset};

diesel::define_sql_function!(fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text);

/// ## Summary
/// Finds a user by id.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn find(conn: &mut DbConnection<'_>, id: uuid::Uuid) -> DbResult<Option<User>> {
    Ok(app_user::table
        .find(id)
        .select(User::as_select())
        .first::<User>(conn)
        .await
        .optional()?)
}

/// ## Summary
/// Takes a row lock on a user until the surrounding transaction ends.
/// Writers that check a per-user cap lock first so their count and insert
/// cannot interleave.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn lock_for_update(conn: &mut DbConnection<'_>, id: uuid::Uuid) -> DbResult<()> {
    app_user::table
        .find(id)
        .select(app_user::id)
        .for_update()
        .first::<uuid::Uuid>(conn)
        .await
        .optional()?;
    Ok(())
}

/// ## Summary
/// Finds a user by user name.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn find_by_user_name(
    conn: &mut DbConnection<'_>,
    user_name: &str,
) -> DbResult<Option<User>> {
    Ok(app_user::table
        .filter(app_user::user_name.eq(user_name))
        .select(User::as_select())
        .first::<User>(conn)
        .await
        .optional()?)
}

/// ## Summary
/// Finds a user by email address, ignoring case.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn find_by_email(conn: &mut DbConnection<'_>, email: &str) -> DbResult<Option<User>> {
    Ok(app_user::table
        .filter(lower(app_user::email).eq(email.to_lowercase()))
        .select(User::as_select())
        .first::<User>(conn)
        .await
        .optional()?)
}

/// ## Summary
/// Inserts a user and returns the stored row.
///
/// ## Errors
/// Returns database errors if the insert fails, including unique violations
/// on user name or email.
pub async fn insert(conn: &mut DbConnection<'_>, new_user: &NewUser) -> DbResult<User> {
    Ok(diesel::insert_into(app_user::table)
        .values(new_user)
        .returning(User::as_returning())
        .get_result::<User>(conn)
        .await?)
}

/// ## Summary
/// Applies profile changes and returns the updated row.
///
/// ## Errors
/// Returns database errors if the update fails.
pub async fn update_profile(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
    changes: &UserProfileChangeset,
) -> DbResult<Option<User>> {
    Ok(diesel::update(app_user::table.find(id))
        .set(changes)
        .returning(User::as_returning())
        .get_result::<User>(conn)
        .await
        .optional()?)
}

/// ## Summary
/// Stores a new password hash.
///
/// ## Errors
/// Returns database errors if the update fails.
pub async fn set_password_hash(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
    password_hash: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> DbResult<usize> {
    Ok(diesel::update(app_user::table.find(id))
        .set((
            app_user::password_hash.eq(password_hash),
            app_user::updated_at.eq(Some(now)),
        ))
        .execute(conn)
        .await?)
}

/// ## Summary
/// Marks the user's email address as confirmed.
///
/// ## Errors
/// Returns database errors if the update fails.
pub async fn confirm_email(conn: &mut DbConnection<'_>, id: uuid::Uuid) -> DbResult<usize> {
    Ok(diesel::update(app_user::table.find(id))
        .set(app_user::email_confirmed.eq(true))
        .execute(conn)
        .await?)
}

/// ## Summary
/// Replaces the user's email address with a confirmed one.
///
/// ## Errors
/// Returns database errors if the update fails, including a unique violation
/// when another account took the address in the meantime.
pub async fn set_email(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
    email: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> DbResult<usize> {
    Ok(diesel::update(app_user::table.find(id))
        .set((
            app_user::email.eq(email),
            app_user::email_confirmed.eq(true),
            app_user::updated_at.eq(Some(now)),
        ))
        .execute(conn)
        .await?)
}

/// ## Summary
/// Deletes a user. Contacts, tags, sessions and tokens cascade.
///
/// ## Errors
/// Returns database errors if the delete fails.
pub async fn delete(conn: &mut DbConnection<'_>, id: uuid::Uuid) -> DbResult<usize> {
    Ok(diesel::delete(app_user::table.find(id))
        .execute(conn)
        .await?)
}
