//! Tag queries, always scoped to the owning user.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::tag;
use crate::error::DbResult;
use crate::model::tag::{NewTag, Tag};

/// ## Summary
/// Lists a user's tags ordered by name.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn list_for_user(conn: &mut DbConnection<'_>, user_id: uuid::Uuid) -> DbResult<Vec<Tag>> {
    Ok(tag::table
        .filter(tag::user_id.eq(user_id))
        .order((tag::name.asc(), tag::id.asc()))
        .select(Tag::as_select())
        .load::<Tag>(conn)
        .await?)
}

/// ## Summary
/// Finds a tag by id if it belongs to `user_id`.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn find_owned(
    conn: &mut DbConnection<'_>,
    id: i64,
    user_id: uuid::Uuid,
) -> DbResult<Option<Tag>> {
    Ok(tag::table
        .filter(tag::id.eq(id))
        .filter(tag::user_id.eq(user_id))
        .select(Tag::as_select())
        .first::<Tag>(conn)
        .await
        .optional()?)
}

/// ## Summary
/// Counts the tags a user owns.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn count_for_user(conn: &mut DbConnection<'_>, user_id: uuid::Uuid) -> DbResult<i64> {
    Ok(tag::table
        .filter(tag::user_id.eq(user_id))
        .count()
        .get_result::<i64>(conn)
        .await?)
}

/// ## Summary
/// Returns whether the user already has a tag called `name`, ignoring the tag
/// `except` (the one being renamed).
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn name_taken(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    name: &str,
    except: Option<i64>,
) -> DbResult<bool> {
    let mut query = tag::table
        .filter(tag::user_id.eq(user_id))
        .filter(tag::name.eq(name.to_owned()))
        .into_boxed();
    if let Some(except) = except {
        query = query.filter(tag::id.ne(except));
    }
    Ok(diesel::select(diesel::dsl::exists(query))
        .get_result::<bool>(conn)
        .await?)
}

/// ## Summary
/// Returns the subset of `ids` that are tags owned by `user_id`.
///
/// ## Errors
/// Returns database errors if the query fails.
pub async fn owned_ids(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    ids: &[i64],
) -> DbResult<Vec<i64>> {
    Ok(tag::table
        .filter(tag::id.eq_any(ids))
        .filter(tag::user_id.eq(user_id))
        .select(tag::id)
        .load::<i64>(conn)
        .await?)
}

/// ## Summary
/// Inserts a tag and returns the stored row.
///
/// ## Errors
/// Returns database errors if the insert fails, including a unique violation
/// when the name is taken.
pub async fn insert(conn: &mut DbConnection<'_>, new_tag: &NewTag) -> DbResult<Tag> {
    Ok(diesel::insert_into(tag::table)
        .values(new_tag)
        .returning(Tag::as_returning())
        .get_result::<Tag>(conn)
        .await?)
}

/// ## Summary
/// Renames a tag owned by `user_id`. Returns `None` when there is no such tag.
///
/// ## Errors
/// Returns database errors if the update fails.
pub async fn rename(
    conn: &mut DbConnection<'_>,
    id: i64,
    user_id: uuid::Uuid,
    name: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> DbResult<Option<Tag>> {
    Ok(diesel::update(
        tag::table
            .filter(tag::id.eq(id))
            .filter(tag::user_id.eq(user_id)),
    )
    .set((tag::name.eq(name), tag::updated_at.eq(Some(now))))
    .returning(Tag::as_returning())
    .get_result::<Tag>(conn)
    .await
    .optional()?)
}

/// ## Summary
/// Deletes a tag owned by `user_id`; its contact links cascade.
///
/// ## Errors
/// Returns database errors if the delete fails.
pub async fn delete(conn: &mut DbConnection<'_>, id: i64, user_id: uuid::Uuid) -> DbResult<usize> {
    Ok(diesel::delete(
        tag::table
            .filter(tag::id.eq(id))
            .filter(tag::user_id.eq(user_id)),
    )
    .execute(conn)
    .await?)
}
