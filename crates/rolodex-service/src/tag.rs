//! Tag store operations.
//!
//! Tags are per-user labels. Names are stored with a leading capital and are
//! unique per user after that normalization.

use chrono::Utc;
use diesel_async::scoped_futures::ScopedFutureExt;

use rolodex_core::constants::MAX_TAG_COUNT;
use rolodex_core::util::text::capitalize_first;
use rolodex_db::db::connection::DbConnection;
use rolodex_db::db::query::{tag, user as account};
use rolodex_db::db::transaction::with_transaction;
use rolodex_db::model::tag::{NewTag, Tag};

use crate::auth::AuthenticatedUser;
use crate::error::{ID_MISMATCH, ServiceError, ServiceResult};

const TAG_NOT_FOUND: &str = "Tag not found";
const TAG_NAME_TAKEN: &str = "Tag name already exists";
const TAG_LIMIT_REACHED: &str = "You have reached the maximum number of tags.";

/// ## Summary
/// Trims and capitalizes a tag name.
///
/// ## Errors
/// Returns a validation error on `name` if nothing is left after trimming.
pub fn normalize_tag_name(name: &str) -> ServiceResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::invalid("name", "The Name field is required."));
    }
    Ok(capitalize_first(trimmed))
}

/// ## Summary
/// Lists the caller's tags ordered by name.
///
/// ## Errors
/// Returns database errors if the query fails.
#[tracing::instrument(skip(conn, user), fields(user_id = %user.id))]
pub async fn list_tags(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
) -> ServiceResult<Vec<Tag>> {
    let tags = tag::list_for_user(conn, user.id).await?;
    tracing::debug!(count = tags.len(), "Listed tags");
    Ok(tags)
}

/// ## Summary
/// Fetches one of the caller's tags.
///
/// ## Errors
/// Returns `NotFound` when the tag does not exist or belongs to someone else.
#[tracing::instrument(skip(conn, user), fields(user_id = %user.id))]
pub async fn get_tag(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    id: i64,
) -> ServiceResult<Tag> {
    tag::find_owned(conn, id, user.id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(TAG_NOT_FOUND.to_string()))
}

/// ## Summary
/// Creates a tag for the caller.
///
/// ## Side Effects
/// - Locks the caller's account row, then inserts a `tag` row in one
///   transaction
///
/// ## Errors
/// Returns an error if:
/// - the name is empty
/// - the caller already owns the maximum number of tags
/// - the caller already has a tag with the same name
/// - database operations fail
#[tracing::instrument(skip(conn, user), fields(user_id = %user.id))]
pub async fn add_tag(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    name: &str,
) -> ServiceResult<Tag> {
    let name = normalize_tag_name(name)?;
    let user_id = user.id;

    let created = with_transaction(conn, move |tx| {
        async move {
            account::lock_for_update(tx, user_id).await?;
            let count = tag::count_for_user(tx, user_id).await?;
            if count >= MAX_TAG_COUNT {
                tracing::debug!(count, "Tag limit reached");
                return Err(ServiceError::CapacityExceeded(TAG_LIMIT_REACHED.to_string()));
            }

            if tag::name_taken(tx, user_id, &name, None).await? {
                return Err(ServiceError::Conflict(TAG_NAME_TAKEN.to_string()));
            }

            tag::insert(tx, &NewTag { user_id, name })
                .await
                .map_err(|e| {
                    // Lost a race with a concurrent rename to the same name.
                    if e.is_unique_violation() {
                        ServiceError::Conflict(TAG_NAME_TAKEN.to_string())
                    } else {
                        e.into()
                    }
                })
        }
        .scope_boxed()
    })
    .await?;

    tracing::info!(tag_id = created.id, "Tag created");
    Ok(created)
}

/// ## Summary
/// Renames one of the caller's tags.
///
/// `path_id` comes from the URL and `body_id` from the request body; they
/// must agree.
///
/// ## Errors
/// Returns an error if:
/// - the ids disagree or the name is empty
/// - the tag does not exist or belongs to someone else
/// - another of the caller's tags already has the name
/// - database operations fail
#[tracing::instrument(skip(conn, user), fields(user_id = %user.id))]
pub async fn edit_tag(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    path_id: i64,
    body_id: i64,
    name: &str,
) -> ServiceResult<Tag> {
    if path_id != body_id {
        return Err(ServiceError::InvalidRequest(ID_MISMATCH.to_string()));
    }
    let name = normalize_tag_name(name)?;

    if tag::find_owned(conn, path_id, user.id).await?.is_none() {
        return Err(ServiceError::NotFound(TAG_NOT_FOUND.to_string()));
    }

    if tag::name_taken(conn, user.id, &name, Some(path_id)).await? {
        return Err(ServiceError::Conflict(TAG_NAME_TAKEN.to_string()));
    }

    match tag::rename(conn, path_id, user.id, &name, Utc::now()).await {
        Ok(Some(updated)) => {
            tracing::info!(tag_id = updated.id, "Tag renamed");
            Ok(updated)
        }
        // Deleted between the lookup and the update.
        Ok(None) => Err(ServiceError::NotFound(TAG_NOT_FOUND.to_string())),
        Err(e) if e.is_unique_violation() => {
            Err(ServiceError::Conflict(TAG_NAME_TAKEN.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// ## Summary
/// Deletes one of the caller's tags. Contacts keep existing; only their
/// links to this tag go away.
///
/// ## Errors
/// Returns `NotFound` when the tag does not exist or belongs to someone else.
#[tracing::instrument(skip(conn, user), fields(user_id = %user.id))]
pub async fn delete_tag(
    conn: &mut DbConnection<'_>,
    user: &AuthenticatedUser,
    id: i64,
) -> ServiceResult<()> {
    let deleted = tag::delete(conn, id, user.id).await?;
    if deleted == 0 {
        return Err(ServiceError::NotFound(TAG_NOT_FOUND.to_string()));
    }
    tracing::info!(tag_id = id, "Tag deleted");
    Ok(())
}
