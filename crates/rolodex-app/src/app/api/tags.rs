//! `/api/tags` handlers.

use chrono::{DateTime, Utc};
use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::{Deserialize, Serialize};

use rolodex_core::constants::TAGS_ROUTE_COMPONENT;
use rolodex_db::model::tag::Tag;
use rolodex_service::tag;

use super::support::{caller, parse_body, path_id};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;
use crate::middleware::auth::RequireAuth;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTagRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTagRequest {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            created_at: tag.created_at,
            updated_at: tag.updated_at,
        }
    }
}

/// ## Summary
/// GET /api/tags - The caller's tags ordered by name.
#[handler]
async fn list_tags(depot: &mut Depot) -> AppResult<Json<Vec<TagResponse>>> {
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let tags = tag::list_tags(&mut conn, &user).await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

/// ## Summary
/// GET /api/tags/{id}
///
/// ## Errors
/// Returns 404 when the tag does not exist or belongs to someone else.
#[handler]
async fn get_tag(req: &mut Request, depot: &mut Depot) -> AppResult<Json<TagResponse>> {
    let id = path_id(req)?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(tag::get_tag(&mut conn, &user, id).await?.into()))
}

/// ## Summary
/// POST /api/tags - Creates a tag and returns it with 201.
///
/// ## Errors
/// Returns 400 for a blank or duplicate name or when the tag limit is reached.
#[handler]
async fn add_tag(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<TagResponse>> {
    let body: AddTagRequest = parse_body(req).await?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let created = tag::add_tag(&mut conn, &user, &body.name).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(created.into()))
}

/// ## Summary
/// PUT /api/tags/{id} - Renames a tag.
///
/// ## Errors
/// Returns 400 when the body id differs from the path id or the name is
/// blank or taken, and 404 when the tag is not the caller's.
#[handler]
async fn edit_tag(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let id = path_id(req)?;
    let body: UpdateTagRequest = parse_body(req).await?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    tag::edit_tag(&mut conn, &user, id, body.id, &body.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// DELETE /api/tags/{id} - Deletes a tag; contacts keep existing.
#[handler]
async fn delete_tag(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let id = path_id(req)?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    tag::delete_tag(&mut conn, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(TAGS_ROUTE_COMPONENT)
        .hoop(RequireAuth)
        .get(list_tags)
        .post(add_tag)
        .push(
            Router::with_path("{id:num}")
                .get(get_tag)
                .put(edit_tag)
                .delete(delete_tag),
        )
}
