//! `/api/contacts` handlers.

pub mod dto;

use salvo::http::StatusCode;
use salvo::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderValue};
use salvo::writing::Json;
use salvo::{Depot, Request, Response, Router, handler};

use rolodex_core::constants::CONTACTS_ROUTE_COMPONENT;
use rolodex_core::error::CoreError;
use rolodex_db::db::query::contact_list::ContactListQuery;
use rolodex_service::contact::{self, transfer};

use super::support::{caller, parse_body, path_id, query_flag, query_ids};
use crate::db_handler::get_db_from_depot;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::RequireAuth;
use dto::{ContactPageResponse, ContactRequest, ContactResponse, ContactTagsRequest};

const IMPORT_FIELD: &str = "file";
const NO_FILE_UPLOADED: &str = "No file was uploaded.";

/// ## Summary
/// GET /api/contacts - One page of the caller's contacts.
///
/// Reads `tagId`, `search`, `filters[<field>]`, `sortField`, `sortDescending`,
/// `startingIndex` and `limit` from the query string.
///
/// ## Errors
/// Returns 400 when a numeric or boolean parameter is malformed.
#[handler]
#[tracing::instrument(skip_all, fields(path = %req.uri().path()))]
async fn list_contacts(req: &mut Request, depot: &mut Depot) -> AppResult<Json<ContactPageResponse>> {
    let query = ContactListQuery::from_query_pairs(
        req.queries()
            .iter_all()
            .flat_map(|(key, values)| values.iter().map(move |v| (key.as_str(), v.as_str()))),
    )?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let page = contact::list_contacts(&mut conn, &user, &query).await?;
    tracing::debug!(total = page.total, returned = page.data.len(), "Listed contacts");
    Ok(Json(page.into()))
}

/// ## Summary
/// GET /api/contacts/{id}
///
/// ## Errors
/// Returns 404 when the contact is absent or belongs to someone else.
#[handler]
async fn get_contact(req: &mut Request, depot: &mut Depot) -> AppResult<Json<ContactResponse>> {
    let id = path_id(req)?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(contact::get_contact(&mut conn, &user, id).await?.into()))
}

/// ## Summary
/// POST /api/contacts - Creates a contact and returns it with 201.
///
/// ## Errors
/// Returns 400 for invalid fields, unknown tags, an oversized image or when
/// the contact limit is reached.
#[handler]
async fn add_contact(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<ContactResponse>> {
    let body: ContactRequest = parse_body(req).await?;
    let input = body.into_input()?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let created = contact::add_contact(&mut conn, &user, input).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(created.into()))
}

/// ## Summary
/// PUT /api/contacts/{id} - Replaces a contact's fields and tags.
///
/// ## Errors
/// Returns 400 when the body id differs from the path id, 403 for another
/// user's contact and 404 for an unknown one.
#[handler]
async fn edit_contact(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let id = path_id(req)?;
    let body: ContactRequest = parse_body(req).await?;
    let body_id = body.id;
    let input = body.into_input()?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    contact::edit_contact(&mut conn, &user, id, body_id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// DELETE /api/contacts/{id}
#[handler]
async fn delete_contact(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let id = path_id(req)?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    contact::delete_contact(&mut conn, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// PUT /api/contacts/{id}/favorite - Flips the favorite flag.
#[handler]
async fn toggle_favorite(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let id = path_id(req)?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    contact::toggle_favorite(&mut conn, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// PUT /api/contacts/favorite?ids=&isFavorite= - Sets the flag on many
/// contacts at once.
///
/// ## Errors
/// Returns 400 without ids, 404 when none exist and 403 when any belongs to
/// another user; nothing is changed in those cases.
#[handler]
async fn set_favorites(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let ids = query_ids(req)?;
    let is_favorite = query_flag(req, "isFavorite")?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    contact::set_favorites(&mut conn, &user, &ids, is_favorite).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// PUT /api/contacts/tags?ids= - Replaces the tags of many contacts with the
/// `tagIds` of the body.
#[handler]
async fn replace_tags(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let ids = query_ids(req)?;
    let body: ContactTagsRequest = parse_body(req).await?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    contact::replace_tags_bulk(&mut conn, &user, &ids, &body.tag_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// DELETE /api/contacts/bulk?ids=
#[handler]
async fn delete_contacts(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let ids = query_ids(req)?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    contact::delete_contacts(&mut conn, &user, &ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn write_attachment(res: &mut Response, file: transfer::ExportFile) -> AppResult<StatusCode> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file.file_name))
        .map_err(|_err| CoreError::InvariantViolation("Export file name is not a valid header"))?;

    res.headers_mut().insert(CONTENT_DISPOSITION, disposition);
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    res.body(file.content);
    Ok(StatusCode::OK)
}

/// ## Summary
/// GET /api/contacts/{id}/export - Downloads one contact as
/// `contact-export.json`.
#[handler]
async fn export_contact(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<StatusCode> {
    let id = path_id(req)?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let file = transfer::export_contact(&mut conn, &user, id).await?;
    write_attachment(res, file)
}

/// ## Summary
/// GET /api/contacts/export?ids= - Downloads the listed contacts, or all of
/// them without `ids`, as `contacts-export.json`.
#[handler]
async fn export_contacts(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<StatusCode> {
    let ids = query_ids(req)?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let file = transfer::export_contacts(&mut conn, &user, Some(&ids)).await?;
    write_attachment(res, file)
}

/// ## Summary
/// POST /api/contacts/import - Imports the multipart `file` field and echoes
/// the created contacts.
///
/// ## Errors
/// Returns 400 when no file is attached, the file is not an export, any
/// element is invalid or the import would pass the contact limit.
#[handler]
async fn import_contacts(
    req: &mut Request,
    depot: &mut Depot,
) -> AppResult<Json<Vec<ContactResponse>>> {
    let Some(path) = req.file(IMPORT_FIELD).await.map(|file| file.path().clone()) else {
        return Err(AppError::BadRequest(NO_FILE_UPLOADED.to_string()));
    };
    let content = tokio::fs::read(&path).await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to read uploaded file");
        AppError::BadRequest(NO_FILE_UPLOADED.to_string())
    })?;

    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let imported = transfer::import_contacts(&mut conn, &user, &content).await?;
    Ok(Json(imported.into_iter().map(Into::into).collect()))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(CONTACTS_ROUTE_COMPONENT)
        .hoop(RequireAuth)
        .get(list_contacts)
        .post(add_contact)
        .push(Router::with_path("favorite").put(set_favorites))
        .push(Router::with_path("tags").put(replace_tags))
        .push(Router::with_path("bulk").delete(delete_contacts))
        .push(Router::with_path("export").get(export_contacts))
        .push(Router::with_path("import").post(import_contacts))
        .push(
            Router::with_path("{id:num}")
                .get(get_contact)
                .put(edit_contact)
                .delete(delete_contact)
                .push(Router::with_path("favorite").put(toggle_favorite))
                .push(Router::with_path("export").get(export_contact)),
        )
}
