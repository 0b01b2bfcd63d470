//! Request plumbing shared by the API handlers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use salvo::{Depot, Request};
use serde::Serialize;
use serde::de::DeserializeOwned;

use rolodex_service::auth::depot::{AuthenticatedUser, get_user_from_depot};
use rolodex_service::error::ServiceError;

use crate::error::{AppError, AppResult};

/// Largest accepted JSON body. Leaves room for a base64 image of 1 MiB.
pub const MAX_JSON_BODY_SIZE: usize = 4 * 1024 * 1024;

const INVALID_BODY: &str = "The request body is not valid JSON.";
const INVALID_PATH_ID: &str = "The id in the URL is not valid.";
const INVALID_IMAGE: &str = "The image is not valid base64.";

/// Body of plain success responses.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// ## Summary
/// Deserializes the JSON body of a request.
///
/// ## Errors
/// Returns `BadRequest` when the body is missing, too large or malformed.
pub async fn parse_body<T: DeserializeOwned>(req: &mut Request) -> AppResult<T> {
    req.parse_json_with_max_size::<T>(MAX_JSON_BODY_SIZE)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "Failed to parse request body");
            AppError::BadRequest(INVALID_BODY.to_string())
        })
}

/// ## Summary
/// Returns the caller attached by the auth middleware.
///
/// ## Errors
/// Returns `NotAuthenticated` when the request has no session.
pub fn caller(depot: &Depot) -> AppResult<AuthenticatedUser> {
    Ok(get_user_from_depot(depot)?.clone())
}

/// ## Summary
/// Reads the numeric `{id}` path parameter.
///
/// ## Errors
/// Returns `BadRequest` when it is missing or not a number.
pub fn path_id(req: &Request) -> AppResult<i64> {
    req.param::<i64>("id")
        .ok_or_else(|| AppError::BadRequest(INVALID_PATH_ID.to_string()))
}

/// ## Summary
/// Reads every `ids` query value. Both `ids=1&ids=2` and `ids=1,2` are
/// accepted.
///
/// ## Errors
/// Returns `BadRequest` when a value is not a number.
pub fn query_ids(req: &Request) -> AppResult<Vec<i64>> {
    let Some(values) = req.queries().get_vec("ids") else {
        return Ok(Vec::new());
    };
    parse_ids(values.iter().map(String::as_str))
}

fn parse_ids<'a>(values: impl Iterator<Item = &'a str>) -> AppResult<Vec<i64>> {
    values
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|_err| {
                AppError::BadRequest(format!("The value '{part}' is not valid for ids."))
            })
        })
        .collect()
}

/// ## Summary
/// Reads a boolean query parameter; absent or empty means `false`.
///
/// ## Errors
/// Returns `BadRequest` for anything but `true` or `false`.
pub fn query_flag(req: &Request, name: &str) -> AppResult<bool> {
    let value = req.query::<String>(name).unwrap_or_default();
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" => Ok(false),
        "true" => Ok(true),
        _ => Err(AppError::BadRequest(format!(
            "The value '{value}' is not valid for {name}."
        ))),
    }
}

/// ## Summary
/// Decodes a base64 image field. `None` and empty strings mean no image.
///
/// ## Errors
/// Returns a validation error on `image` when the value is not base64.
pub fn decode_image(image: Option<String>) -> AppResult<Option<Vec<u8>>> {
    let Some(encoded) = image.filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    STANDARD
        .decode(encoded.as_bytes())
        .map(Some)
        .map_err(|_err| ServiceError::invalid("image", INVALID_IMAGE).into())
}

#[must_use]
pub fn encode_image(image: Option<&[u8]>) -> Option<String> {
    image.map(|bytes| STANDARD.encode(bytes))
}
