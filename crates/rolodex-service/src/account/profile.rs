//! Profile reads and edits, password change and account deletion.

use chrono::Utc;

use rolodex_core::constants::MAX_IMAGE_SIZE;
use rolodex_db::db::connection::DbConnection;
use rolodex_db::db::query::{session, user};
use rolodex_db::model::user::{User, UserProfileChangeset};

use super::{NEW_PASSWORD_REQUIRED, USER_NOT_FOUND, check_user_name, user_name_taken_message};
use crate::auth::AuthenticatedUser;
use crate::auth::password::{hash_password, password_matches, validate_password_policy};
use crate::contact::IMAGE_TOO_LARGE;
use crate::error::{ServiceError, ServiceResult, ValidationErrors};

const USER_UPDATE_FAILED: &str = "User update failed";
const PASSWORD_CHANGE_FAILED: &str = "Password change failed";
const INCORRECT_PASSWORD: &str = "Password entered is incorrect";

/// Profile fields submitted for an edit. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub image: Option<Vec<u8>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<String>,
    /// Clears the stored image; wins over `image`.
    pub remove_image: bool,
}

impl ProfileInput {
    fn into_changeset(self, errors: &mut ValidationErrors) -> UserProfileChangeset {
        let first_name = self.first_name.map(|v| v.trim().to_owned());
        if first_name.as_deref().is_some_and(str::is_empty) {
            errors.add("firstName", "The FirstName field is required.");
        }

        let last_name = self.last_name.map(|v| v.trim().to_owned());
        if last_name.as_deref().is_some_and(str::is_empty) {
            errors.add("lastName", "The LastName field is required.");
        }

        let user_name = self.user_name.map(|v| v.trim().to_owned());
        if let Some(user_name) = &user_name {
            check_user_name(errors, user_name);
        }

        let image = if self.remove_image {
            Some(None)
        } else {
            self.image.filter(|bytes| !bytes.is_empty()).map(Some)
        };

        UserProfileChangeset {
            first_name,
            last_name,
            user_name,
            image,
            updated_at: Some(Utc::now()),
        }
    }
}

async fn load_caller(conn: &mut DbConnection<'_>, caller: &AuthenticatedUser) -> ServiceResult<User> {
    user::find(conn, caller.id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))
}

/// ## Summary
/// Loads the caller's account.
///
/// ## Errors
/// Returns `NotFound` if the account was deleted under a live session.
#[tracing::instrument(skip(conn, caller), fields(user_id = %caller.id))]
pub async fn get_profile(
    conn: &mut DbConnection<'_>,
    caller: &AuthenticatedUser,
) -> ServiceResult<User> {
    load_caller(conn, caller).await
}

/// ## Summary
/// Edits the caller's profile.
///
/// ## Errors
/// Returns an error if:
/// - the image is larger than 1 MiB (`InvalidRequest`)
/// - a supplied name is blank or the user name is malformed or taken
///   (`Rejected`)
/// - database operations fail
#[tracing::instrument(skip(conn, caller, input), fields(user_id = %caller.id))]
pub async fn update_profile(
    conn: &mut DbConnection<'_>,
    caller: &AuthenticatedUser,
    input: ProfileInput,
) -> ServiceResult<User> {
    if input
        .image
        .as_ref()
        .is_some_and(|bytes| bytes.len() > MAX_IMAGE_SIZE)
    {
        return Err(ServiceError::InvalidRequest(IMAGE_TOO_LARGE.to_string()));
    }

    let mut errors = ValidationErrors::default();
    let changes = input.into_changeset(&mut errors);

    if let Some(user_name) = changes.user_name.as_deref()
        && errors.get("userName").is_none()
        && user::find_by_user_name(conn, user_name)
            .await?
            .is_some_and(|other| other.id != caller.id)
    {
        errors.add("userName", user_name_taken_message(user_name));
    }

    if !errors.is_empty() {
        return Err(ServiceError::rejected(USER_UPDATE_FAILED, errors));
    }

    match user::update_profile(conn, caller.id, &changes).await {
        Ok(Some(updated)) => {
            tracing::info!("Profile updated");
            Ok(updated)
        }
        Ok(None) => Err(ServiceError::NotFound(USER_NOT_FOUND.to_string())),
        Err(e) if e.is_unique_violation() => {
            let mut errors = ValidationErrors::default();
            errors.add(
                "userName",
                user_name_taken_message(changes.user_name.as_deref().unwrap_or_default()),
            );
            Err(ServiceError::rejected(USER_UPDATE_FAILED, errors))
        }
        Err(e) => Err(e.into()),
    }
}

/// ## Summary
/// Replaces the caller's password.
///
/// ## Side Effects
/// - Ends every other session of the account; the current one stays
///
/// ## Errors
/// Returns an error if:
/// - the new password equals the current one (`InvalidRequest`)
/// - the current password is wrong or the new one breaks the length policy
///   (`Rejected`)
#[tracing::instrument(skip_all, fields(user_id = %caller.id))]
pub async fn change_password(
    conn: &mut DbConnection<'_>,
    caller: &AuthenticatedUser,
    current_password: &str,
    new_password: &str,
) -> ServiceResult<()> {
    let account = load_caller(conn, caller).await?;

    if password_matches(new_password, &account.password_hash) {
        return Err(ServiceError::InvalidRequest(NEW_PASSWORD_REQUIRED.to_string()));
    }

    if !password_matches(current_password, &account.password_hash) {
        let mut errors = ValidationErrors::default();
        errors.add("currentPassword", "Incorrect password.");
        return Err(ServiceError::rejected(PASSWORD_CHANGE_FAILED, errors));
    }

    if let Err(ServiceError::Validation(errors)) = validate_password_policy("newPassword", new_password) {
        return Err(ServiceError::rejected(PASSWORD_CHANGE_FAILED, errors));
    }

    let password_hash = hash_password(new_password)?;
    user::set_password_hash(conn, account.id, &password_hash, Utc::now()).await?;
    let revoked = session::delete_for_user(conn, account.id, Some(&caller.session_hash)).await?;

    tracing::info!(revoked_sessions = revoked, "Password changed");
    Ok(())
}

/// ## Summary
/// Deletes the caller's account after checking the password.
///
/// Contacts, addresses, tags, sessions and tokens go with it through
/// `ON DELETE CASCADE`.
///
/// ## Errors
/// Returns `InvalidCredentials` for a wrong password.
#[tracing::instrument(skip_all, fields(user_id = %caller.id))]
pub async fn delete_account(
    conn: &mut DbConnection<'_>,
    caller: &AuthenticatedUser,
    password: &str,
) -> ServiceResult<()> {
    let account = load_caller(conn, caller).await?;

    if !password_matches(password, &account.password_hash) {
        return Err(ServiceError::InvalidCredentials(INCORRECT_PASSWORD.to_string()));
    }

    user::delete(conn, account.id).await?;
    tracing::info!("Account deleted");
    Ok(())
}
