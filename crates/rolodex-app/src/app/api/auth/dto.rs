//! JSON shapes of the auth endpoints.

use serde::{Deserialize, Serialize};

use rolodex_db::model::user::User;
use rolodex_service::account::profile::ProfileInput;
use rolodex_service::account::{RegisterInput, ResetPasswordInput};

use crate::app::api::support::{decode_image, encode_image};
use crate::error::AppResult;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub password: String,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(request: RegisterRequest) -> Self {
        Self {
            first_name: request.first_name,
            last_name: request.last_name,
            user_name: request.user_name,
            email: request.email,
            password: request.password,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResetPasswordRequest {
    pub user_id: String,
    pub password: String,
    pub code: String,
}

impl From<ResetPasswordRequest> for ResetPasswordInput {
    fn from(request: ResetPasswordRequest) -> Self {
        Self {
            user_id: request.user_id,
            password: request.password,
            code: request.code,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewEmailRequest {
    pub new_email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserRequest {
    /// Base64.
    pub image: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<String>,
    pub remove_image: bool,
}

impl UpdateUserRequest {
    /// ## Summary
    /// Decodes the image and builds the profile edit.
    ///
    /// ## Errors
    /// Returns a validation error when the image is not base64.
    pub fn into_input(self) -> AppResult<ProfileInput> {
        Ok(ProfileInput {
            image: decode_image(self.image)?,
            first_name: self.first_name,
            last_name: self.last_name,
            user_name: self.user_name,
            remove_image: self.remove_image,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteAccountRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub image: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            image: encode_image(user.image.as_deref()),
            first_name: user.first_name,
            last_name: user.last_name,
            user_name: user.user_name,
            email: user.email,
        }
    }
}
