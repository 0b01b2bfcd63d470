//! `/api/auth` handlers: account lifecycle and the session cookie.

pub mod dto;

use salvo::http::StatusCode;
use salvo::http::cookie::{Cookie, SameSite};
use salvo::http::header::{HeaderValue, LOCATION};
use salvo::writing::Json;
use salvo::{Depot, Request, Response, Router, handler};

use rolodex_core::config::Settings;
use rolodex_core::constants::AUTH_ROUTE_COMPONENT;
use rolodex_core::error::CoreError;
use rolodex_service::account::links::LinkOutcome;
use rolodex_service::account::{self, profile};

use super::support::{MessageResponse, caller, parse_body};
use crate::config::get_config_from_depot;
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;
use crate::mail_handler::get_mailer_from_depot;
use crate::middleware::auth::RequireAuth;
use dto::{
    ChangePasswordRequest, DeleteAccountRequest, ForgotPasswordRequest, LoginRequest,
    NewEmailRequest, RegisterRequest, ResetPasswordRequest, UpdateUserRequest, UserResponse,
};

fn session_cookie(settings: &Settings, value: String) -> Cookie<'static> {
    Cookie::build((settings.auth.cookie_name.clone(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::None)
        .secure(settings.auth.cookie_secure)
        .build()
}

fn clear_session_cookie(res: &mut Response, settings: &Settings) {
    let mut cookie = session_cookie(settings, String::new());
    cookie.make_removal();
    res.add_cookie(cookie);
}

fn redirect(res: &mut Response, settings: &Settings, outcome: &LinkOutcome) -> AppResult<StatusCode> {
    let url = outcome.redirect_url(settings)?;
    let location = HeaderValue::from_str(&url)
        .map_err(|_err| CoreError::InvariantViolation("Redirect URL is not a valid header"))?;
    res.headers_mut().insert(LOCATION, location);
    Ok(StatusCode::FOUND)
}

/// Query parameters of an emailed link; `None` when absent.
fn link_param(req: &Request, name: &str) -> Option<String> {
    req.query::<String>(name)
}

/// ## Summary
/// POST /api/auth/register
///
/// ## Side Effects
/// - Creates the account
/// - Mails a confirmation link
///
/// ## Errors
/// Returns 400 with per-field errors when registration is rejected.
#[handler]
async fn register(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<MessageResponse>> {
    let body: RegisterRequest = parse_body(req).await?;
    let settings = get_config_from_depot(depot)?;
    let mailer = get_mailer_from_depot(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    account::register(&mut conn, &settings, mailer.as_ref(), body.into()).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(MessageResponse::new("Registration successful")))
}

/// ## Summary
/// POST /api/auth/login - Starts a session and sets the session cookie.
///
/// ## Errors
/// Returns 400 for an unknown user name, a wrong password or an unconfirmed
/// email.
#[handler]
async fn login(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<MessageResponse>> {
    let body: LoginRequest = parse_body(req).await?;
    let settings = get_config_from_depot(depot)?;
    let mailer = get_mailer_from_depot(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let session = account::login(
        &mut conn,
        &settings,
        mailer.as_ref(),
        &body.user_name,
        &body.password,
    )
    .await?;

    res.add_cookie(session_cookie(&settings, session.token));
    Ok(Json(MessageResponse::new("Login successful")))
}

/// ## Summary
/// POST /api/auth/logout - Ends the session and clears the cookie.
#[handler]
async fn logout(depot: &mut Depot, res: &mut Response) -> AppResult<Json<MessageResponse>> {
    let user = caller(depot)?;
    let settings = get_config_from_depot(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    account::logout(&mut conn, &user).await?;
    clear_session_cookie(res, &settings);
    Ok(Json(MessageResponse::new("Logout successful")))
}

/// ## Summary
/// GET /api/auth/confirm-email?userId&code - Confirms the email and
/// redirects to the frontend confirmation page.
#[handler]
async fn confirm_email(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<StatusCode> {
    let user_id = link_param(req, "userId");
    let code = link_param(req, "code");
    let settings = get_config_from_depot(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let outcome = account::confirm_email(&mut conn, user_id.as_deref(), code.as_deref()).await?;
    redirect(res, &settings, &outcome)
}

/// ## Summary
/// POST /api/auth/forgot-password - Mails a password reset link.
///
/// ## Errors
/// Returns 400 when the email belongs to no account.
#[handler]
async fn forgot_password(req: &mut Request, depot: &mut Depot) -> AppResult<Json<MessageResponse>> {
    let body: ForgotPasswordRequest = parse_body(req).await?;
    let settings = get_config_from_depot(depot)?;
    let mailer = get_mailer_from_depot(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    account::forgot_password(&mut conn, &settings, mailer.as_ref(), &body.email).await?;
    Ok(Json(MessageResponse::new("Password reset link sent successfully")))
}

/// ## Summary
/// GET /api/auth/reset-password?userId&code - Checks a reset link without
/// consuming it and redirects to the frontend reset page.
#[handler]
async fn validate_reset_link(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<StatusCode> {
    let user_id = link_param(req, "userId");
    let code = link_param(req, "code");
    let settings = get_config_from_depot(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let outcome =
        account::validate_reset_link(&mut conn, &settings, user_id.as_deref(), code.as_deref())
            .await?;
    redirect(res, &settings, &outcome)
}

/// ## Summary
/// POST /api/auth/reset-password - Sets a new password with a reset code.
///
/// ## Side Effects
/// - Ends every session of the account
#[handler]
async fn reset_password(req: &mut Request, depot: &mut Depot) -> AppResult<Json<MessageResponse>> {
    let body: ResetPasswordRequest = parse_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    account::reset_password(&mut conn, body.into()).await?;
    Ok(Json(MessageResponse::new("Password reset successful")))
}

/// ## Summary
/// POST /api/auth/change-email - Mails a confirmation link to the new
/// address.
#[handler]
async fn request_email_change(
    req: &mut Request,
    depot: &mut Depot,
) -> AppResult<Json<MessageResponse>> {
    let body: NewEmailRequest = parse_body(req).await?;
    let user = caller(depot)?;
    let settings = get_config_from_depot(depot)?;
    let mailer = get_mailer_from_depot(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    account::request_email_change(&mut conn, &settings, mailer.as_ref(), &user, &body.new_email)
        .await?;
    Ok(Json(MessageResponse::new("Email change link sent successfully")))
}

/// ## Summary
/// GET /api/auth/change-email?userId&newEmail&code - Applies an email change
/// and redirects to the frontend confirmation page.
#[handler]
async fn change_email(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<StatusCode> {
    let user_id = link_param(req, "userId");
    let new_email = link_param(req, "newEmail");
    let code = link_param(req, "code");
    let settings = get_config_from_depot(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let outcome = account::change_email(
        &mut conn,
        user_id.as_deref(),
        new_email.as_deref(),
        code.as_deref(),
    )
    .await?;
    redirect(res, &settings, &outcome)
}

/// ## Summary
/// GET /api/auth/user - The caller's profile.
#[handler]
async fn get_user(depot: &mut Depot) -> AppResult<Json<UserResponse>> {
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(profile::get_profile(&mut conn, &user).await?.into()))
}

/// ## Summary
/// PUT /api/auth/user - Edits the caller's profile.
///
/// ## Errors
/// Returns 400 for an oversized image, blank names or a malformed or taken
/// user name.
#[handler]
async fn update_user(req: &mut Request, depot: &mut Depot) -> AppResult<Json<MessageResponse>> {
    let body: UpdateUserRequest = parse_body(req).await?;
    let input = body.into_input()?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    profile::update_profile(&mut conn, &user, input).await?;
    Ok(Json(MessageResponse::new("User updated successfully")))
}

/// ## Summary
/// PUT /api/auth/change-password
///
/// ## Side Effects
/// - Ends the caller's other sessions
#[handler]
async fn change_password(req: &mut Request, depot: &mut Depot) -> AppResult<Json<MessageResponse>> {
    let body: ChangePasswordRequest = parse_body(req).await?;
    let user = caller(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    profile::change_password(&mut conn, &user, &body.current_password, &body.new_password).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// ## Summary
/// POST /api/auth/delete-account - Deletes the caller's account and all of
/// its data, then clears the cookie.
#[handler]
async fn delete_account(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<MessageResponse>> {
    let body: DeleteAccountRequest = parse_body(req).await?;
    let user = caller(depot)?;
    let settings = get_config_from_depot(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    profile::delete_account(&mut conn, &user, &body.password).await?;
    clear_session_cookie(res, &settings);
    Ok(Json(MessageResponse::new("Account deleted successfully")))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(AUTH_ROUTE_COMPONENT)
        .push(Router::with_path("register").post(register))
        .push(Router::with_path("login").post(login))
        .push(Router::with_path("confirm-email").get(confirm_email))
        .push(Router::with_path("forgot-password").post(forgot_password))
        .push(
            Router::with_path("reset-password")
                .get(validate_reset_link)
                .post(reset_password),
        )
        .push(Router::with_path("change-email").get(change_email))
        .push(
            Router::new()
                .hoop(RequireAuth)
                .push(Router::with_path("logout").post(logout))
                .push(Router::with_path("change-email").post(request_email_change))
                .push(Router::with_path("user").get(get_user).put(update_user))
                .push(Router::with_path("change-password").put(change_password))
                .push(Router::with_path("delete-account").post(delete_account)),
        )
}
