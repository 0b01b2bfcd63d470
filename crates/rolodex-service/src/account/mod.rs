//! Account lifecycle: registration, login and the emailed-link flows.
//!
//! ## Module Organization
//!
//! - `links`: absolute links for emails and the frontend redirect targets
//! - `profile`: profile reads and edits, password change, account deletion
//!
//! Emailed links carry a random one-shot code; only its SHA-256 is stored.
//! Issuing a new code for the same purpose revokes the older ones.

pub mod links;
pub mod profile;

use chrono::{Duration, Utc};
use diesel_async::scoped_futures::ScopedFutureExt;

use rolodex_core::config::Settings;
use rolodex_core::util::text::{is_valid_email, is_valid_user_name};
use rolodex_db::db::connection::DbConnection;
use rolodex_db::db::enums::TokenPurpose;
use rolodex_db::db::query::{session, token, user};
use rolodex_db::db::transaction::with_transaction;
use rolodex_db::model::token::{NewUserToken, UserToken};
use rolodex_db::model::user::{NewUser, User};

use crate::auth::AuthenticatedUser;
use crate::auth::password::{hash_password, password_matches, validate_password_policy};
use crate::auth::session::{StartedSession, start_session};
use crate::auth::token::{generate_token, hash_token};
use crate::error::{ServiceError, ServiceResult, ValidationErrors};
use crate::mail::Mailer;

use links::{
    EMAIL_CONFIRMATION_PAGE, LinkOutcome, RESET_PASSWORD_PAGE, api_link, confirmation_mail,
    password_reset_mail,
};

pub(crate) const USER_NOT_FOUND: &str = "User not found";
pub(crate) const NEW_PASSWORD_REQUIRED: &str = "Please enter a new password.";

const REGISTRATION_FAILED: &str = "Registration failed";
const UNKNOWN_USER_NAME: &str = "The username you entered isn\u{2019}t connected to an account.";
const WRONG_PASSWORD: &str = "The password you\u{2019}ve entered is incorrect.";
const EMAIL_NOT_CONFIRMED: &str = "Email not confirmed";
const UNKNOWN_EMAIL: &str = "The email you entered isn\u{2019}t connected to an account.";
const PASSWORD_RESET_FAILED: &str = "Password reset failed";
const SAME_EMAIL: &str = "Please enter a new email.";
const EMAIL_TAKEN: &str = "Email already exists";

const ACCOUNT_NOT_FOUND: &str = "Sorry, we couldn't find your account";

/// Fields submitted at registration.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub password: String,
}

/// Fields submitted with a password reset.
#[derive(Debug, Clone, Default)]
pub struct ResetPasswordInput {
    pub user_id: String,
    pub password: String,
    pub code: String,
}

pub(crate) fn user_name_taken_message(user_name: &str) -> String {
    format!("Username '{user_name}' is already taken.")
}

/// Adds a `userName` format error when the value is not a valid user name.
pub(crate) fn check_user_name(errors: &mut ValidationErrors, user_name: &str) {
    if user_name.is_empty() {
        errors.add("userName", "The UserName field is required.");
    } else if !is_valid_user_name(user_name) {
        errors.add(
            "userName",
            format!("Username '{user_name}' is invalid, can only contain letters, digits or underscores."),
        );
    }
}

fn token_ttl(settings: &Settings) -> Duration {
    Duration::minutes(i64::from(settings.auth.token_ttl_minutes))
}

/// Issues a one-shot code for `user_id` and returns the raw value. Spent
/// codes of every user are swept first.
async fn issue_token(
    conn: &mut DbConnection<'_>,
    settings: &Settings,
    user_id: uuid::Uuid,
    purpose: TokenPurpose,
    new_email: Option<String>,
) -> ServiceResult<String> {
    let now = Utc::now();
    let purged = token::delete_spent(conn, now).await?;
    if purged > 0 {
        tracing::debug!(purged, "Spent tokens removed");
    }

    let generated = generate_token();
    token::replace(
        conn,
        &NewUserToken {
            user_id,
            purpose,
            token_hash: generated.hash,
            new_email,
            expires_at: now + token_ttl(settings),
        },
    )
    .await?;
    tracing::debug!(%purpose, "Issued one-shot token");
    Ok(generated.raw)
}

async fn find_token(
    conn: &mut DbConnection<'_>,
    user_id: uuid::Uuid,
    purpose: TokenPurpose,
    code: &str,
) -> ServiceResult<Option<UserToken>> {
    Ok(token::find_usable(conn, user_id, purpose, &hash_token(code), Utc::now()).await?)
}

/// Looks up the user named by a link's `userId`; a malformed id is treated
/// as unknown.
async fn find_link_user(conn: &mut DbConnection<'_>, user_id: &str) -> ServiceResult<Option<User>> {
    let Ok(id) = uuid::Uuid::parse_str(user_id) else {
        return Ok(None);
    };
    Ok(user::find(conn, id).await?)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

async fn send_confirmation(
    conn: &mut DbConnection<'_>,
    settings: &Settings,
    mailer: &dyn Mailer,
    account: &User,
) -> ServiceResult<()> {
    let code = issue_token(conn, settings, account.id, TokenPurpose::ConfirmEmail, None).await?;
    let user_id = account.id.to_string();
    let link = api_link(
        settings,
        "confirm-email",
        &[("userId", user_id.as_str()), ("code", code.as_str())],
    )?;
    mailer.send(confirmation_mail(&account.email, link)).await
}

/// ## Summary
/// Creates an account and emails a confirmation link.
///
/// ## Side Effects
/// - Inserts an `app_user` row with an Argon2 password hash
/// - Sends a confirmation mail
///
/// ## Errors
/// Returns `Rejected` with per-field reasons when a field is malformed or the
/// user name or email is taken; database or mail errors otherwise.
#[tracing::instrument(skip(conn, settings, mailer, input), fields(user_name = %input.user_name))]
pub async fn register(
    conn: &mut DbConnection<'_>,
    settings: &Settings,
    mailer: &dyn Mailer,
    input: RegisterInput,
) -> ServiceResult<User> {
    let first_name = input.first_name.trim().to_owned();
    let last_name = input.last_name.trim().to_owned();
    let user_name = input.user_name.trim().to_owned();
    let email = input.email.trim().to_owned();

    let mut errors = ValidationErrors::default();
    if first_name.is_empty() {
        errors.add("firstName", "The FirstName field is required.");
    }
    if last_name.is_empty() {
        errors.add("lastName", "The LastName field is required.");
    }
    check_user_name(&mut errors, &user_name);
    if !is_valid_email(&email) {
        errors.add("email", "The Email field is not a valid e-mail address.");
    }
    if let Err(ServiceError::Validation(policy)) = validate_password_policy("password", &input.password)
        && let Some(messages) = policy.get("password")
    {
        for message in messages {
            errors.add("password", message.clone());
        }
    }

    if !user_name.is_empty() && user::find_by_user_name(conn, &user_name).await?.is_some() {
        errors.add("userName", user_name_taken_message(&user_name));
    }
    if !email.is_empty() && user::find_by_email(conn, &email).await?.is_some() {
        errors.add("email", format!("Email '{email}' is already taken."));
    }

    if !errors.is_empty() {
        tracing::debug!(%errors, "Registration rejected");
        return Err(ServiceError::rejected(REGISTRATION_FAILED, errors));
    }

    let new_user = NewUser {
        id: uuid::Uuid::now_v7(),
        user_name,
        email,
        password_hash: hash_password(&input.password)?,
        first_name,
        last_name,
    };

    let created = match user::insert(conn, &new_user).await {
        Ok(created) => created,
        // Lost a race with a concurrent registration.
        Err(e) if e.is_unique_violation() => {
            let mut errors = ValidationErrors::default();
            errors.add("userName", user_name_taken_message(&new_user.user_name));
            return Err(ServiceError::rejected(REGISTRATION_FAILED, errors));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %created.id, "User registered");

    send_confirmation(conn, settings, mailer, &created).await?;
    Ok(created)
}

/// ## Summary
/// Checks credentials and starts a session.
///
/// When confirmed email is required and missing, a fresh confirmation link is
/// sent and the login is refused.
///
/// ## Errors
/// Returns `InvalidCredentials` for an unknown user name, a wrong password or
/// an unconfirmed email.
#[tracing::instrument(skip(conn, settings, mailer, password))]
pub async fn login(
    conn: &mut DbConnection<'_>,
    settings: &Settings,
    mailer: &dyn Mailer,
    user_name: &str,
    password: &str,
) -> ServiceResult<StartedSession> {
    let Some(account) = user::find_by_user_name(conn, user_name.trim()).await? else {
        return Err(ServiceError::InvalidCredentials(UNKNOWN_USER_NAME.to_string()));
    };

    if !password_matches(password, &account.password_hash) {
        tracing::debug!(user_id = %account.id, "Wrong password");
        return Err(ServiceError::InvalidCredentials(WRONG_PASSWORD.to_string()));
    }

    if settings.auth.require_confirmed_email && !account.email_confirmed {
        send_confirmation(conn, settings, mailer, &account).await?;
        return Err(ServiceError::InvalidCredentials(EMAIL_NOT_CONFIRMED.to_string()));
    }

    let started = start_session(conn, account.id, &settings.auth).await?;
    tracing::info!(user_id = %account.id, "User logged in");
    Ok(started)
}

/// ## Summary
/// Ends the caller's current session.
///
/// ## Errors
/// Returns database errors if the delete fails.
#[tracing::instrument(skip(conn, caller), fields(user_id = %caller.id))]
pub async fn logout(conn: &mut DbConnection<'_>, caller: &AuthenticatedUser) -> ServiceResult<()> {
    crate::auth::session::end_session(conn, &caller.session_hash).await?;
    tracing::info!("User logged out");
    Ok(())
}

/// ## Summary
/// Redeems an email confirmation link.
///
/// Link problems are not errors: they become a failure page to redirect to.
///
/// ## Errors
/// Returns database errors only.
#[tracing::instrument(skip(conn, code))]
pub async fn confirm_email(
    conn: &mut DbConnection<'_>,
    user_id: Option<&str>,
    code: Option<&str>,
) -> ServiceResult<LinkOutcome> {
    const FAILED: &str = "Email Confirmation Failed";
    let failed = |description: &str| LinkOutcome::new(EMAIL_CONFIRMATION_PAGE, FAILED, description);

    let (Some(user_id), Some(code)) = (non_empty(user_id), non_empty(code)) else {
        return Ok(failed("UserId and Code are required in the query parameters"));
    };

    let Some(account) = find_link_user(conn, user_id).await? else {
        return Ok(failed(ACCOUNT_NOT_FOUND));
    };

    if account.email_confirmed {
        return Ok(failed("Your email has already been confirmed"));
    }

    let Some(issued) = find_token(conn, account.id, TokenPurpose::ConfirmEmail, code).await? else {
        return Ok(failed(
            "Sorry, we couldn't confirm your email. The link may have expired, please try again.",
        ));
    };

    let account_id = account.id;
    with_transaction(conn, move |tx| {
        async move {
            token::consume(tx, issued.id, Utc::now()).await?;
            user::confirm_email(tx, account_id).await?;
            Ok::<_, ServiceError>(())
        }
        .scope_boxed()
    })
    .await?;

    tracing::info!(user_id = %account_id, "Email confirmed");

    Ok(LinkOutcome::new(
        EMAIL_CONFIRMATION_PAGE,
        "Email Confirmed",
        "Your email has been confirmed successfully",
    ))
}

/// ## Summary
/// Emails a password reset link to the account with this address.
///
/// ## Errors
/// Returns `InvalidRequest` when no account uses the address.
#[tracing::instrument(skip(conn, settings, mailer, email))]
pub async fn forgot_password(
    conn: &mut DbConnection<'_>,
    settings: &Settings,
    mailer: &dyn Mailer,
    email: &str,
) -> ServiceResult<()> {
    let Some(account) = user::find_by_email(conn, email.trim()).await? else {
        return Err(ServiceError::InvalidRequest(UNKNOWN_EMAIL.to_string()));
    };

    let code = issue_token(conn, settings, account.id, TokenPurpose::ResetPassword, None).await?;
    let user_id = account.id.to_string();
    let link = api_link(
        settings,
        "reset-password",
        &[("userId", user_id.as_str()), ("code", code.as_str())],
    )?;
    mailer.send(password_reset_mail(&account.email, link)).await?;

    tracing::info!(user_id = %account.id, "Password reset link sent");
    Ok(())
}

/// ## Summary
/// Checks a password reset link without using it up, and picks the page the
/// browser should land on.
///
/// ## Errors
/// Returns database errors only.
#[tracing::instrument(skip(conn, settings, code))]
pub async fn validate_reset_link(
    conn: &mut DbConnection<'_>,
    settings: &Settings,
    user_id: Option<&str>,
    code: Option<&str>,
) -> ServiceResult<LinkOutcome> {
    const FAILED: &str = "Reset Password Failed";
    let failed = |description: &str| LinkOutcome::new(RESET_PASSWORD_PAGE, FAILED, description);

    let (Some(user_id), Some(code)) = (non_empty(user_id), non_empty(code)) else {
        return Ok(failed("UserId and Code are required in the query parameters"));
    };

    let Some(account) = find_link_user(conn, user_id).await? else {
        return Ok(failed(ACCOUNT_NOT_FOUND));
    };

    if find_token(conn, account.id, TokenPurpose::ResetPassword, code)
        .await?
        .is_none()
    {
        return Ok(failed(
            "Sorry, we couldn't reset your password. The link may have expired or has been used.",
        ));
    }

    let description = format!(
        "Please enter your new password. This link is valid for {} minutes.",
        settings.auth.token_ttl_minutes
    );

    Ok(
        LinkOutcome::new(RESET_PASSWORD_PAGE, "Reset Password", description)
            .with_param("userId", user_id)
            .with_param("code", code),
    )
}

/// ## Summary
/// Sets a new password using a reset code.
///
/// ## Side Effects
/// - Consumes the code, stores the new hash and ends every session of the
///   account, in one transaction
///
/// ## Errors
/// Returns an error if:
/// - the account does not exist
/// - the new password equals the current one or breaks the length policy
/// - the code is unknown, used or expired
#[tracing::instrument(skip(conn, input))]
pub async fn reset_password(
    conn: &mut DbConnection<'_>,
    input: ResetPasswordInput,
) -> ServiceResult<()> {
    let Some(account) = find_link_user(conn, &input.user_id).await? else {
        return Err(ServiceError::InvalidRequest(USER_NOT_FOUND.to_string()));
    };

    if password_matches(&input.password, &account.password_hash) {
        return Err(ServiceError::InvalidRequest(NEW_PASSWORD_REQUIRED.to_string()));
    }

    if let Err(ServiceError::Validation(errors)) = validate_password_policy("password", &input.password) {
        return Err(ServiceError::rejected(PASSWORD_RESET_FAILED, errors));
    }

    let Some(issued) =
        find_token(conn, account.id, TokenPurpose::ResetPassword, &input.code).await?
    else {
        let mut errors = ValidationErrors::default();
        errors.add("code", "Invalid token.");
        return Err(ServiceError::rejected(PASSWORD_RESET_FAILED, errors));
    };

    let password_hash = hash_password(&input.password)?;
    let account_id = account.id;

    with_transaction(conn, move |tx| {
        async move {
            // A concurrent redemption already used the code.
            if token::consume(tx, issued.id, Utc::now()).await? == 0 {
                return Err(ServiceError::InvalidToken);
            }
            user::set_password_hash(tx, account_id, &password_hash, Utc::now()).await?;
            session::delete_for_user(tx, account_id, None).await?;
            Ok::<_, ServiceError>(())
        }
        .scope_boxed()
    })
    .await?;

    tracing::info!(user_id = %account_id, "Password reset");
    Ok(())
}

/// ## Summary
/// Emails a link that moves the caller's account to `new_email`.
///
/// ## Errors
/// Returns an error if:
/// - `new_email` is malformed, equals the current address or is taken
/// - database or mail operations fail
#[tracing::instrument(skip(conn, settings, mailer, caller, new_email), fields(user_id = %caller.id))]
pub async fn request_email_change(
    conn: &mut DbConnection<'_>,
    settings: &Settings,
    mailer: &dyn Mailer,
    caller: &AuthenticatedUser,
    new_email: &str,
) -> ServiceResult<()> {
    let new_email = new_email.trim();
    if !is_valid_email(new_email) {
        return Err(ServiceError::invalid(
            "newEmail",
            "The NewEmail field is not a valid e-mail address.",
        ));
    }

    if caller.email.eq_ignore_ascii_case(new_email) {
        return Err(ServiceError::InvalidRequest(SAME_EMAIL.to_string()));
    }

    if user::find_by_email(conn, new_email).await?.is_some() {
        return Err(ServiceError::InvalidRequest(EMAIL_TAKEN.to_string()));
    }

    let code = issue_token(
        conn,
        settings,
        caller.id,
        TokenPurpose::ChangeEmail,
        Some(new_email.to_owned()),
    )
    .await?;
    let user_id = caller.id.to_string();
    let link = api_link(
        settings,
        "change-email",
        &[
            ("userId", user_id.as_str()),
            ("newEmail", new_email),
            ("code", code.as_str()),
        ],
    )?;
    mailer.send(confirmation_mail(new_email, link)).await?;

    tracing::info!("Email change link sent");
    Ok(())
}

/// ## Summary
/// Redeems an email change link.
///
/// Link problems are not errors: they become a failure page to redirect to.
///
/// ## Errors
/// Returns database errors only.
#[tracing::instrument(skip(conn, new_email, code))]
pub async fn change_email(
    conn: &mut DbConnection<'_>,
    user_id: Option<&str>,
    new_email: Option<&str>,
    code: Option<&str>,
) -> ServiceResult<LinkOutcome> {
    const FAILED: &str = "Change Email Failed";
    const RETRY: &str = "Sorry, we couldn't change your email. Please try again.";
    let failed = |description: &str| LinkOutcome::new(EMAIL_CONFIRMATION_PAGE, FAILED, description);

    let (Some(user_id), Some(new_email), Some(code)) =
        (non_empty(user_id), non_empty(new_email), non_empty(code))
    else {
        return Ok(failed(
            "UserId, NewEmail and Code are required in the query parameters",
        ));
    };

    let Some(account) = find_link_user(conn, user_id).await? else {
        return Ok(failed(ACCOUNT_NOT_FOUND));
    };

    let issued = find_token(conn, account.id, TokenPurpose::ChangeEmail, code)
        .await?
        .filter(|issued| issued.new_email.as_deref() == Some(new_email));
    let Some(issued) = issued else {
        return Ok(failed(
            "Sorry, we couldn't change your email. The link may have expired or has been used.",
        ));
    };

    if user::find_by_email(conn, new_email)
        .await?
        .is_some_and(|other| other.id != account.id)
    {
        return Ok(failed(RETRY));
    }

    let account_id = account.id;
    let email = new_email.to_owned();
    let applied = with_transaction(conn, move |tx| {
        async move {
            if token::consume(tx, issued.id, Utc::now()).await? == 0 {
                return Ok(false);
            }
            user::set_email(tx, account_id, &email, Utc::now()).await?;
            Ok::<_, ServiceError>(true)
        }
        .scope_boxed()
    })
    .await;

    match applied {
        Ok(true) => {
            tracing::info!(user_id = %account_id, "Email changed");
            Ok(LinkOutcome::new(
                EMAIL_CONFIRMATION_PAGE,
                "Email Changed",
                "Your email has been changed successfully",
            ))
        }
        Ok(false) => Ok(failed(RETRY)),
        Err(ServiceError::DatabaseError(e)) if e.is_unique_violation() => Ok(failed(RETRY)),
        Err(e) => Err(e),
    }
}
