//! Emailed links and the frontend pages they end on.

use url::Url;

use rolodex_core::config::Settings;
use rolodex_core::constants::AUTH_ROUTE_PREFIX;

use crate::error::{ServiceError, ServiceResult};
use crate::mail::MailMessage;

pub const EMAIL_CONFIRMATION_PAGE: &str = "email-confirmation";
pub const RESET_PASSWORD_PAGE: &str = "reset-password";

fn parse(base: &str) -> ServiceResult<Url> {
    Url::parse(base).map_err(|e| ServiceError::InvalidConfiguration(format!("Invalid URL {base}: {e}")))
}

/// ## Summary
/// Builds an absolute link to an auth endpoint of this server.
///
/// ## Errors
/// Returns `InvalidConfiguration` if the configured origin is not a URL.
pub fn api_link(settings: &Settings, endpoint: &str, params: &[(&str, &str)]) -> ServiceResult<String> {
    let mut url = parse(&settings.server.origin())?;
    url.set_path(&format!("{AUTH_ROUTE_PREFIX}/{endpoint}"));
    url.query_pairs_mut().extend_pairs(params);
    Ok(url.into())
}

/// A frontend page that reports the outcome of an emailed link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub page: &'static str,
    pub title: &'static str,
    pub description: String,
    /// Extra query parameters, such as the reset code the page needs.
    pub params: Vec<(&'static str, String)>,
}

impl LinkOutcome {
    #[must_use]
    pub fn new(page: &'static str, title: &'static str, description: impl Into<String>) -> Self {
        Self {
            page,
            title,
            description: description.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    /// ## Summary
    /// Renders the redirect target under the configured frontend.
    ///
    /// ## Errors
    /// Returns `InvalidConfiguration` if the frontend URL is not a URL.
    pub fn redirect_url(&self, settings: &Settings) -> ServiceResult<String> {
        let mut url = parse(&format!("{}/{}", settings.frontend.base_url(), self.page))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("title", self.title);
            query.append_pair("description", &self.description);
            for (name, value) in &self.params {
                query.append_pair(name, value);
            }
        }
        Ok(url.into())
    }
}

#[must_use]
pub fn confirmation_mail(to: &str, link: String) -> MailMessage {
    MailMessage {
        to: to.to_owned(),
        subject: "Confirm your email".to_string(),
        body: format!("Please confirm your account by following this link: {link}"),
        link,
    }
}

#[must_use]
pub fn password_reset_mail(to: &str, link: String) -> MailMessage {
    MailMessage {
        to: to.to_owned(),
        subject: "Reset your password".to_string(),
        body: format!("Please reset your password by following this link: {link}"),
        link,
    }
}
