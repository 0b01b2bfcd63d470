//! Depot access to the outgoing mailer.

use std::sync::Arc;

use salvo::async_trait;

use rolodex_core::error::CoreError;
use rolodex_service::mail::Mailer;

use crate::error::AppResult;

/// Injects the shared mailer into every request.
pub struct MailerHandler {
    pub mailer: Arc<dyn Mailer>,
}

#[async_trait]
impl salvo::Handler for MailerHandler {
    #[tracing::instrument(skip_all)]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.mailer));
    }
}

/// ## Summary
/// Retrieves the mailer from the depot.
///
/// ## Errors
/// Returns an error if no mailer was injected.
pub fn get_mailer_from_depot(depot: &salvo::Depot) -> AppResult<Arc<dyn Mailer>> {
    depot
        .obtain::<Arc<dyn Mailer>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Mailer not found in depot").into())
}
