use std::sync::Arc;

use salvo::async_trait;

use crate::error::AppResult;
use rolodex_core::error::CoreError;
use rolodex_db::db::DbProvider;

/// Shares one database provider with every request.
pub struct DbProviderHandler {
    provider: Arc<dyn DbProvider>,
}

impl DbProviderHandler {
    #[must_use]
    pub fn new(provider: impl DbProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

#[async_trait]
impl salvo::Handler for DbProviderHandler {
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.provider));
    }
}

/// ## Summary
/// Retrieves the database provider from the depot.
///
/// ## Errors
/// Returns an error if no provider was injected.
pub fn get_db_from_depot(depot: &salvo::Depot) -> AppResult<Arc<dyn DbProvider>> {
    depot
        .obtain::<Arc<dyn DbProvider>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Database provider not found in depot").into())
}
