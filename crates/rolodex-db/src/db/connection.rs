use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use rolodex_core::config::DatabaseConfig;

use crate::db::DbProvider;
use crate::error::{DbError, DbResult};

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConnection<'pool> = PooledConnection<'pool, AsyncPgConnection>;

/// How long a request waits for a free connection before it is answered
/// with 503.
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// ## Summary
/// Builds the connection pool described by the `database` settings.
///
/// ## Errors
/// Returns an error if the URL is malformed or the first connection fails.
#[tracing::instrument(skip(config), fields(max_connections = config.max_connections))]
pub async fn create_pool(config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.url);
    let max_size = u32::from(config.max_connections.max(1));

    let pool = Pool::builder()
        .max_size(max_size)
        .min_idle(Some(1))
        .connection_timeout(CHECKOUT_TIMEOUT)
        .test_on_check_out(true)
        .build(manager)
        .await?;

    tracing::info!(max_size, "Database pool ready");
    Ok(pool)
}

impl DbProvider for DbPool {
    fn get_connection<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = DbResult<DbConnection<'a>>> + Send + 'a>> {
        Box::pin(async move {
            self.get().await.map_err(|e| {
                let state = self.state();
                tracing::warn!(
                    error = %e,
                    connections = state.connections,
                    idle = state.idle_connections,
                    "No database connection available"
                );
                DbError::from(e)
            })
        })
    }
}
