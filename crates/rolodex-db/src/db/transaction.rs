//! Transaction helper for multi-statement writes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use diesel_async::scoped_futures::ScopedFutureExt;
//! use rolodex_db::db::transaction::with_transaction;
//!
//! with_transaction(&mut conn, |conn| async move {
//!     contact::delete_tags_for(conn, &ids).await?;
//!     contact::insert_tags(conn, &rows).await?;
//!     Ok(())
//! }.scope_boxed()).await?;
//! ```

use diesel_async::{AsyncConnection, scoped_futures::ScopedBoxFuture};

use crate::db::connection::DbConnection;

/// ## Summary
/// Runs a database transaction and returns the closure result.
///
/// The error type only needs to be constructible from a diesel error, so the
/// service layer can roll back with its own domain errors.
///
/// ## Errors
/// Returns any error produced by the closure, or errors raised while starting
/// or committing the transaction.
pub async fn with_transaction<'a, 'conn, T, E, F>(
    conn: &'a mut DbConnection<'conn>,
    callback: F,
) -> Result<T, E>
where
    F: for<'r> FnOnce(&'r mut DbConnection<'conn>) -> ScopedBoxFuture<'a, 'r, Result<T, E>>
        + Send
        + 'a,
    T: Send + 'a,
    E: From<diesel::result::Error> + Send + 'a,
{
    conn.transaction::<T, E, F>(callback).await
}
