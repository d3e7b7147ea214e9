use crate::{Connection, Executor, Result};
use std::future::Future;

pub trait Transaction<'c>: Executor {
    fn commit(self) -> impl Future<Output = Result<()>> + Send;
    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}

/// Runs `scope` inside a transaction on `connection`.
///
/// Commits when the scope returns `Ok`, otherwise rolls back and returns the scope error.
/// A rollback failure is logged, the original error is the one reported.
pub async fn transaction<'c, C, T, F>(connection: &'c mut C, scope: F) -> Result<T>
where
    C: Connection,
    F: AsyncFnOnce(&mut C::Transaction<'c>) -> Result<T>,
{
    let mut transaction = connection.begin().await?;
    let result = scope(&mut transaction).await;
    match result {
        Ok(value) => {
            transaction.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback) = transaction.rollback().await {
                log::error!("Could not rollback the transaction: {:#}", rollback);
            }
            Err(error)
        }
    }
}
