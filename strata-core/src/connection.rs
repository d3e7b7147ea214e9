use crate::{ConnectionConfig, Executor, Result, Transaction};
use std::future::Future;

pub trait Connection: Executor + Sized {
    type Transaction<'c>: Transaction<'c, Driver = Self::Driver>
    where
        Self: 'c;

    /// Establishes a connection, a failure is returned to the caller and never retried.
    fn connect(config: &ConnectionConfig) -> impl Future<Output = Result<Self>> + Send;

    /// Starts a transaction, it is rolled back when dropped without commit.
    fn begin(&mut self) -> impl Future<Output = Result<Self::Transaction<'_>>> + Send;

    fn disconnect(self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}
