use crate::{
    PostgresConnection, PostgresDriver,
    util::{bind, stream_query_results},
};
use std::future::Future;
use strata_core::{
    Executor, QueryResult, Result, Statement, Transaction, future::TryFutureExt, stream::Stream,
};

pub struct PostgresTransaction<'c>(pub(crate) tokio_postgres::Transaction<'c>);

impl<'c> PostgresTransaction<'c> {
    pub async fn new(connection: &'c mut PostgresConnection) -> Result<Self> {
        Ok(Self(connection.client.transaction().await?))
    }
}

impl<'c> Executor for PostgresTransaction<'c> {
    type Driver = PostgresDriver;

    fn driver(&self) -> &Self::Driver {
        &PostgresDriver {}
    }

    fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        let context = format!("While running the statement:\n{}", statement);
        let (sql, params) = bind(statement);
        let transaction = &self.0;
        stream_query_results(
            async move { transaction.query_raw(&sql, params).await },
            context,
        )
    }
}

impl<'c> Transaction<'c> for PostgresTransaction<'c> {
    fn commit(self) -> impl Future<Output = Result<()>> + Send {
        self.0.commit().map_err(Into::into)
    }

    fn rollback(self) -> impl Future<Output = Result<()>> + Send {
        self.0.rollback().map_err(Into::into)
    }
}
