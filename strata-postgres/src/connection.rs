use crate::{
    PostgresDriver, PostgresTransaction,
    util::{bind, stream_query_results},
};
use std::time::Duration;
use strata_core::{
    Connection, ConnectionConfig, Error, Executor, MapperError, QueryResult, Result, Statement,
    stream::Stream,
};
use tokio::spawn;
use tokio_postgres::NoTls;

pub struct PostgresConnection {
    pub(crate) client: tokio_postgres::Client,
}

impl Executor for PostgresConnection {
    type Driver = PostgresDriver;

    fn driver(&self) -> &Self::Driver {
        &PostgresDriver {}
    }

    fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        let context = format!("While running the statement:\n{}", statement);
        let (sql, params) = bind(statement);
        let client = &self.client;
        stream_query_results(async move { client.query_raw(&sql, params).await }, context)
    }
}

fn postgres_config(config: &ConnectionConfig) -> Result<tokio_postgres::Config> {
    let mut result = tokio_postgres::Config::new();
    result
        .host(&config.host)
        .port(config.port)
        .user(&config.user)
        .password(&config.password)
        .dbname(&config.database);
    for (key, value) in &config.options {
        match key.as_str() {
            "application_name" => {
                result.application_name(value);
            }
            "options" => {
                result.options(value);
            }
            "connect_timeout" => {
                let seconds = value.parse::<u64>().map_err(|_| {
                    let error = MapperError::Config(format!("Invalid connect_timeout `{}`", value));
                    log::error!("{:#}", error);
                    error
                })?;
                result.connect_timeout(Duration::from_secs(seconds));
            }
            "sslmode" if value == "disable" || value == "prefer" => {}
            "sslmode" => {
                let error = MapperError::Config(format!(
                    "sslmode `{}` is not supported, the connection is not encrypted",
                    value
                ));
                log::error!("{:#}", error);
                return Err(error.into());
            }
            _ => log::warn!("Ignoring the unsupported connection option `{}`", key),
        }
    }
    Ok(result)
}

impl Connection for PostgresConnection {
    type Transaction<'c> = PostgresTransaction<'c>;

    async fn connect(config: &ConnectionConfig) -> Result<PostgresConnection> {
        let context = || {
            format!(
                "While trying to connect to `{}:{}/{}` as `{}`",
                config.host, config.port, config.database, config.user
            )
        };
        let (client, connection) = postgres_config(config)?
            .connect(NoTls)
            .await
            .map_err(|e| {
                let error = Error::new(MapperError::Connection(e.to_string())).context(context());
                log::error!("{:#}", error);
                error
            })?;
        spawn(async move {
            if let Err(e) = connection.await
                && !e.is_closed()
            {
                log::error!("Postgres connection error: {:#}", e);
            }
        });
        Ok(Self { client })
    }

    async fn begin(&mut self) -> Result<PostgresTransaction<'_>> {
        PostgresTransaction::new(self).await
    }
}
