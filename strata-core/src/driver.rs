use crate::{Connection, ConnectionConfig, Result, SqlWriter, Value};
use std::{fmt::Debug, future::Future};

/// Entry point of a backend: dialect and connection lifecycle.
pub trait Driver: Debug + Clone + Send + Sync + 'static {
    type Connection: Connection<Driver = Self>;
    type SqlWriter: SqlWriter;

    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;

    /// Quotes an identifier for this dialect, `*` is returned unchanged.
    fn quote_identifier(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 2);
        self.sql_writer().write_identifier_qualified(&mut out, name);
        out
    }

    /// Inline literal for `value`: numbers unquoted, strings quoted and escaped.
    fn quote_literal(&self, value: &Value) -> String {
        let mut out = String::new();
        self.sql_writer().write_value(&mut out, value);
        out
    }

    /// Opens a connection, failures are reported as [`crate::MapperError::Connection`].
    fn connect(&self, config: &ConnectionConfig) -> impl Future<Output = Result<Self::Connection>> {
        Self::Connection::connect(config)
    }
}

#[cfg(test)]
pub(crate) use generic::*;

#[cfg(test)]
mod generic {
    use crate::{
        Connection, ConnectionConfig, Driver, Executor, GenericSqlWriter, MapperError,
        QueryResult, Result, Statement, Transaction, stream,
    };

    /// Standard SQL driver without any backend, only useful to compile statements.
    #[derive(Debug, Clone, Copy, Default)]
    pub(crate) struct GenericDriver;

    impl GenericDriver {
        pub(crate) const fn new() -> Self {
            Self
        }
    }

    impl Driver for GenericDriver {
        type Connection = GenericConnection;
        type SqlWriter = GenericSqlWriter;
        const NAME: &'static str = "generic";
        fn sql_writer(&self) -> GenericSqlWriter {
            GenericSqlWriter::new()
        }
    }

    pub(crate) struct GenericConnection;

    impl Executor for GenericConnection {
        type Driver = GenericDriver;
        fn driver(&self) -> &GenericDriver {
            &GenericDriver
        }
        fn run(
            &mut self,
            _statement: Statement,
        ) -> impl stream::Stream<Item = Result<QueryResult>> + Send {
            stream::empty()
        }
    }

    impl Connection for GenericConnection {
        type Transaction<'c> = GenericConnection;
        async fn connect(_config: &ConnectionConfig) -> Result<Self> {
            Err(MapperError::Connection("The generic driver has no backend".into()).into())
        }
        async fn begin(&mut self) -> Result<GenericConnection> {
            Ok(GenericConnection)
        }
    }

    impl Transaction<'_> for GenericConnection {
        async fn commit(self) -> Result<()> {
            Ok(())
        }
        async fn rollback(self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn quoting() {
        let driver = GenericDriver::new();
        assert_eq!(driver.quote_identifier("*"), "*");
        assert_eq!(driver.quote_identifier("users"), r#""users""#);
        assert_eq!(driver.quote_literal(&42.into()), "42");
        assert_eq!(driver.quote_literal(&"a'b".into()), "'a''b'");
        assert_eq!(driver.quote_literal(&r#"a"b"#.into()), r#"'a"b'"#);
    }

    #[tokio::test]
    async fn connect_fails_loudly() {
        let config = ConnectionConfig::from_map([
            ("host", "localhost"),
            ("port", "5432"),
            ("user", "u"),
            ("password", "p"),
            ("database", "d"),
        ])
        .unwrap();
        let error = GenericDriver::new().connect(&config).await.err().unwrap();
        assert!(matches!(
            MapperError::of(&error),
            Some(MapperError::Connection(..))
        ));
    }
}
