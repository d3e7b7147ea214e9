use std::collections::VecDeque;
use strata::{
    Connection, ConnectionConfig, Driver, Error, Executor, GenericSqlWriter, QueryResult, Result,
    Row, RowLabeled, RowNames, RowsAffected, Statement, Transaction, stream,
};

/// Driver of the [`StubConnection`], generic SQL with `?` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubDriver {}

impl StubDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

impl Driver for StubDriver {
    type Connection = StubConnection;
    type SqlWriter = GenericSqlWriter;

    const NAME: &'static str = "stub";

    fn sql_writer(&self) -> GenericSqlWriter {
        GenericSqlWriter::new()
    }
}

/// Scripted outcome of the next statement.
#[derive(Debug, Clone)]
pub enum Response {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(String),
}

/// In memory connection recording every statement it receives.
///
/// Statements get the scripted [`Response`]s in order, once the script is exhausted a
/// `SELECT` returns no rows and anything else affects one row. Statements run inside a
/// transaction reach [`StubConnection::committed`] only when the transaction commits.
#[derive(Debug, Default)]
pub struct StubConnection {
    responses: VecDeque<Response>,
    statements: Vec<Statement>,
    committed: Vec<Statement>,
    commits: usize,
    rollbacks: usize,
}

impl StubConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&mut self, response: Response) -> &mut Self {
        self.responses.push_back(response);
        self
    }

    pub fn respond_rows(&mut self, rows: impl IntoIterator<Item = Row>) -> &mut Self {
        self.respond(Response::Rows(rows.into_iter().collect()))
    }

    /// Every statement received, committed or not.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn last_statement(&self) -> Option<&Statement> {
        self.statements.last()
    }

    /// Statements whose effects are visible: run outside any transaction or committed.
    pub fn committed(&self) -> &[Statement] {
        &self.committed
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn respond_to(&mut self, statement: &Statement) -> Vec<Result<QueryResult>> {
        log::debug!("{}", statement);
        self.statements.push(statement.clone());
        let response = self.responses.pop_front().unwrap_or_else(|| {
            if statement.sql.trim_start().starts_with("SELECT") {
                Response::Rows(Vec::new())
            } else {
                Response::Affected(1)
            }
        });
        match response {
            Response::Rows(rows) => rows
                .into_iter()
                .map(|row| {
                    let labels: RowNames = row.columns().map(ToString::to_string).collect();
                    let values = row.values().cloned().collect();
                    Ok(RowLabeled::new(labels, values).into())
                })
                .collect(),
            Response::Affected(rows_affected) => vec![Ok(RowsAffected { rows_affected }.into())],
            Response::Fail(message) => vec![Err(Error::msg(message))],
        }
    }
}

impl Executor for StubConnection {
    type Driver = StubDriver;

    fn driver(&self) -> &StubDriver {
        &StubDriver {}
    }

    fn run(&mut self, statement: Statement) -> impl stream::Stream<Item = Result<QueryResult>> + Send {
        let results = self.respond_to(&statement);
        if results.iter().all(Result::is_ok) {
            self.committed.push(statement);
        }
        stream::iter(results)
    }
}

impl Connection for StubConnection {
    type Transaction<'c> = StubTransaction<'c>;

    async fn connect(_config: &ConnectionConfig) -> Result<StubConnection> {
        Ok(StubConnection::new())
    }

    async fn begin(&mut self) -> Result<StubTransaction<'_>> {
        Ok(StubTransaction {
            connection: self,
            pending: Vec::new(),
        })
    }
}

pub struct StubTransaction<'c> {
    connection: &'c mut StubConnection,
    pending: Vec<Statement>,
}

impl Executor for StubTransaction<'_> {
    type Driver = StubDriver;

    fn driver(&self) -> &StubDriver {
        &StubDriver {}
    }

    fn run(&mut self, statement: Statement) -> impl stream::Stream<Item = Result<QueryResult>> + Send {
        let results = self.connection.respond_to(&statement);
        self.pending.push(statement);
        stream::iter(results)
    }
}

impl<'c> Transaction<'c> for StubTransaction<'c> {
    async fn commit(self) -> Result<()> {
        self.connection.commits += 1;
        self.connection.committed.extend(self.pending);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.connection.rollbacks += 1;
        Ok(())
    }
}
