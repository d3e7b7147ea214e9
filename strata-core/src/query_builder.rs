use crate::{
    Driver, Executor, MapperError, Result, Row, RowsAffected, SqlWriter, Statement, Value,
    stream::TryStreamExt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Filter on a column, all the predicates of a query are AND combined.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value`, or `column IS NULL` when the value is null.
    Equal(String, Value),
    /// `column IN (values...)`, always false when empty.
    In(String, Vec<Value>),
}

/// Clauses accumulated by a [`QueryBuilder`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryParts {
    pub table: String,
    pub alias: Option<String>,
    pub columns: Vec<String>,
    pub predicates: Vec<Predicate>,
    pub order: Vec<(String, Order)>,
    pub limit: Option<u64>,
}

/// Fluent statement construction over a [`Driver`].
///
/// The builder only accumulates clauses, compiling them produces a [`Statement`] where every
/// value is bound through a placeholder. The execution methods take the executor to run on, the
/// builder itself never holds a connection.
///
/// ```rust,ignore
/// let rows = QueryBuilder::new(PostgresDriver::new())
///     .table("users", Some("u"))
///     .where_eq("u.active", true)
///     .get(&mut connection)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder<D: Driver> {
    driver: D,
    parts: QueryParts,
}

impl<D: Driver> QueryBuilder<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            parts: Default::default(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn parts(&self) -> &QueryParts {
        &self.parts
    }

    /// Fresh builder on the same driver, none of the accumulated clauses are kept.
    pub fn new_query(&self) -> Self {
        Self::new(self.driver.clone())
    }

    pub fn table(mut self, name: impl Into<String>, alias: Option<&str>) -> Self {
        self.parts.table = name.into();
        self.parts.alias = alias.map(Into::into);
        self
    }

    /// Equality predicate, repeated calls are AND combined.
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parts
            .predicates
            .push(Predicate::Equal(column.into(), value.into()));
        self
    }

    pub fn where_in<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.parts.predicates.push(Predicate::In(
            column.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Columns to select, `*` when never called.
    pub fn select<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.parts.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.parts.order.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.parts.limit = Some(limit);
        self
    }

    fn check_table(&self) -> Result<()> {
        if self.parts.table.is_empty() {
            let error = MapperError::MissingTable;
            log::error!("{:#}", error);
            return Err(error.into());
        }
        Ok(())
    }

    fn check_predicates(&self, operation: &'static str) -> Result<()> {
        if self.parts.predicates.is_empty() {
            let error = MapperError::NoPredicate(operation);
            log::error!("{:#} on `{}`", error, self.parts.table);
            return Err(error.into());
        }
        Ok(())
    }

    fn compile(&self, write: impl FnOnce(&D::SqlWriter, &mut String, &mut Vec<Value>)) -> Statement {
        let mut sql = String::with_capacity(128);
        let mut params = Vec::new();
        write(&self.driver.sql_writer(), &mut sql, &mut params);
        Statement { sql, params }
    }

    pub fn compile_select(&self) -> Result<Statement> {
        self.check_table()?;
        Ok(self.compile(|writer, out, params| writer.write_select(out, params, &self.parts)))
    }

    pub fn compile_insert(&self, rows: &[Row]) -> Result<Statement> {
        self.check_table()?;
        if rows.is_empty() {
            let error = MapperError::EmptyBatch;
            log::error!("{:#} into `{}`", error, self.parts.table);
            return Err(error.into());
        }
        if rows.len() > 1 && rows.iter().all(Row::is_empty) {
            let error = MapperError::ColumnlessBatch(rows.len());
            log::error!("{:#} into `{}`", error, self.parts.table);
            return Err(error.into());
        }
        Ok(self.compile(|writer, out, params| {
            writer.write_insert(out, params, &self.parts.table, rows)
        }))
    }

    pub fn compile_update(&self, changes: &Row) -> Result<Statement> {
        self.check_table()?;
        self.check_predicates("UPDATE")?;
        Ok(self.compile(|writer, out, params| {
            writer.write_update(out, params, &self.parts, changes)
        }))
    }

    pub fn compile_delete(&self) -> Result<Statement> {
        self.check_table()?;
        self.check_predicates("DELETE")?;
        Ok(self.compile(|writer, out, params| writer.write_delete(out, params, &self.parts)))
    }

    /// Runs the select and returns all the rows.
    pub async fn get<Exec: Executor<Driver = D>>(&self, executor: &mut Exec) -> Result<Vec<Row>> {
        let statement = self.compile_select()?;
        log::debug!("{}", statement);
        executor
            .fetch(statement)
            .map_ok(Row::from)
            .try_collect()
            .await
    }

    /// Runs the select limited to one row, `None` when nothing matches.
    pub async fn first<Exec: Executor<Driver = D>>(
        &self,
        executor: &mut Exec,
    ) -> Result<Option<Row>> {
        let mut rows = self.clone().limit(1).get(executor).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    pub async fn insert<Exec: Executor<Driver = D>>(
        &self,
        executor: &mut Exec,
        rows: &[Row],
    ) -> Result<RowsAffected> {
        let statement = self.compile_insert(rows)?;
        log::debug!("{}", statement);
        executor.execute(statement).await
    }

    /// Updates the rows matching the predicates, an empty `changes` issues no statement.
    pub async fn update<Exec: Executor<Driver = D>>(
        &self,
        executor: &mut Exec,
        changes: &Row,
    ) -> Result<RowsAffected> {
        self.check_predicates("UPDATE")?;
        if changes.is_empty() {
            log::debug!("Nothing to update on `{}`", self.parts.table);
            return Ok(RowsAffected::default());
        }
        let statement = self.compile_update(changes)?;
        log::debug!("{}", statement);
        executor.execute(statement).await
    }

    pub async fn delete<Exec: Executor<Driver = D>>(
        &self,
        executor: &mut Exec,
    ) -> Result<RowsAffected> {
        let statement = self.compile_delete()?;
        log::debug!("{}", statement);
        executor.execute(statement).await
    }
}
