use crate::value_holder::ValueHolder;
use async_stream::try_stream;
use std::{future::Future, pin::pin, sync::Arc};
use strata_core::{
    Error, QueryResult, Result, RowLabeled, RowNames, RowsAffected, Statement, Value,
    stream::{Stream, StreamExt, TryStreamExt},
};
use tokio_postgres::RowStream;

pub(crate) fn row_to_values(row: &tokio_postgres::Row) -> Result<Box<[Value]>> {
    (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(e) => {
                let column = &row.columns()[i];
                Err(Error::new(e).context(format!(
                    "Could not decode the column {} `{}` of type {}",
                    i,
                    column.name(),
                    column.type_()
                )))
            }
        })
        .collect()
}

/// Parameters of `statement` in the form expected by `query_raw`.
pub(crate) fn bind(statement: Statement) -> (String, Vec<ValueHolder>) {
    let params = statement.params.into_iter().map(ValueHolder).collect();
    (statement.sql, params)
}

/// Rows of the query as they arrive, followed by the affected count when the server sends one.
pub(crate) fn stream_query_results(
    rows: impl Future<Output = std::result::Result<RowStream, tokio_postgres::Error>>,
    context: String,
) -> impl Stream<Item = Result<QueryResult>> {
    let context = Arc::new(context);
    try_stream! {
        let rows = rows.await?;
        let mut rows = pin!(rows);
        let mut labels: Option<RowNames> = None;
        while let Some(row) = rows.next().await.transpose()? {
            let labels = labels.get_or_insert_with(|| {
                row.columns().iter().map(|c| c.name().to_string()).collect()
            });
            yield QueryResult::Row(RowLabeled::new(labels.clone(), row_to_values(&row)?));
        }
        if let Some(rows_affected) = rows.rows_affected() {
            yield QueryResult::Affected(RowsAffected { rows_affected });
        }
    }
    .map_err(move |e: Error| {
        let e = e.context(context.clone());
        log::error!("{:#}", e);
        e
    })
}
