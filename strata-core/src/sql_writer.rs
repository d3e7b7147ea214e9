use crate::{Order, Predicate, QueryParts, Row, Value, separated_by};
use std::fmt::Write;

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}

/// Dialect specific SQL generation.
///
/// Every method has a default implementation following standard SQL, drivers override only
/// what their dialect does differently. Statement writers never inline values: they push them
/// into `params` and emit a placeholder instead.
pub trait SqlWriter: Send + Sync {
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quotes a single identifier, the wildcard `*` is written unchanged.
    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        if value == "*" {
            out.push('*');
            return;
        }
        out.push('"');
        self.write_escaped(out, value, '"', r#""""#);
        out.push('"');
    }

    /// Quotes a possibly qualified name (`alias.column`) segment by segment.
    fn write_identifier_qualified(&self, out: &mut String, value: &str) {
        separated_by(
            out,
            value.split('.'),
            |out, v| self.write_identifier_quoted(out, v),
            ".",
        );
    }

    fn write_table_ref(&self, out: &mut String, table: &str, alias: Option<&str>) {
        self.write_identifier_qualified(out, table);
        if let Some(alias) = alias {
            out.push_str(" AS ");
            self.write_identifier_quoted(out, alias);
        }
    }

    /// Placeholder for the parameter at `index` (from 1).
    fn write_placeholder(&self, out: &mut String, _index: usize) {
        out.push('?');
    }

    /// Appends `value` to the parameters and writes its placeholder.
    fn write_bound(&self, out: &mut String, params: &mut Vec<Value>, value: &Value) {
        params.push(value.clone());
        self.write_placeholder(out, params.len());
    }

    /// Writes `value` as an inline literal, used only where no placeholder can appear.
    fn write_value(&self, out: &mut String, value: &Value) {
        match value {
            Value::Null => self.write_value_none(out),
            Value::Boolean(v) => self.write_value_bool(out, *v),
            Value::Int64(v) => write_integer!(out, *v),
            Value::Varchar(v) => self.write_value_string(out, v),
            Value::Blob(v) => self.write_value_blob(out, v),
        }
    }

    fn write_value_none(&self, out: &mut String) {
        out.push_str("NULL");
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize]);
    }

    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        out.push_str(&hex::encode_upper(value));
        out.push('\'');
    }

    fn write_predicate(&self, out: &mut String, params: &mut Vec<Value>, predicate: &Predicate) {
        match predicate {
            Predicate::Equal(column, Value::Null) => {
                self.write_identifier_qualified(out, column);
                out.push_str(" IS NULL");
            }
            Predicate::Equal(column, value) => {
                self.write_identifier_qualified(out, column);
                out.push_str(" = ");
                self.write_bound(out, params, value);
            }
            Predicate::In(_, values) if values.is_empty() => {
                out.push_str("FALSE");
            }
            Predicate::In(column, values) => {
                self.write_identifier_qualified(out, column);
                out.push_str(" IN (");
                separated_by(
                    out,
                    values,
                    |out, v| self.write_bound(out, params, v),
                    ", ",
                );
                out.push(')');
            }
        }
    }

    fn write_where(&self, out: &mut String, params: &mut Vec<Value>, predicates: &[Predicate]) {
        if predicates.is_empty() {
            return;
        }
        out.push_str("\nWHERE ");
        separated_by(
            out,
            predicates,
            |out, v| self.write_predicate(out, params, v),
            " AND ",
        );
    }

    fn write_select(&self, out: &mut String, params: &mut Vec<Value>, parts: &QueryParts) {
        out.push_str("SELECT ");
        if parts.columns.is_empty() {
            out.push('*');
        } else {
            separated_by(
                out,
                &parts.columns,
                |out, v| self.write_identifier_qualified(out, v),
                ", ",
            );
        }
        out.push_str("\nFROM ");
        self.write_table_ref(out, &parts.table, parts.alias.as_deref());
        self.write_where(out, params, &parts.predicates);
        if !parts.order.is_empty() {
            out.push_str("\nORDER BY ");
            separated_by(
                out,
                &parts.order,
                |out, (column, order)| {
                    self.write_identifier_qualified(out, column);
                    out.push_str(match order {
                        Order::Asc => " ASC",
                        Order::Desc => " DESC",
                    });
                },
                ", ",
            );
        }
        if let Some(limit) = parts.limit {
            let _ = write!(out, "\nLIMIT {}", limit);
        }
    }

    /// Multi row insert, the column list is the union of the columns of all the rows in
    /// first seen order. Rows lacking a column get `DEFAULT` for it. Without any column the
    /// statement is `DEFAULT VALUES` and inserts a single row.
    fn write_insert(&self, out: &mut String, params: &mut Vec<Value>, table: &str, rows: &[Row]) {
        let mut columns: Vec<&str> = Vec::new();
        for column in rows.iter().flat_map(Row::columns) {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        out.push_str("INSERT INTO ");
        self.write_table_ref(out, table, None);
        if columns.is_empty() {
            out.push_str(" DEFAULT VALUES");
            return;
        }
        out.push_str(" (");
        separated_by(
            out,
            &columns,
            |out, v| self.write_identifier_quoted(out, v),
            ", ",
        );
        out.push_str(") VALUES\n");
        separated_by(
            out,
            rows,
            |out, row| {
                out.push('(');
                separated_by(
                    out,
                    &columns,
                    |out, column| match row.get(column) {
                        Some(value) => self.write_bound(out, params, value),
                        None => out.push_str("DEFAULT"),
                    },
                    ", ",
                );
                out.push(')');
            },
            ",\n",
        );
    }

    fn write_update(
        &self,
        out: &mut String,
        params: &mut Vec<Value>,
        parts: &QueryParts,
        changes: &Row,
    ) {
        out.push_str("UPDATE ");
        self.write_table_ref(out, &parts.table, parts.alias.as_deref());
        out.push_str(" SET ");
        separated_by(
            out,
            changes.iter(),
            |out, (column, value)| {
                self.write_identifier_quoted(out, column);
                out.push_str(" = ");
                self.write_bound(out, params, value);
            },
            ", ",
        );
        self.write_where(out, params, &parts.predicates);
    }

    fn write_delete(&self, out: &mut String, params: &mut Vec<Value>, parts: &QueryParts) {
        out.push_str("DELETE FROM ");
        self.write_table_ref(out, &parts.table, parts.alias.as_deref());
        self.write_where(out, params, &parts.predicates);
    }
}

#[derive(Default, Clone, Copy)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub const fn new() -> Self {
        Self
    }
}

impl SqlWriter for GenericSqlWriter {}
