//! Read terminals: run the compiled select and shape the rows.
//!
//! Each call compiles the builder, sends exactly one statement through the
//! connection and, for row-returning reads, passes the rows through the
//! processor.

use tracing::debug;

use super::bindings::BindingType;
use super::clause::{Aggregate, Component};
use super::error::QueryResult;
use super::expr::{self, Column};
use super::grammar::helpers;
use super::query::Builder;
use super::value::{Row, Value};

impl Builder {
    /// Run the select and return every row.
    pub async fn get(&self) -> QueryResult<Vec<Row>> {
        let statement = self.to_statement()?;
        debug!(sql = %statement.sql, bindings = statement.bindings.len(), "select");
        let rows = self
            .connection()
            .select(&statement.sql, statement.bindings)
            .await?;
        Ok(self.processor().process_select(self, rows))
    }

    /// Run the select with `columns` unless columns were already chosen.
    pub async fn get_columns<I, C>(&self, columns: I) -> QueryResult<Vec<Row>>
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        if self.columns.is_some() {
            return self.get().await;
        }
        self.clone().select(columns).get().await
    }

    /// The first row, if any.
    pub async fn first(&self) -> QueryResult<Option<Row>> {
        let rows = self.clone().limit(1).get().await?;
        Ok(rows.into_iter().next())
    }

    /// The row whose `id` equals `id`.
    pub async fn find(&self, id: impl Into<Value>) -> QueryResult<Option<Row>> {
        self.clone().where_eq("id", id).first().await
    }

    /// A single column of the first row.
    pub async fn value(&self, column: impl Into<Column>) -> QueryResult<Option<Value>> {
        let row = self.clone().select([column]).first().await?;
        Ok(row.and_then(|row| row.into_values().next()))
    }

    /// One column from every row. Missing keys come back as null.
    pub async fn pluck(&self, column: &str) -> QueryResult<Vec<Value>> {
        let key = pluck_key(column);
        let rows = self.clone().select([column]).get().await?;
        Ok(rows
            .into_iter()
            .map(|mut row| row.shift_remove(key).unwrap_or(Value::Null))
            .collect())
    }

    /// Whether the select matches any row.
    pub async fn exists(&self) -> QueryResult<bool> {
        let grammar = self.grammar();
        let sql = grammar.compile_exists(self)?;
        let bindings = grammar.prepare_bindings(
            self.bindings
                .flatten_in(grammar.select_binding_order(self)),
        );
        debug!(sql = %sql, bindings = bindings.len(), "exists");
        let rows = self.connection().select(&sql, bindings).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("exists"))
            .and_then(|flag| flag.as_bool().or_else(|| flag.as_i64().map(|n| n != 0)))
            .unwrap_or(false))
    }

    pub async fn doesnt_exist(&self) -> QueryResult<bool> {
        Ok(!self.exists().await?)
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// `count(*)`.
    pub async fn count(&self) -> QueryResult<i64> {
        let value = self.aggregate("count", ["*"]).await?;
        Ok(value.as_i64().unwrap_or(0))
    }

    pub async fn min(&self, column: impl Into<Column>) -> QueryResult<Value> {
        self.aggregate("min", [column]).await
    }

    pub async fn max(&self, column: impl Into<Column>) -> QueryResult<Value> {
        self.aggregate("max", [column]).await
    }

    /// Sum of a column; zero when no rows match.
    pub async fn sum(&self, column: impl Into<Column>) -> QueryResult<Value> {
        let value = self.aggregate("sum", [column]).await?;
        Ok(if value.is_null() { Value::Int(0) } else { value })
    }

    pub async fn avg(&self, column: impl Into<Column>) -> QueryResult<Value> {
        self.aggregate("avg", [column]).await
    }

    /// Run `function(columns)` over the query and return the scalar.
    ///
    /// Queries with unions or havings keep their columns and are wrapped as a
    /// derived table by the grammar.
    pub async fn aggregate<I, C>(&self, function: &str, columns: I) -> QueryResult<Value>
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        let mut query = if self.unions.is_empty() && self.havings.is_empty() {
            let mut query = self.clone_without(&[Component::Columns]);
            query.bindings.clear(BindingType::Select);
            query
        } else {
            self.clone()
        };
        query.aggregate = Some(Aggregate {
            function: function.to_string(),
            columns: expr::columns(columns),
        });
        if query.groups.is_empty() {
            query.orders.clear();
            query.bindings.clear(BindingType::Order);
        }

        let rows = query.get().await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(Value::Null);
        };
        Ok(row
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("aggregate"))
            .map(|(_, value)| value)
            .unwrap_or(Value::Null))
    }
}

/// The key a driver reports for a plucked column: the alias when there is
/// one, otherwise the last dotted segment.
fn pluck_key(column: &str) -> &str {
    if let Some((_, alias)) = helpers::split_alias(column) {
        return alias;
    }
    column.rsplit('.').next().unwrap_or(column)
}
