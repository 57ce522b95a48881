//! Result post-processing.
//!
//! A [`Processor`] sees raw rows after the connection returns them and before
//! the builder hands them back. Dialect processors only differ in how an
//! inserted id is read and how column listings are shaped.

use std::fmt;

use async_trait::async_trait;

use super::error::QueryResult;
use super::query::Builder;
use super::value::{Row, Value};

/// Post-processes rows for one database engine.
#[async_trait]
pub trait Processor: fmt::Debug + Send + Sync {
    /// Rows of a select. Identity by default.
    fn process_select(&self, _query: &Builder, results: Vec<Row>) -> Vec<Row> {
        results
    }

    /// Run an insert and return the new row's id.
    async fn process_insert_get_id(
        &self,
        query: &Builder,
        sql: &str,
        values: Vec<Value>,
        sequence: Option<&str>,
    ) -> QueryResult<Value> {
        let connection = query.connection();
        connection.insert(sql, values).await?;
        let id = connection.last_insert_id(sequence).await?;
        Ok(numeric_id(id))
    }

    /// Column names out of a schema listing query.
    fn process_column_listing(&self, results: Vec<Row>) -> Vec<String> {
        results
            .into_iter()
            .filter_map(|row| row.into_values().next())
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect()
    }
}

/// Ids that arrive as numeric text are returned as integers.
pub fn numeric_id(id: Value) -> Value {
    match &id {
        Value::Text(text) => text.parse::<i64>().map(Value::Int).unwrap_or(id),
        _ => id,
    }
}

fn column_listing_by(results: Vec<Row>, key: &str) -> Vec<String> {
    results
        .into_iter()
        .filter_map(|mut row| row.shift_remove(key))
        .filter_map(|value| value.as_str().map(str::to_string))
        .collect()
}

/// Processor for the generic grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProcessor;

impl Processor for DefaultProcessor {}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlProcessor;

impl Processor for MySqlProcessor {
    fn process_column_listing(&self, results: Vec<Row>) -> Vec<String> {
        column_listing_by(results, "column_name")
    }
}

/// Reads inserted ids from the `returning` row instead of asking the
/// connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresProcessor;

#[async_trait]
impl Processor for PostgresProcessor {
    async fn process_insert_get_id(
        &self,
        query: &Builder,
        sql: &str,
        values: Vec<Value>,
        sequence: Option<&str>,
    ) -> QueryResult<Value> {
        let rows = query.connection().select(sql, values).await?;
        let Some(mut row) = rows.into_iter().next() else {
            return Ok(Value::Null);
        };
        let key = sequence.unwrap_or("id");
        let id = match row.shift_remove(key) {
            Some(id) => id,
            None => row.into_values().next().unwrap_or(Value::Null),
        };
        Ok(numeric_id(id))
    }

    fn process_column_listing(&self, results: Vec<Row>) -> Vec<String> {
        column_listing_by(results, "column_name")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteProcessor;

impl Processor for SqliteProcessor {
    fn process_column_listing(&self, results: Vec<Row>) -> Vec<String> {
        column_listing_by(results, "name")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerProcessor;

impl Processor for SqlServerProcessor {
    fn process_column_listing(&self, results: Vec<Row>) -> Vec<String> {
        column_listing_by(results, "name")
    }
}
