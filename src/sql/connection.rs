//! The database connection seam.
//!
//! The builder never talks to a driver directly. It compiles SQL, prepares
//! bindings, and hands both to a [`Connection`]. Transport, pooling and
//! retries live behind this trait.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::error::QueryResult;
use super::grammar::Grammar;
use super::processor::Processor;
use super::query::Builder;
use super::value::{Row, Value};

/// Executes compiled statements.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use quarry::{Builder, Connection};
///
/// async fn active_users(conn: Arc<dyn Connection>) -> quarry::QueryResult<i64> {
///     Builder::new(conn).from("users").where_("active", "=", true).count().await
/// }
/// ```
#[async_trait]
pub trait Connection: fmt::Debug + Send + Sync {
    /// Grammar used by builders created on this connection.
    fn query_grammar(&self) -> Arc<dyn Grammar>;

    /// Processor used by builders created on this connection.
    fn post_processor(&self) -> Arc<dyn Processor>;

    /// Name of the database this connection points at.
    fn database_name(&self) -> &str;

    /// Run a select and return its rows.
    async fn select(&self, sql: &str, bindings: Vec<Value>) -> QueryResult<Vec<Row>>;

    /// Run a statement, reporting success.
    async fn statement(&self, sql: &str, bindings: Vec<Value>) -> QueryResult<bool>;

    /// Run a statement and return the number of affected rows.
    async fn affecting_statement(&self, sql: &str, bindings: Vec<Value>) -> QueryResult<u64>;

    /// Id generated by the last insert, read from `sequence` where the
    /// engine needs one.
    async fn last_insert_id(&self, sequence: Option<&str>) -> QueryResult<Value>;

    async fn insert(&self, sql: &str, bindings: Vec<Value>) -> QueryResult<bool> {
        self.statement(sql, bindings).await
    }

    async fn update(&self, sql: &str, bindings: Vec<Value>) -> QueryResult<u64> {
        self.affecting_statement(sql, bindings).await
    }

    async fn delete(&self, sql: &str, bindings: Vec<Value>) -> QueryResult<u64> {
        self.affecting_statement(sql, bindings).await
    }
}

/// Start a builder on a connection.
pub fn table(connection: Arc<dyn Connection>, table: &str) -> Builder {
    Builder::new(connection).from(table)
}
