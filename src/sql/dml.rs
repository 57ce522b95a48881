//! Write terminals: insert, upsert, update, delete and truncate.
//!
//! Values arrive as [`Record`]s (column → value, in insertion order). Every
//! statement's bindings go through the grammar's `prepare_bindings` before
//! they reach the connection.

use tracing::debug;

use super::clause::UpsertUpdate;
use super::error::QueryResult;
use super::expr::{self, Column};
use super::grammar::base;
use super::query::{Builder, Queryable};
use super::value::{clean_bindings, Record, Value};

/// Batch inserts are compiled in one column order, so multi-record batches
/// have their keys sorted.
fn normalize_records(mut values: Vec<Record>) -> Vec<Record> {
    if values.len() > 1 {
        for record in &mut values {
            record.sort_keys();
        }
    }
    values
}

impl Builder {
    /// Insert one or more records. An empty batch sends nothing.
    pub async fn insert(&self, values: Vec<Record>) -> QueryResult<bool> {
        if values.is_empty() {
            return Ok(true);
        }
        let values = normalize_records(values);
        let grammar = self.grammar();
        let sql = grammar.compile_insert(self, &values)?;
        let bindings = grammar.prepare_bindings(base::insert_bindings(&values)?);
        debug!(sql = %sql, bindings = bindings.len(), records = values.len(), "insert");
        self.connection().insert(&sql, bindings).await
    }

    /// Insert, skipping rows that violate a unique constraint.
    pub async fn insert_or_ignore(&self, values: Vec<Record>) -> QueryResult<u64> {
        if values.is_empty() {
            return Ok(0);
        }
        let values = normalize_records(values);
        let grammar = self.grammar();
        let sql = grammar.compile_insert_or_ignore(self, &values)?;
        let bindings = grammar.prepare_bindings(base::insert_bindings(&values)?);
        debug!(sql = %sql, bindings = bindings.len(), "insert or ignore");
        self.connection().affecting_statement(&sql, bindings).await
    }

    /// Insert one record and return the generated id.
    pub async fn insert_get_id(&self, values: Record, sequence: Option<&str>) -> QueryResult<Value> {
        let grammar = self.grammar();
        let sql = grammar.compile_insert_get_id(self, &values, sequence)?;
        let bindings = grammar.prepare_bindings(clean_bindings(values.into_values()));
        debug!(sql = %sql, bindings = bindings.len(), "insert get id");
        self.processor()
            .process_insert_get_id(self, &sql, bindings, sequence)
            .await
    }

    /// `insert into table (columns) <select>`.
    pub async fn insert_using<I, C>(&self, columns: I, query: impl Queryable) -> QueryResult<u64>
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        let (select, bindings) = query.into_sub(self)?;
        let grammar = self.grammar();
        let sql = grammar.compile_insert_using(self, &expr::columns(columns), &select)?;
        let bindings = grammar.prepare_bindings(clean_bindings(bindings));
        debug!(sql = %sql, bindings = bindings.len(), "insert using");
        self.connection().affecting_statement(&sql, bindings).await
    }

    /// Insert records, updating `update` columns on rows that collide on
    /// `unique_by`.
    ///
    /// `None` updates every inserted column; an empty list degrades to a plain
    /// insert.
    pub async fn upsert(
        &self,
        values: Vec<Record>,
        unique_by: &[&str],
        update: Option<Vec<UpsertUpdate>>,
    ) -> QueryResult<u64> {
        if values.is_empty() {
            return Ok(0);
        }
        if update.as_ref().is_some_and(Vec::is_empty) {
            return Ok(u64::from(self.insert(values).await?));
        }
        let values = normalize_records(values);
        let update = update.unwrap_or_else(|| {
            base::insert_columns(&values)
                .into_iter()
                .map(UpsertUpdate::Column)
                .collect()
        });
        let unique_by: Vec<String> = unique_by.iter().map(|c| c.to_string()).collect();

        let grammar = self.grammar();
        let sql = grammar.compile_upsert(self, &values, &unique_by, &update)?;
        let mut bindings = base::insert_bindings(&values)?;
        bindings.extend(clean_bindings(update.into_iter().filter_map(|entry| match entry {
            UpsertUpdate::Value(_, value) => Some(value),
            UpsertUpdate::Column(_) => None,
        })));
        let bindings = grammar.prepare_bindings(bindings);
        debug!(sql = %sql, bindings = bindings.len(), "upsert");
        self.connection().affecting_statement(&sql, bindings).await
    }

    /// Update matching rows and return how many changed.
    pub async fn update(&self, values: Record) -> QueryResult<u64> {
        let grammar = self.grammar();
        let sql = grammar.compile_update(self, &values)?;
        let bindings = grammar.prepare_bindings(grammar.prepare_bindings_for_update(&self.bindings, &values));
        debug!(sql = %sql, bindings = bindings.len(), "update");
        self.connection().update(&sql, bindings).await
    }

    /// `column = column + amount`, plus any extra columns.
    pub async fn increment(
        &self,
        column: &str,
        amount: impl Into<f64>,
        extra: Record,
    ) -> QueryResult<u64> {
        self.adjust(column, "+", amount.into(), extra).await
    }

    /// `column = column - amount`, plus any extra columns.
    pub async fn decrement(
        &self,
        column: &str,
        amount: impl Into<f64>,
        extra: Record,
    ) -> QueryResult<u64> {
        self.adjust(column, "-", amount.into(), extra).await
    }

    async fn adjust(&self, column: &str, operator: &str, amount: f64, extra: Record) -> QueryResult<u64> {
        let wrapped = self.grammar().wrap_str(column)?;
        let mut values = Record::new();
        values.insert(
            column.to_string(),
            Value::Raw(expr::raw(format!("{wrapped} {operator} {amount}"))),
        );
        values.extend(extra);
        self.update(values).await
    }

    /// Delete matching rows and return how many went.
    pub async fn delete(&self) -> QueryResult<u64> {
        let grammar = self.grammar();
        let sql = grammar.compile_delete(self)?;
        let bindings = grammar.prepare_bindings(grammar.prepare_bindings_for_delete(&self.bindings));
        debug!(sql = %sql, bindings = bindings.len(), "delete");
        self.connection().delete(&sql, bindings).await
    }

    /// Empty the table. Some engines need more than one statement.
    pub async fn truncate(&self) -> QueryResult<()> {
        let grammar = self.grammar();
        for (sql, bindings) in grammar.compile_truncate(self)? {
            debug!(sql = %sql, bindings = bindings.len(), "truncate");
            self.connection()
                .statement(&sql, grammar.prepare_bindings(bindings))
                .await?;
        }
        Ok(())
    }
}
