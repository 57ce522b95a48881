//! Join clauses.
//!
//! A [`JoinClause`] owns a builder whose wheres compile as the join's `on`
//! conditions. Values bound in those conditions land in the parent's `join`
//! bindings when the clause is attached.

use super::bindings::BindingType;
use super::clause::{Boolean, JoinType};
use super::error::QueryResult;
use super::expr::{self, Column};
use super::query::{Builder, Queryable};
use super::value::Value;

/// One `join` with its own condition builder.
#[derive(Debug, Clone)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: Column,
    pub query: Builder,
}

impl JoinClause {
    pub fn new(parent: &Builder, join_type: JoinType, table: impl Into<Column>) -> Self {
        Self {
            join_type,
            table: table.into(),
            query: parent.new_join_query(),
        }
    }

    /// `on first operator second`, comparing two columns.
    #[must_use]
    pub fn on(mut self, first: impl Into<Column>, operator: &str, second: impl Into<Column>) -> Self {
        self.query = self.query.where_column(first, operator, second);
        self
    }

    #[must_use]
    pub fn or_on(
        mut self,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Self {
        self.query = self.query.or_where_column(first, operator, second);
        self
    }

    /// A parenthesized group of `on` conditions.
    #[must_use]
    pub fn on_nested(self, callback: impl FnOnce(JoinClause) -> JoinClause) -> Self {
        self.nested(callback, Boolean::And)
    }

    #[must_use]
    pub fn or_on_nested(self, callback: impl FnOnce(JoinClause) -> JoinClause) -> Self {
        self.nested(callback, Boolean::Or)
    }

    fn nested(mut self, callback: impl FnOnce(JoinClause) -> JoinClause, boolean: Boolean) -> Self {
        let group = JoinClause {
            join_type: self.join_type,
            table: self.table.clone(),
            query: self.query.for_nested_where(),
        };
        let group = callback(group);
        self.query = self.query.add_nested_where_query(group.query, boolean);
        self
    }

    /// `on column operator ?`, binding the value.
    #[must_use]
    pub fn where_(
        mut self,
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.query = self.query.where_(column, operator, value);
        self
    }

    #[must_use]
    pub fn or_where(
        mut self,
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.query = self.query.or_where(column, operator, value);
        self
    }

    #[must_use]
    pub fn where_in<I, V>(mut self, column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.query = self.query.where_in(column, values);
        self
    }

    #[must_use]
    pub fn where_null(mut self, column: impl Into<Column>) -> Self {
        self.query = self.query.where_null(column);
        self
    }

    #[must_use]
    pub fn where_not_null(mut self, column: impl Into<Column>) -> Self {
        self.query = self.query.where_not_null(column);
        self
    }

    #[must_use]
    pub fn where_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self.query = self.query.where_raw(sql, bindings);
        self
    }

    /// A join nested inside this one: `join (a inner join b on ...) on ...`.
    #[must_use]
    pub fn join(
        mut self,
        table: impl Into<Column>,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Self {
        self.query = self.query.join(table, first, operator, second);
        self
    }

    #[must_use]
    pub fn left_join(
        mut self,
        table: impl Into<Column>,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Self {
        self.query = self.query.left_join(table, first, operator, second);
        self
    }
}

impl Builder {
    /// `inner join table on first operator second`.
    pub fn join(
        self,
        table: impl Into<Column>,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Self {
        let clause = JoinClause::new(&self, JoinType::Inner, table).on(first, operator, second);
        self.add_join(clause)
    }

    /// Inner join with conditions built by `callback`.
    pub fn join_with(
        self,
        table: impl Into<Column>,
        callback: impl FnOnce(JoinClause) -> JoinClause,
    ) -> Self {
        let clause = callback(JoinClause::new(&self, JoinType::Inner, table));
        self.add_join(clause)
    }

    /// Inner join whose condition compares a column to a bound value.
    pub fn join_where(
        self,
        table: impl Into<Column>,
        first: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        let clause = JoinClause::new(&self, JoinType::Inner, table).where_(first, operator, value);
        self.add_join(clause)
    }

    pub fn left_join(
        self,
        table: impl Into<Column>,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Self {
        let clause = JoinClause::new(&self, JoinType::Left, table).on(first, operator, second);
        self.add_join(clause)
    }

    pub fn left_join_with(
        self,
        table: impl Into<Column>,
        callback: impl FnOnce(JoinClause) -> JoinClause,
    ) -> Self {
        let clause = callback(JoinClause::new(&self, JoinType::Left, table));
        self.add_join(clause)
    }

    pub fn left_join_where(
        self,
        table: impl Into<Column>,
        first: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        let clause = JoinClause::new(&self, JoinType::Left, table).where_(first, operator, value);
        self.add_join(clause)
    }

    pub fn right_join(
        self,
        table: impl Into<Column>,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Self {
        let clause = JoinClause::new(&self, JoinType::Right, table).on(first, operator, second);
        self.add_join(clause)
    }

    pub fn right_join_with(
        self,
        table: impl Into<Column>,
        callback: impl FnOnce(JoinClause) -> JoinClause,
    ) -> Self {
        let clause = callback(JoinClause::new(&self, JoinType::Right, table));
        self.add_join(clause)
    }

    pub fn right_join_where(
        self,
        table: impl Into<Column>,
        first: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        let clause = JoinClause::new(&self, JoinType::Right, table).where_(first, operator, value);
        self.add_join(clause)
    }

    /// `cross join table`, no conditions.
    pub fn cross_join(self, table: impl Into<Column>) -> Self {
        let clause = JoinClause::new(&self, JoinType::Cross, table);
        self.add_join(clause)
    }

    /// Join a subquery under `alias`.
    pub fn join_sub(
        self,
        query: impl Queryable,
        alias: &str,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> QueryResult<Self> {
        self.add_join_sub(query, alias, JoinType::Inner, |clause| {
            clause.on(first, operator, second)
        })
    }

    pub fn left_join_sub(
        self,
        query: impl Queryable,
        alias: &str,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> QueryResult<Self> {
        self.add_join_sub(query, alias, JoinType::Left, |clause| {
            clause.on(first, operator, second)
        })
    }

    pub fn right_join_sub(
        self,
        query: impl Queryable,
        alias: &str,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> QueryResult<Self> {
        self.add_join_sub(query, alias, JoinType::Right, |clause| {
            clause.on(first, operator, second)
        })
    }

    pub fn cross_join_sub(self, query: impl Queryable, alias: &str) -> QueryResult<Self> {
        self.add_join_sub(query, alias, JoinType::Cross, |clause| clause)
    }

    fn add_join_sub(
        mut self,
        query: impl Queryable,
        alias: &str,
        join_type: JoinType,
        conditions: impl FnOnce(JoinClause) -> JoinClause,
    ) -> QueryResult<Self> {
        let (sql, bindings) = query.into_sub(&self)?;
        let table = expr::raw(format!(
            "({sql}) as {}",
            self.grammar().wrap_table(&Column::from(alias))
        ));
        self.bindings.extend(BindingType::Join, bindings);
        let clause = conditions(JoinClause::new(&self, join_type, table));
        Ok(self.add_join(clause))
    }

    /// Attach a built clause, moving its condition bindings into `join`.
    pub fn add_join(mut self, clause: JoinClause) -> Self {
        self.bindings
            .extend(BindingType::Join, clause.query.get_bindings());
        self.joins.push(clause);
        self
    }
}
