//! The query builder.
//!
//! A [`Builder`] holds clause state plus the clause-keyed [`Bindings`] table.
//! Mutators consume and return the builder; every mutator that introduces a
//! placeholder pushes its value under the matching clause in the same call.
//! Terminal operations live in `fetch` (reads) and `dml` (writes); predicate
//! mutators in `predicate`; joins in `join`.
//!
//! # Example
//!
//! ```ignore
//! use quarry::Builder;
//!
//! let sql = Builder::new(connection)
//!     .from("users")
//!     .where_("id", "=", 1)
//!     .or_where_eq("name", "foo")
//!     .to_sql()?;
//! assert_eq!(sql, r#"select * from "users" where "id" = ? or "name" = ?"#);
//! ```

use std::sync::Arc;

use tracing::trace;

use super::bindings::{BindingType, Bindings};
use super::clause::{
    Aggregate, Component, Direction, Distinct, Having, IndexHint, IndexHintKind, Lock, Order,
    Union, Where,
};
use super::connection::Connection;
use super::error::{QueryError, QueryResult};
use super::expr::{self, Column, Expression};
use super::grammar::Grammar;
use super::join::JoinClause;
use super::processor::Processor;
use super::value::Value;

// =============================================================================
// Subquery arguments
// =============================================================================

/// Anything usable where a subquery is expected: a builder, a closure that
/// fills in a fresh builder, or raw SQL text.
pub trait Queryable {
    /// Compile into `(sql, bindings)` relative to `parent`.
    fn into_sub(self, parent: &Builder) -> QueryResult<(String, Vec<Value>)>;
}

impl Queryable for Builder {
    fn into_sub(self, parent: &Builder) -> QueryResult<(String, Vec<Value>)> {
        let query = parent.prepend_database_name_if_cross_database(self);
        Ok((query.to_sql()?, query.get_bindings()))
    }
}

impl<F> Queryable for F
where
    F: FnOnce(Builder) -> Builder,
{
    fn into_sub(self, parent: &Builder) -> QueryResult<(String, Vec<Value>)> {
        self(parent.for_sub_query()).into_sub(parent)
    }
}

impl Queryable for &str {
    fn into_sub(self, _parent: &Builder) -> QueryResult<(String, Vec<Value>)> {
        if self.trim().is_empty() {
            return Err(QueryError::InvalidSubquery(
                "a subquery must be a builder, a closure or non-empty SQL".into(),
            ));
        }
        Ok((self.to_string(), Vec::new()))
    }
}

impl Queryable for String {
    fn into_sub(self, parent: &Builder) -> QueryResult<(String, Vec<Value>)> {
        self.as_str().into_sub(parent)
    }
}

/// A builder, or a closure that fills in a fresh one.
pub trait IntoBuilder {
    fn into_builder(self, parent: &Builder) -> Builder;
}

impl IntoBuilder for Builder {
    fn into_builder(self, _parent: &Builder) -> Builder {
        self
    }
}

impl<F> IntoBuilder for F
where
    F: FnOnce(Builder) -> Builder,
{
    fn into_builder(self, parent: &Builder) -> Builder {
        self(parent.for_sub_query())
    }
}

// =============================================================================
// Statement
// =============================================================================

/// Compiled SQL with its bindings, prepared for the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub bindings: Vec<Value>,
}

// =============================================================================
// Builder
// =============================================================================

/// Fluent query state attached to a connection.
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until compiled or executed"]
pub struct Builder {
    /// Selected columns; `None` compiles as `*`.
    pub columns: Option<Vec<Column>>,
    pub from: Option<Column>,
    pub index_hint: Option<IndexHint>,
    pub joins: Vec<JoinClause>,
    pub wheres: Vec<Where>,
    pub groups: Vec<Column>,
    pub havings: Vec<Having>,
    pub orders: Vec<Order>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub unions: Vec<Union>,
    pub union_limit: Option<u64>,
    pub union_offset: Option<u64>,
    pub union_orders: Vec<Order>,
    pub aggregate: Option<Aggregate>,
    pub distinct: Distinct,
    pub lock: Option<Lock>,
    pub bindings: Bindings,
    connection: Arc<dyn Connection>,
    grammar: Arc<dyn Grammar>,
    processor: Arc<dyn Processor>,
    is_join: bool,
}

impl Builder {
    /// A builder using the connection's grammar and processor.
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        let grammar = connection.query_grammar();
        let processor = connection.post_processor();
        Self::with_parts(connection, grammar, processor)
    }

    pub fn with_parts(
        connection: Arc<dyn Connection>,
        grammar: Arc<dyn Grammar>,
        processor: Arc<dyn Processor>,
    ) -> Self {
        Self {
            columns: None,
            from: None,
            index_hint: None,
            joins: Vec::new(),
            wheres: Vec::new(),
            groups: Vec::new(),
            havings: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            unions: Vec::new(),
            union_limit: None,
            union_offset: None,
            union_orders: Vec::new(),
            aggregate: None,
            distinct: Distinct::None,
            lock: None,
            bindings: Bindings::new(),
            connection,
            grammar,
            processor,
            is_join: false,
        }
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn grammar(&self) -> &Arc<dyn Grammar> {
        &self.grammar
    }

    pub fn processor(&self) -> &Arc<dyn Processor> {
        &self.processor
    }

    /// Whether this builder holds the `on` conditions of a join.
    pub fn is_join(&self) -> bool {
        self.is_join
    }

    // =========================================================================
    // Sub-builders
    // =========================================================================

    /// Empty builder sharing connection, grammar and processor. Inside a join
    /// the new builder still compiles its predicates as `on`.
    pub fn new_query(&self) -> Builder {
        let mut query = Builder::with_parts(
            Arc::clone(&self.connection),
            Arc::clone(&self.grammar),
            Arc::clone(&self.processor),
        );
        query.is_join = self.is_join;
        query
    }

    /// Empty builder for a standalone subquery.
    pub fn for_sub_query(&self) -> Builder {
        let mut query = self.new_query();
        query.is_join = false;
        query
    }

    /// Empty builder for a parenthesized predicate group on the same table.
    pub fn for_nested_where(&self) -> Builder {
        let mut query = self.new_query();
        query.from = self.from.clone();
        query
    }

    pub(crate) fn new_join_query(&self) -> Builder {
        let mut query = self.new_query();
        query.is_join = true;
        query
    }

    /// Qualify a subquery's table with its database when it runs against a
    /// different database than this builder.
    fn prepend_database_name_if_cross_database(&self, mut query: Builder) -> Builder {
        let database = query.connection.database_name().to_string();
        if database == self.connection.database_name() {
            return query;
        }
        if let Some(Column::Name(from)) = &query.from {
            if !from.starts_with(&database) && !from.contains('.') {
                let qualified = format!("{database}.{from}");
                trace!(from = %from, qualified = %qualified, "qualifying cross-database subquery");
                query.from = Some(Column::Name(qualified));
            }
        }
        query
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Replace the selected columns.
    pub fn select<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.columns = Some(expr::columns(columns));
        self.bindings.clear(BindingType::Select);
        self
    }

    pub fn add_select<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.columns
            .get_or_insert_with(Vec::new)
            .extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn select_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self = self.add_select([expr::raw(sql)]);
        self.bindings.extend(BindingType::Select, bindings);
        self
    }

    /// `(subquery) as alias` in the select list.
    pub fn select_sub(self, query: impl Queryable, alias: &str) -> QueryResult<Self> {
        let (sql, bindings) = query.into_sub(&self)?;
        let alias = self.grammar.wrap_str(alias)?;
        Ok(self.select_raw(&format!("({sql}) as {alias}"), bindings))
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = Distinct::All;
        self
    }

    /// `distinct on (...)` on Postgres, plain `distinct` elsewhere.
    pub fn distinct_on<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.distinct = Distinct::Columns(expr::columns(columns));
        self
    }

    pub fn from(mut self, table: impl Into<Column>) -> Self {
        self.from = Some(table.into());
        self
    }

    /// `(subquery) as alias` as the table.
    pub fn from_sub(self, query: impl Queryable, alias: &str) -> QueryResult<Self> {
        let (sql, bindings) = query.into_sub(&self)?;
        let alias = self.grammar.wrap_table(&Column::from(alias));
        Ok(self.from_raw(&format!("({sql}) as {alias}"), bindings))
    }

    pub fn from_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self.from = Some(Column::Raw(expr::raw(sql)));
        self.bindings.extend(BindingType::From, bindings);
        self
    }

    pub fn use_index(self, index: &str) -> Self {
        self.index_hint(IndexHintKind::Use, index)
    }

    pub fn force_index(self, index: &str) -> Self {
        self.index_hint(IndexHintKind::Force, index)
    }

    pub fn ignore_index(self, index: &str) -> Self {
        self.index_hint(IndexHintKind::Ignore, index)
    }

    fn index_hint(mut self, kind: IndexHintKind, index: &str) -> Self {
        self.index_hint = Some(IndexHint {
            kind,
            index: index.to_string(),
        });
        self
    }

    // =========================================================================
    // Grouping
    // =========================================================================

    pub fn group_by<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.groups.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn group_by_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self.groups.push(Column::Raw(expr::raw(sql)));
        self.bindings.extend(BindingType::GroupBy, bindings);
        self
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    /// Order by a column. `direction` must be `asc` or `desc`.
    pub fn order_by(self, column: impl Into<Column>, direction: &str) -> QueryResult<Self> {
        let direction = direction.parse::<Direction>()?;
        Ok(self.push_order(Order::Column {
            column: column.into(),
            direction,
        }))
    }

    pub fn order_by_asc(self, column: impl Into<Column>) -> Self {
        self.push_order(Order::Column {
            column: column.into(),
            direction: Direction::Asc,
        })
    }

    pub fn order_by_desc(self, column: impl Into<Column>) -> Self {
        self.push_order(Order::Column {
            column: column.into(),
            direction: Direction::Desc,
        })
    }

    pub fn latest(self, column: impl Into<Column>) -> Self {
        self.order_by_desc(column)
    }

    pub fn oldest(self, column: impl Into<Column>) -> Self {
        self.order_by_asc(column)
    }

    /// Order by the result of a subquery.
    pub fn order_by_sub(self, query: impl Queryable, direction: &str) -> QueryResult<Self> {
        let direction = direction.parse::<Direction>()?;
        let (sql, bindings) = query.into_sub(&self)?;
        let mut query = self.push_order(Order::Column {
            column: Column::Raw(expr::raw(format!("({sql})"))),
            direction,
        });
        let ty = query.order_binding_type();
        query.bindings.extend(ty, bindings);
        Ok(query)
    }

    pub fn order_by_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        let ty = self.order_binding_type();
        self = self.push_order(Order::Raw {
            sql: sql.to_string(),
        });
        self.bindings.extend(ty, bindings);
        self
    }

    /// Random order; `seed` is honored by MySQL only.
    pub fn in_random_order(self, seed: &str) -> Self {
        let random = self.grammar.compile_random(seed);
        self.order_by_raw(&random, Vec::new())
    }

    /// Drop every ordering, including union orderings.
    pub fn reorder(mut self) -> Self {
        self.orders.clear();
        self.union_orders.clear();
        self.bindings.clear(BindingType::Order);
        self.bindings.clear(BindingType::UnionOrder);
        self
    }

    fn push_order(mut self, order: Order) -> Self {
        if self.unions.is_empty() {
            self.orders.push(order);
        } else {
            self.union_orders.push(order);
        }
        self
    }

    fn order_binding_type(&self) -> BindingType {
        if self.unions.is_empty() {
            BindingType::Order
        } else {
            BindingType::UnionOrder
        }
    }

    // =========================================================================
    // Paging
    // =========================================================================

    pub fn limit(mut self, limit: u64) -> Self {
        if self.unions.is_empty() {
            self.limit = Some(limit);
        } else {
            self.union_limit = Some(limit);
        }
        self
    }

    pub fn take(self, limit: u64) -> Self {
        self.limit(limit)
    }

    pub fn offset(mut self, offset: u64) -> Self {
        if self.unions.is_empty() {
            self.offset = Some(offset);
        } else {
            self.union_offset = Some(offset);
        }
        self
    }

    pub fn skip(self, offset: u64) -> Self {
        self.offset(offset)
    }

    /// One-based page of `per_page` rows.
    pub fn for_page(self, page: u64, per_page: u64) -> Self {
        self.offset(page.saturating_sub(1).saturating_mul(per_page))
            .limit(per_page)
    }

    /// Keyset page of rows with `column` below `last_id`, newest first.
    pub fn for_page_before_id(
        self,
        per_page: u64,
        last_id: Option<Value>,
        column: &str,
    ) -> Self {
        let mut query = self.remove_existing_orders_for(column);
        if let Some(id) = last_id {
            query = query.where_(column, "<", id);
        }
        query.order_by_desc(column).limit(per_page)
    }

    /// Keyset page of rows with `column` above `last_id`, oldest first.
    pub fn for_page_after_id(
        self,
        per_page: u64,
        last_id: Option<Value>,
        column: &str,
    ) -> Self {
        let mut query = self.remove_existing_orders_for(column);
        if let Some(id) = last_id {
            query = query.where_(column, ">", id);
        }
        query.order_by_asc(column).limit(per_page)
    }

    fn remove_existing_orders_for(mut self, column: &str) -> Self {
        self.orders.retain(|order| {
            !matches!(order, Order::Column { column: c, .. } if c.as_name() == Some(column))
        });
        self
    }

    // =========================================================================
    // Locking and unions
    // =========================================================================

    pub fn lock(mut self, lock: Lock) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn lock_for_update(self) -> Self {
        self.lock(Lock::Update)
    }

    pub fn shared_lock(self) -> Self {
        self.lock(Lock::Shared)
    }

    pub fn union(self, query: impl IntoBuilder) -> Self {
        self.push_union(query, false)
    }

    pub fn union_all(self, query: impl IntoBuilder) -> Self {
        self.push_union(query, true)
    }

    fn push_union(mut self, query: impl IntoBuilder, all: bool) -> Self {
        let query = query.into_builder(&self);
        self.bindings.extend(BindingType::Union, query.get_bindings());
        self.unions.push(Union {
            query: Box::new(query),
            all,
        });
        self
    }

    // =========================================================================
    // Bindings
    // =========================================================================

    /// Every binding in placeholder order.
    pub fn get_bindings(&self) -> Vec<Value> {
        self.bindings.flatten()
    }

    pub fn raw_bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Replace one clause's bindings.
    pub fn set_bindings(mut self, values: Vec<Value>, ty: BindingType) -> Self {
        self.bindings.set(ty, values);
        self
    }

    pub fn add_binding(mut self, values: Vec<Value>, ty: BindingType) -> Self {
        self.bindings.extend(ty, values);
        self
    }

    /// Add bindings by clause name (`where`, `groupBy`, ...), failing on
    /// names that are not clauses.
    pub fn add_binding_named(mut self, values: Vec<Value>, ty: &str) -> QueryResult<Self> {
        let ty = ty.parse::<BindingType>()?;
        self.bindings.extend(ty, values);
        Ok(self)
    }

    pub fn merge_bindings(mut self, other: &Builder) -> Self {
        self.bindings.merge(&other.bindings);
        self
    }

    /// A copy with the given components reset.
    pub fn clone_without(&self, components: &[Component]) -> Builder {
        let mut query = self.clone();
        for component in components {
            match component {
                Component::Aggregate => query.aggregate = None,
                Component::Columns => query.columns = None,
                Component::From => query.from = None,
                Component::IndexHint => query.index_hint = None,
                Component::Joins => query.joins.clear(),
                Component::Wheres => query.wheres.clear(),
                Component::Groups => query.groups.clear(),
                Component::Havings => query.havings.clear(),
                Component::Orders => query.orders.clear(),
                Component::Limit => query.limit = None,
                Component::Offset => query.offset = None,
                Component::Lock => query.lock = None,
            }
        }
        query
    }

    /// A copy with the given clauses' bindings removed.
    pub fn clone_without_bindings(&self, types: &[BindingType]) -> Builder {
        let mut query = self.clone();
        for ty in types {
            query.bindings.clear(*ty);
        }
        query
    }

    // =========================================================================
    // Compilation
    // =========================================================================

    /// Compile the select statement.
    pub fn to_sql(&self) -> QueryResult<String> {
        self.grammar.compile_select(self)
    }

    /// Compiled select plus driver-ready bindings in the order the grammar
    /// emitted their placeholders.
    pub fn to_statement(&self) -> QueryResult<Statement> {
        let sql = self.to_sql()?;
        let order = self.grammar.select_binding_order(self);
        let bindings = self.grammar.prepare_bindings(self.bindings.flatten_in(order));
        Ok(Statement { sql, bindings })
    }

    /// The select with bindings inlined as literals. For logs and debugging
    /// only; never execute it.
    pub fn to_raw_sql(&self) -> QueryResult<String> {
        let statement = self.to_statement()?;
        self.grammar
            .substitute_bindings_into_raw_sql(&statement.sql, &statement.bindings)
    }

    /// Shorthand for [`expr::raw`].
    pub fn raw(&self, sql: impl Into<String>) -> Expression {
        expr::raw(sql)
    }
}
