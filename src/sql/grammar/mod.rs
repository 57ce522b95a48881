//! Query grammars: compile builder state into dialect SQL.
//!
//! The [`Grammar`] trait carries one default method per compilation step. The
//! defaults produce generic SQL; each dialect struct overrides only the steps
//! where its engine differs:
//!
//! - Identifier quoting: `"` (generic/Postgres/SQLite), `` ` `` (MySQL), `[]` (SQL Server)
//! - Date-part predicates: `date(col)`, `col::date`, `strftime(...)`, `cast(col as date)`
//! - JSON selectors: `json_extract`, `->>`, `json_value`
//! - Upserts: `on duplicate key update`, `on conflict ... do update`, `merge`
//! - Paging: `limit`/`offset` vs `top` and `row_number()` emulation
//!
//! # Usage
//!
//! ```ignore
//! use quarry::grammar::{Dialect, GrammarConfig};
//!
//! let grammar = Dialect::MySql.grammar(GrammarConfig::default());
//! assert_eq!(grammar.wrap_value("users"), "`users`");
//! ```
//!
//! # Feature Support
//!
//! | Feature | Generic | MySQL | Postgres | SQLite | SQL Server |
//! |---------|---------|-------|----------|--------|------------|
//! | JSON selectors | ❌ | 5.7+ | 9.4+ (jsonb) | 3.38+ | 2016+ |
//! | Full-text predicates | ❌ | ✓ | ✓ | ❌ | ❌ |
//! | Insert or ignore | ❌ | ✓ | 9.5+ | ✓ | ❌ |
//! | Upsert | ❌ | ✓ | 9.5+ | 3.24+ | 2008+ (MERGE) |
//! | Upsert row alias | ❌ | 8.0.19+ | ❌ | ❌ | ❌ |
//! | `distinct on` | ❌ | ❌ | ✓ | ❌ | ❌ |
//! | `websearch_to_tsquery` | ❌ | ❌ | 11+ | ❌ | ❌ |
//! | Index hints | ❌ | ✓ | ❌ | force only | force only |
//!
//! Version columns are best effort: the grammar emits the syntax and leaves
//! validation to the server.

pub mod base;
mod generic;
pub mod helpers;
mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

pub use generic::GenericGrammar;
pub use mysql::MySqlGrammar;
pub use postgres::PostgresGrammar;
pub use sqlite::SqliteGrammar;
pub use sqlserver::SqlServerGrammar;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;

use super::bindings::{BindingType, Bindings};
use super::clause::{
    Aggregate, Boolean, Component, DatePart, Distinct, FullTextOptions, Having, HavingKind,
    IndexHint, Lock, Order, Union, UpsertUpdate, Where, WhereKind,
};
use super::error::{QueryError, QueryResult};
use super::expr::Column;
use super::join::JoinClause;
use super::processor::{
    DefaultProcessor, MySqlProcessor, PostgresProcessor, Processor, SqlServerProcessor,
    SqliteProcessor,
};
use super::query::Builder;
use super::value::{Record, Value};

/// Construction-time options shared by every grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrammarConfig {
    /// Prepended to every table name and table alias.
    pub table_prefix: String,
    /// MySQL 8.0.19+: reference inserted values through a row alias in upserts
    /// instead of the deprecated `values()` function.
    pub use_upsert_alias: bool,
}

impl GrammarConfig {
    #[must_use]
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_upsert_alias(mut self, enabled: bool) -> Self {
        self.use_upsert_alias = enabled;
        self
    }
}

/// Operators every grammar accepts in basic predicates.
pub const OPERATORS: &[&str] = &[
    "=", "<", ">", "<=", ">=", "<>", "!=", "<=>", "like", "like binary", "not like", "ilike",
    "&", "|", "^", "<<", ">>", "&~", "is", "is not", "rlike", "not rlike", "regexp",
    "not regexp", "~", "~*", "!~", "!~*", "similar to", "not similar to", "not ilike", "~~*",
    "!~~*",
];

/// Operators that turn a basic predicate into a bitwise one.
pub const BITWISE_OPERATORS: &[&str] = &["&", "|", "^", "<<", ">>", "&~"];

/// Compiles builder state into SQL for one database engine.
///
/// Implementations must be stateless across compilations; the only state is
/// the [`GrammarConfig`] fixed at construction.
pub trait Grammar: fmt::Debug + Send + Sync {
    /// Grammar name for errors and logging.
    fn name(&self) -> &'static str;

    fn config(&self) -> &GrammarConfig;

    fn table_prefix(&self) -> &str {
        &self.config().table_prefix
    }

    // =========================================================================
    // Identifier wrapping
    // =========================================================================

    /// Quote a single identifier segment. `*` is never quoted.
    fn wrap_value(&self, value: &str) -> String {
        if value == "*" {
            return value.to_string();
        }
        helpers::quote_double(value)
    }

    /// Wrap a column reference: raw passes through, `a as b` wraps both
    /// halves, `col->path` becomes a JSON selector, `t.col` prefixes `t`.
    fn wrap(&self, column: &Column) -> QueryResult<String> {
        base::wrap(self, column)
    }

    fn wrap_str(&self, value: &str) -> QueryResult<String> {
        self.wrap(&Column::from(value))
    }

    /// Wrap a table reference, applying the table prefix to table and alias.
    fn wrap_table(&self, table: &Column) -> String {
        base::wrap_table(self, table)
    }

    fn wrap_json_selector(&self, _value: &str) -> QueryResult<String> {
        Err(QueryError::unsupported(self.name(), "JSON operations"))
    }

    fn wrap_json_boolean_selector(&self, value: &str) -> QueryResult<String> {
        self.wrap_json_selector(value)
    }

    fn wrap_json_boolean_value(&self, value: &str) -> String {
        value.to_string()
    }

    fn columnize(&self, columns: &[Column]) -> QueryResult<String> {
        let wrapped = columns
            .iter()
            .map(|c| self.wrap(c))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(wrapped.join(", "))
    }

    /// `?`, or the raw SQL of an expression.
    fn parameter(&self, value: &Value) -> String {
        match value {
            Value::Raw(expr) => expr.value().to_string(),
            _ => "?".to_string(),
        }
    }

    fn parameterize(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| self.parameter(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Grammar-specific operators accepted on top of [`OPERATORS`].
    fn operators(&self) -> &'static [&'static str] {
        &[]
    }

    /// Grammar-specific bitwise operators on top of [`BITWISE_OPERATORS`].
    fn bitwise_operators(&self) -> &'static [&'static str] {
        &[]
    }

    // =========================================================================
    // Binding preparation and literals
    // =========================================================================

    /// chrono format used for bound timestamps.
    fn date_format(&self) -> &'static str {
        "%Y-%m-%d %H:%M:%S"
    }

    /// Convert values into what drivers bind: timestamps as text, booleans as
    /// `0`/`1`, JSON as its encoding. Raw expressions are dropped.
    fn prepare_bindings(&self, values: Vec<Value>) -> Vec<Value> {
        values
            .into_iter()
            .filter(|v| !v.is_raw())
            .map(|v| match v {
                Value::DateTime(dt) => Value::Text(dt.format(self.date_format()).to_string()),
                Value::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
                Value::Time(t) => Value::Text(t.format("%H:%M:%S").to_string()),
                Value::Bool(b) => Value::Int(i64::from(b)),
                Value::Json(json) => Value::Text(json.to_string()),
                other => other,
            })
            .collect()
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn escape_binary(&self, bytes: &[u8]) -> String {
        format!("x'{}'", helpers::hex(bytes))
    }

    /// Render a value as a SQL literal. Only used for debugging output.
    fn escape(&self, value: &Value) -> QueryResult<String> {
        base::escape(self, value)
    }

    /// Inline escaped bindings into the `?` placeholders of `sql`.
    fn substitute_bindings_into_raw_sql(&self, sql: &str, bindings: &[Value]) -> QueryResult<String> {
        base::substitute_bindings_into_raw_sql(self, sql, bindings)
    }

    // =========================================================================
    // Select
    // =========================================================================

    fn compile_select(&self, query: &Builder) -> QueryResult<String> {
        base::compile_select(self, query)
    }

    /// Compiled fragments of every present select component, in emission order.
    fn compile_components(&self, query: &Builder) -> QueryResult<IndexMap<Component, String>> {
        let mut compiled = IndexMap::new();
        for component in Component::SELECT {
            if let Some(sql) = self.compile_component(query, component)? {
                compiled.insert(component, sql);
            }
        }
        Ok(compiled)
    }

    /// Compile one component, or `None` when the builder does not carry it.
    fn compile_component(
        &self,
        query: &Builder,
        component: Component,
    ) -> QueryResult<Option<String>> {
        let sql = match component {
            Component::Aggregate => match &query.aggregate {
                Some(aggregate) => self.compile_aggregate(query, aggregate)?,
                None => return Ok(None),
            },
            Component::Columns => {
                if query.aggregate.is_some() {
                    return Ok(None);
                }
                let star = [Column::from("*")];
                let columns = match &query.columns {
                    Some(columns) if !columns.is_empty() => columns.as_slice(),
                    _ => &star[..],
                };
                self.compile_columns(query, columns)?
            }
            Component::From => match &query.from {
                Some(table) => self.compile_from(query, table)?,
                None => return Ok(None),
            },
            Component::IndexHint => match &query.index_hint {
                Some(hint) => self.compile_index_hint(query, hint)?,
                None => return Ok(None),
            },
            Component::Joins if !query.joins.is_empty() => {
                self.compile_joins(query, &query.joins)?
            }
            Component::Wheres if !query.wheres.is_empty() => self.compile_wheres(query)?,
            Component::Groups if !query.groups.is_empty() => {
                self.compile_groups(query, &query.groups)?
            }
            Component::Havings if !query.havings.is_empty() => self.compile_havings(query)?,
            Component::Orders if !query.orders.is_empty() => {
                self.compile_orders(query, &query.orders)?
            }
            Component::Limit => match query.limit {
                Some(limit) => self.compile_limit(query, limit),
                None => return Ok(None),
            },
            Component::Offset => match query.offset {
                Some(offset) => self.compile_offset(query, offset),
                None => return Ok(None),
            },
            Component::Lock => match &query.lock {
                Some(lock) => self.compile_lock(query, lock),
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(sql))
    }

    fn compile_aggregate(&self, query: &Builder, aggregate: &Aggregate) -> QueryResult<String> {
        let mut column = self.columnize(&aggregate.columns)?;
        match &query.distinct {
            Distinct::Columns(columns) => column = format!("distinct {}", self.columnize(columns)?),
            Distinct::All if column != "*" => column = format!("distinct {column}"),
            _ => {}
        }
        Ok(format!("select {}({}) as aggregate", aggregate.function, column))
    }

    fn compile_columns(&self, query: &Builder, columns: &[Column]) -> QueryResult<String> {
        let select = if query.distinct.is_distinct() {
            "select distinct "
        } else {
            "select "
        };
        Ok(format!("{select}{}", self.columnize(columns)?))
    }

    fn compile_from(&self, _query: &Builder, table: &Column) -> QueryResult<String> {
        Ok(format!("from {}", self.wrap_table(table)))
    }

    fn compile_index_hint(&self, _query: &Builder, _hint: &IndexHint) -> QueryResult<String> {
        Err(QueryError::unsupported(self.name(), "index hints"))
    }

    fn compile_joins(&self, query: &Builder, joins: &[JoinClause]) -> QueryResult<String> {
        base::compile_joins(self, query, joins)
    }

    /// `where ...` (or `on ...` for a join), with the first connector removed.
    fn compile_wheres(&self, query: &Builder) -> QueryResult<String> {
        if query.wheres.is_empty() {
            return Ok(String::new());
        }
        let parts = query
            .wheres
            .iter()
            .map(|w| Ok((w.boolean, self.compile_where(query, w)?)))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(format!(
            "{} {}",
            base::where_keyword(query),
            base::concatenate_predicates(&parts)
        ))
    }

    fn compile_where(&self, query: &Builder, predicate: &Where) -> QueryResult<String> {
        match &predicate.kind {
            WhereKind::Basic {
                column,
                operator,
                value,
            } => {
                base::check_operator(self, operator, value)?;
                self.where_basic(query, column, operator, value)
            }
            WhereKind::JsonBoolean {
                column,
                operator,
                value,
            } => self.where_json_boolean(query, column, operator, *value),
            WhereKind::Bitwise {
                column,
                operator,
                value,
            } => {
                base::check_operator(self, operator, value)?;
                self.where_bitwise(query, column, operator, value)
            }
            WhereKind::Column {
                first,
                operator,
                second,
            } => self.where_column(query, first, operator, second),
            WhereKind::In { column, values, not } => self.where_in(query, column, values, *not),
            WhereKind::InRaw { column, values, not } => {
                self.where_in_raw(query, column, values, *not)
            }
            WhereKind::Null { column, not } => self.where_null(query, column, *not),
            WhereKind::Between { column, values, not } => {
                self.where_between(query, column, values, *not)
            }
            WhereKind::BetweenColumns { column, values, not } => {
                self.where_between_columns(query, column, values, *not)
            }
            WhereKind::Date {
                part,
                column,
                operator,
                value,
            } => self.where_date_based(query, *part, column, operator, value),
            WhereKind::Nested { query: nested } => self.where_nested(query, nested),
            WhereKind::Sub {
                column,
                operator,
                query: sub,
            } => self.where_sub(query, column, operator, sub),
            WhereKind::Exists { query: sub, not } => self.where_exists(query, sub, *not),
            WhereKind::RowValues {
                columns,
                operator,
                values,
            } => self.where_row_values(query, columns, operator, values),
            WhereKind::JsonContains { column, value, not } => {
                self.where_json_contains(query, column, value, *not)
            }
            WhereKind::JsonLength {
                column,
                operator,
                value,
            } => self.where_json_length(query, column, operator, value),
            WhereKind::FullText {
                columns,
                value,
                options,
            } => self.where_full_text(query, columns, value, options),
            WhereKind::Raw { sql } => Ok(sql.clone()),
        }
    }

    fn where_basic(
        &self,
        _query: &Builder,
        column: &Column,
        operator: &str,
        value: &Value,
    ) -> QueryResult<String> {
        base::where_basic(self, column, operator, value)
    }

    fn where_json_boolean(
        &self,
        _query: &Builder,
        column: &str,
        operator: &str,
        value: bool,
    ) -> QueryResult<String> {
        let column = self.wrap_json_boolean_selector(column)?;
        let value = self.wrap_json_boolean_value(helpers::format_bool_literal(value));
        Ok(format!("{column} {operator} {value}"))
    }

    fn where_bitwise(
        &self,
        query: &Builder,
        column: &Column,
        operator: &str,
        value: &Value,
    ) -> QueryResult<String> {
        self.where_basic(query, column, operator, value)
    }

    fn where_column(
        &self,
        _query: &Builder,
        first: &Column,
        operator: &str,
        second: &Column,
    ) -> QueryResult<String> {
        Ok(format!("{} {} {}", self.wrap(first)?, operator, self.wrap(second)?))
    }

    /// An empty list short-circuits to `0 = 1` (`in`) or `1 = 1` (`not in`).
    fn where_in(
        &self,
        _query: &Builder,
        column: &Column,
        values: &[Value],
        not: bool,
    ) -> QueryResult<String> {
        if values.is_empty() {
            return Ok(if not { "1 = 1" } else { "0 = 1" }.to_string());
        }
        let keyword = if not { "not in" } else { "in" };
        Ok(format!(
            "{} {} ({})",
            self.wrap(column)?,
            keyword,
            self.parameterize(values)
        ))
    }

    fn where_in_raw(
        &self,
        _query: &Builder,
        column: &Column,
        values: &[i64],
        not: bool,
    ) -> QueryResult<String> {
        if values.is_empty() {
            return Ok(if not { "1 = 1" } else { "0 = 1" }.to_string());
        }
        let keyword = if not { "not in" } else { "in" };
        let list = values
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("{} {} ({})", self.wrap(column)?, keyword, list))
    }

    fn where_null(&self, _query: &Builder, column: &Column, not: bool) -> QueryResult<String> {
        base::where_null(self, column, not)
    }

    fn where_between(
        &self,
        _query: &Builder,
        column: &Column,
        values: &[Value; 2],
        not: bool,
    ) -> QueryResult<String> {
        let between = if not { "not between" } else { "between" };
        Ok(format!(
            "{} {} {} and {}",
            self.wrap(column)?,
            between,
            self.parameter(&values[0]),
            self.parameter(&values[1])
        ))
    }

    fn where_between_columns(
        &self,
        _query: &Builder,
        column: &Column,
        values: &[Column; 2],
        not: bool,
    ) -> QueryResult<String> {
        let between = if not { "not between" } else { "between" };
        Ok(format!(
            "{} {} {} and {}",
            self.wrap(column)?,
            between,
            self.wrap(&values[0])?,
            self.wrap(&values[1])?
        ))
    }

    /// `date(col) op ?` and friends.
    fn where_date_based(
        &self,
        _query: &Builder,
        part: DatePart,
        column: &Column,
        operator: &str,
        value: &Value,
    ) -> QueryResult<String> {
        base::where_date_based(self, part, column, operator, value)
    }

    /// Parenthesized where clause of a nested builder, keyword stripped.
    fn where_nested(&self, _query: &Builder, nested: &Builder) -> QueryResult<String> {
        let compiled = self.compile_wheres(nested)?;
        let offset = base::where_keyword(nested).len() + 1;
        Ok(format!("({})", compiled.get(offset..).unwrap_or_default()))
    }

    fn where_sub(
        &self,
        _query: &Builder,
        column: &Column,
        operator: &str,
        sub: &Builder,
    ) -> QueryResult<String> {
        Ok(format!(
            "{} {} ({})",
            self.wrap(column)?,
            operator,
            self.compile_select(sub)?
        ))
    }

    fn where_exists(&self, _query: &Builder, sub: &Builder, not: bool) -> QueryResult<String> {
        let keyword = if not { "not exists" } else { "exists" };
        Ok(format!("{keyword} ({})", self.compile_select(sub)?))
    }

    fn where_row_values(
        &self,
        _query: &Builder,
        columns: &[Column],
        operator: &str,
        values: &[Value],
    ) -> QueryResult<String> {
        Ok(format!(
            "({}) {} ({})",
            self.columnize(columns)?,
            operator,
            self.parameterize(values)
        ))
    }

    fn where_json_contains(
        &self,
        _query: &Builder,
        column: &str,
        value: &Value,
        not: bool,
    ) -> QueryResult<String> {
        let not = if not { "not " } else { "" };
        Ok(format!(
            "{not}{}",
            self.compile_json_contains(column, &self.parameter(value))?
        ))
    }

    fn compile_json_contains(&self, _column: &str, _value: &str) -> QueryResult<String> {
        Err(QueryError::unsupported(self.name(), "JSON contains operations"))
    }

    /// Encode a `where_json_contains` value for binding.
    fn prepare_binding_for_json_contains(&self, value: Value) -> Value {
        match value {
            Value::Raw(_) => value,
            other => Value::Text(other.to_json().to_string()),
        }
    }

    fn where_json_length(
        &self,
        _query: &Builder,
        column: &str,
        operator: &str,
        value: &Value,
    ) -> QueryResult<String> {
        self.compile_json_length(column, operator, &self.parameter(value))
    }

    fn compile_json_length(
        &self,
        _column: &str,
        _operator: &str,
        _value: &str,
    ) -> QueryResult<String> {
        Err(QueryError::unsupported(self.name(), "JSON length operations"))
    }

    fn where_full_text(
        &self,
        _query: &Builder,
        _columns: &[Column],
        _value: &str,
        _options: &FullTextOptions,
    ) -> QueryResult<String> {
        Err(QueryError::unsupported(self.name(), "fulltext search operations"))
    }

    fn compile_groups(&self, _query: &Builder, groups: &[Column]) -> QueryResult<String> {
        Ok(format!("group by {}", self.columnize(groups)?))
    }

    fn compile_havings(&self, query: &Builder) -> QueryResult<String> {
        if query.havings.is_empty() {
            return Ok(String::new());
        }
        let parts = query
            .havings
            .iter()
            .map(|h| Ok((h.boolean, self.compile_having(query, h)?)))
            .collect::<QueryResult<Vec<(Boolean, String)>>>()?;
        Ok(format!("having {}", base::concatenate_predicates(&parts)))
    }

    fn compile_having(&self, _query: &Builder, having: &Having) -> QueryResult<String> {
        match &having.kind {
            HavingKind::Raw { sql } => Ok(sql.clone()),
            HavingKind::Basic {
                column,
                operator,
                value,
            } => {
                base::check_operator(self, operator, value)?;
                Ok(format!(
                    "{} {} {}",
                    self.wrap(column)?,
                    operator,
                    self.parameter(value)
                ))
            }
            HavingKind::Bitwise {
                column,
                operator,
                value,
            } => Ok(format!(
                "({} {} {}) != 0",
                self.wrap(column)?,
                operator,
                self.parameter(value)
            )),
            HavingKind::Null { column, not } => {
                let is = if *not { "is not null" } else { "is null" };
                Ok(format!("{} {}", self.wrap(column)?, is))
            }
            HavingKind::Between { column, values, not } => {
                let between = if *not { "not between" } else { "between" };
                Ok(format!(
                    "{} {} {} and {}",
                    self.wrap(column)?,
                    between,
                    self.parameter(&values[0]),
                    self.parameter(&values[1])
                ))
            }
            HavingKind::Nested { query: nested } => {
                let compiled = self.compile_havings(nested)?;
                let offset = "having".len() + 1;
                Ok(format!("({})", compiled.get(offset..).unwrap_or_default()))
            }
        }
    }

    fn compile_orders(&self, _query: &Builder, orders: &[Order]) -> QueryResult<String> {
        if orders.is_empty() {
            return Ok(String::new());
        }
        let compiled = orders
            .iter()
            .map(|order| match order {
                Order::Raw { sql } => Ok(sql.clone()),
                Order::Column { column, direction } => {
                    Ok(format!("{} {}", self.wrap(column)?, direction.as_str()))
                }
            })
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(format!("order by {}", compiled.join(", ")))
    }

    /// Random ordering expression; `seed` is only honored where supported.
    fn compile_random(&self, _seed: &str) -> String {
        "RANDOM()".to_string()
    }

    fn compile_limit(&self, _query: &Builder, limit: u64) -> String {
        format!("limit {limit}")
    }

    fn compile_offset(&self, _query: &Builder, offset: u64) -> String {
        format!("offset {offset}")
    }

    fn compile_lock(&self, _query: &Builder, lock: &Lock) -> String {
        match lock {
            Lock::Raw(sql) => sql.clone(),
            Lock::Update | Lock::Shared => String::new(),
        }
    }

    /// Union branches plus union-level order, limit and offset.
    fn compile_unions(&self, query: &Builder) -> QueryResult<String> {
        let mut sql = String::new();
        for union in &query.unions {
            sql.push_str(&self.compile_union(union)?);
        }
        if !query.union_orders.is_empty() {
            sql.push(' ');
            sql.push_str(&self.compile_orders(query, &query.union_orders)?);
        }
        if let Some(limit) = query.union_limit {
            sql.push(' ');
            sql.push_str(&self.compile_limit(query, limit));
        }
        if let Some(offset) = query.union_offset {
            sql.push(' ');
            sql.push_str(&self.compile_offset(query, offset));
        }
        Ok(sql.trim_start().to_string())
    }

    fn compile_union(&self, union: &Union) -> QueryResult<String> {
        let conjunction = if union.all { " union all " } else { " union " };
        Ok(format!("{conjunction}{}", self.wrap_union(&union.query.to_sql()?)))
    }

    fn wrap_union(&self, sql: &str) -> String {
        format!("({sql})")
    }

    /// Aggregate over the de-aggregated query used as a derived table.
    fn compile_union_aggregate(&self, query: &Builder) -> QueryResult<String> {
        let Some(aggregate) = &query.aggregate else {
            return self.compile_select(query);
        };
        let sql = self.compile_aggregate(query, aggregate)?;
        let mut inner = query.clone();
        inner.aggregate = None;
        Ok(format!(
            "{} from ({}) as {}",
            sql,
            self.compile_select(&inner)?,
            self.wrap_table(&Column::from("temp_table"))
        ))
    }

    fn compile_exists(&self, query: &Builder) -> QueryResult<String> {
        Ok(format!(
            "select exists({}) as {}",
            self.compile_select(query)?,
            self.wrap_str("exists")?
        ))
    }

    /// Clause order of the bindings for a compiled select.
    fn select_binding_order(&self, _query: &Builder) -> &'static [BindingType] {
        &BindingType::ALL
    }

    // =========================================================================
    // Insert
    // =========================================================================

    fn compile_insert(&self, query: &Builder, values: &[Record]) -> QueryResult<String> {
        base::compile_insert(self, query, values)
    }

    fn compile_insert_or_ignore(&self, _query: &Builder, _values: &[Record]) -> QueryResult<String> {
        Err(QueryError::unsupported(
            self.name(),
            "inserting while ignoring errors",
        ))
    }

    fn compile_insert_get_id(
        &self,
        query: &Builder,
        values: &Record,
        _sequence: Option<&str>,
    ) -> QueryResult<String> {
        self.compile_insert(query, std::slice::from_ref(values))
    }

    fn compile_insert_using(
        &self,
        query: &Builder,
        columns: &[Column],
        sql: &str,
    ) -> QueryResult<String> {
        let table = self.wrap_table(base::table_of(query, "insert")?);
        if columns.is_empty() || columns.iter().all(|c| c.as_name() == Some("*")) {
            return Ok(format!("insert into {table} {sql}"));
        }
        Ok(format!("insert into {table} ({}) {sql}", self.columnize(columns)?))
    }

    fn compile_upsert(
        &self,
        _query: &Builder,
        _values: &[Record],
        _unique_by: &[String],
        _update: &[UpsertUpdate],
    ) -> QueryResult<String> {
        Err(QueryError::unsupported(self.name(), "upserts"))
    }

    // =========================================================================
    // Update
    // =========================================================================

    fn compile_update(&self, query: &Builder, values: &Record) -> QueryResult<String> {
        base::compile_update(self, query, values)
    }

    fn compile_update_columns(&self, _query: &Builder, values: &Record) -> QueryResult<String> {
        let columns = values
            .iter()
            .map(|(column, value)| Ok(format!("{} = {}", self.wrap_str(column)?, self.parameter(value))))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(columns.join(", "))
    }

    fn compile_update_without_joins(
        &self,
        _query: &Builder,
        table: &str,
        columns: &str,
        wheres: &str,
    ) -> QueryResult<String> {
        Ok(format!("update {table} set {columns} {wheres}"))
    }

    fn compile_update_with_joins(
        &self,
        query: &Builder,
        table: &str,
        columns: &str,
        wheres: &str,
    ) -> QueryResult<String> {
        let joins = self.compile_joins(query, &query.joins)?;
        Ok(format!("update {table} {joins} set {columns} {wheres}"))
    }

    /// Bindings for an update: join values, then the new values, then the rest.
    fn prepare_bindings_for_update(&self, bindings: &Bindings, values: &Record) -> Vec<Value> {
        base::prepare_bindings_for_update(bindings, values.values().cloned())
    }

    // =========================================================================
    // Delete and truncate
    // =========================================================================

    fn compile_delete(&self, query: &Builder) -> QueryResult<String> {
        base::compile_delete(self, query)
    }

    fn compile_delete_without_joins(
        &self,
        _query: &Builder,
        table: &str,
        wheres: &str,
    ) -> QueryResult<String> {
        Ok(format!("delete from {table} {wheres}"))
    }

    fn compile_delete_with_joins(
        &self,
        query: &Builder,
        table: &str,
        wheres: &str,
    ) -> QueryResult<String> {
        let alias = base::last_alias(table);
        let joins = self.compile_joins(query, &query.joins)?;
        Ok(format!("delete {alias} from {table} {joins} {wheres}"))
    }

    fn prepare_bindings_for_delete(&self, bindings: &Bindings) -> Vec<Value> {
        bindings.flatten_except(&[BindingType::Select])
    }

    /// One or more statements, each with its own bindings.
    fn compile_truncate(&self, query: &Builder) -> QueryResult<Vec<(String, Vec<Value>)>> {
        let table = self.wrap_table(base::table_of(query, "truncate")?);
        Ok(vec![(format!("truncate table {table}"), Vec::new())])
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    fn supports_savepoints(&self) -> bool {
        true
    }

    fn compile_savepoint(&self, name: &str) -> String {
        format!("SAVEPOINT {name}")
    }

    fn compile_savepoint_rollback(&self, name: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT {name}")
    }
}

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    Generic,
    MySql,
    Postgres,
    Sqlite,
    SqlServer,
}

impl Dialect {
    pub const ALL: [Dialect; 5] = [
        Dialect::Generic,
        Dialect::MySql,
        Dialect::Postgres,
        Dialect::Sqlite,
        Dialect::SqlServer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Generic => "generic",
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
            Dialect::SqlServer => "sqlserver",
        }
    }

    /// Build this dialect's grammar.
    pub fn grammar(&self, config: GrammarConfig) -> Arc<dyn Grammar> {
        match self {
            Dialect::Generic => Arc::new(GenericGrammar::new(config)),
            Dialect::MySql => Arc::new(MySqlGrammar::new(config)),
            Dialect::Postgres => Arc::new(PostgresGrammar::new(config)),
            Dialect::Sqlite => Arc::new(SqliteGrammar::new(config)),
            Dialect::SqlServer => Arc::new(SqlServerGrammar::new(config)),
        }
    }

    /// Build this dialect's result processor.
    pub fn processor(&self) -> Arc<dyn Processor> {
        match self {
            Dialect::Generic => Arc::new(DefaultProcessor),
            Dialect::MySql => Arc::new(MySqlProcessor),
            Dialect::Postgres => Arc::new(PostgresProcessor),
            Dialect::Sqlite => Arc::new(SqliteProcessor),
            Dialect::SqlServer => Arc::new(SqlServerProcessor),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown dialect: {s}"))
    }
}
