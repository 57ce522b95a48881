//! SQL Server grammar.
//!
//! SQL Server has no `limit`/`offset`. A plain limit becomes `top N`; an
//! offset rewrites the select into a `row_number()` window filtered on the
//! row number. Locks are table hints on the `from` clause.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use super::base;
use super::helpers;
use super::{Grammar, GrammarConfig};
use crate::sql::bindings::{BindingType, Bindings};
use crate::sql::clause::{Component, DatePart, IndexHint, IndexHintKind, Lock, UpsertUpdate};
use crate::sql::error::QueryResult;
use crate::sql::expr::{self, Column};
use crate::sql::query::Builder;
use crate::sql::value::{Record, Value};

/// `[dbo].[fn(1, 2)]` → `[dbo].[fn](1, 2)`
static TABLE_VALUED_FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)(\(.*?\))]$").unwrap());

const MERGE_SOURCE: &str = "merge_source";

/// The row number window sits in the column list, so order bindings move
/// ahead of everything after `select`.
const OFFSET_BINDING_ORDER: [BindingType; 9] = [
    BindingType::Select,
    BindingType::Order,
    BindingType::From,
    BindingType::Join,
    BindingType::Where,
    BindingType::GroupBy,
    BindingType::Having,
    BindingType::Union,
    BindingType::UnionOrder,
];

/// A paged union orders its window ahead of the whole union.
const UNION_PAGING_BINDING_ORDER: [BindingType; 9] = [
    BindingType::UnionOrder,
    BindingType::Select,
    BindingType::From,
    BindingType::Join,
    BindingType::Where,
    BindingType::GroupBy,
    BindingType::Having,
    BindingType::Order,
    BindingType::Union,
];

const UNION_PAGING_OFFSET_BINDING_ORDER: [BindingType; 9] = [
    BindingType::UnionOrder,
    BindingType::Select,
    BindingType::Order,
    BindingType::From,
    BindingType::Join,
    BindingType::Where,
    BindingType::GroupBy,
    BindingType::Having,
    BindingType::Union,
];

/// SQL Server grammar.
#[derive(Debug, Clone, Default)]
pub struct SqlServerGrammar {
    config: GrammarConfig,
}

impl SqlServerGrammar {
    pub fn new(config: GrammarConfig) -> Self {
        Self { config }
    }

    fn has_offset(query: &Builder) -> bool {
        query.offset.is_some_and(|offset| offset > 0)
    }

    fn has_union_paging(query: &Builder) -> bool {
        !query.unions.is_empty()
            && (query.union_limit.is_some_and(|limit| limit > 0)
                || query.union_offset.is_some_and(|offset| offset > 0))
    }

    /// Whether the row number rewrite runs for this query, either directly
    /// or on the derived table of a union/having aggregate.
    fn is_paged(query: &Builder) -> bool {
        query.aggregate.is_none() || !query.unions.is_empty() || !query.havings.is_empty()
    }

    /// Emulate `offset` with `row_number() over (...)`.
    fn compile_ansi_offset(
        &self,
        query: &Builder,
        mut components: IndexMap<Component, String>,
    ) -> QueryResult<String> {
        let orders = components
            .shift_remove(&Component::Orders)
            .unwrap_or_else(|| "order by (select 0)".to_string());
        if let Some(columns) = components.get_mut(&Component::Columns) {
            columns.push_str(&format!(", row_number() over ({orders}) as row_num"));
        }
        let sql = base::concatenate(&components);
        Ok(format!(
            "select * from ({sql}) as temp_table where row_num {} order by row_num",
            Self::compile_row_constraint(query.offset.unwrap_or(0), query.limit)
        ))
    }

    /// Page a whole union through the same row number filter.
    fn compile_union_paging(&self, query: &Builder, sql: &str) -> QueryResult<String> {
        let orders = if query.union_orders.is_empty() {
            "order by (select 0)".to_string()
        } else {
            self.compile_orders(query, &query.union_orders)?
        };
        Ok(format!(
            "select * from (select *, row_number() over ({orders}) as row_num from ({sql}) as {}) as temp_table where row_num {} order by row_num",
            self.wrap_table(&Column::from("temp_table")),
            Self::compile_row_constraint(query.union_offset.unwrap_or(0), query.union_limit)
        ))
    }

    fn compile_row_constraint(offset: u64, limit: Option<u64>) -> String {
        let start = offset.saturating_add(1);
        match limit.filter(|limit| *limit > 0) {
            Some(limit) => format!("between {start} and {}", offset.saturating_add(limit)),
            None => format!(">= {start}"),
        }
    }
}

impl Grammar for SqlServerGrammar {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn config(&self) -> &GrammarConfig {
        &self.config
    }

    fn wrap_value(&self, value: &str) -> String {
        if value == "*" {
            return value.to_string();
        }
        helpers::quote_bracket(value)
    }

    fn wrap_table(&self, table: &Column) -> String {
        let wrapped = base::wrap_table(self, table);
        if table.is_raw() {
            return wrapped;
        }
        TABLE_VALUED_FUNCTION
            .replace(&wrapped, "$1]$2")
            .into_owned()
    }

    fn operators(&self) -> &'static [&'static str] {
        &["!<", "!>", "&=", "|=", "^="]
    }

    fn bitwise_operators(&self) -> &'static [&'static str] {
        &["&=", "|=", "^="]
    }

    fn date_format(&self) -> &'static str {
        "%Y-%m-%d %H:%M:%S%.3f"
    }

    fn escape_binary(&self, bytes: &[u8]) -> String {
        format!("0x{}", helpers::hex(bytes))
    }

    fn wrap_json_selector(&self, value: &str) -> QueryResult<String> {
        let (field, path) = base::wrap_json_field_and_path(self, value)?;
        Ok(format!("json_value({field}{path})"))
    }

    fn wrap_json_boolean_value(&self, value: &str) -> String {
        format!("'{value}'")
    }

    fn compile_select(&self, query: &Builder) -> QueryResult<String> {
        // An aggregate has no column list to carry the window; union and
        // having aggregates page their derived table instead.
        if query.aggregate.is_some() {
            return base::compile_select(self, query);
        }
        let sql = if Self::has_offset(query) {
            let components = self.compile_components(query)?;
            let sql = self.compile_ansi_offset(query, components)?;
            if query.unions.is_empty() {
                sql
            } else {
                format!("{} {}", self.wrap_union(&sql), self.compile_unions(query)?)
            }
        } else {
            base::compile_select(self, query)?
        };
        if Self::has_union_paging(query) {
            return self.compile_union_paging(query, &sql);
        }
        Ok(sql)
    }

    fn compile_columns(&self, query: &Builder, columns: &[Column]) -> QueryResult<String> {
        let mut select = if query.distinct.is_distinct() {
            "select distinct ".to_string()
        } else {
            "select ".to_string()
        };
        if let Some(limit) = query.limit.filter(|limit| *limit > 0) {
            if !Self::has_offset(query) {
                select.push_str(&format!("top {limit} "));
            }
        }
        Ok(format!("{select}{}", self.columnize(columns)?))
    }

    fn compile_from(&self, query: &Builder, table: &Column) -> QueryResult<String> {
        let from = format!("from {}", self.wrap_table(table));
        Ok(match &query.lock {
            Some(Lock::Update) => format!("{from} with(rowlock,updlock,holdlock)"),
            Some(Lock::Shared) => format!("{from} with(rowlock,holdlock)"),
            Some(Lock::Raw(sql)) => format!("{from} {sql}"),
            None => from,
        })
    }

    fn compile_index_hint(&self, _query: &Builder, hint: &IndexHint) -> QueryResult<String> {
        Ok(match hint.kind {
            IndexHintKind::Force => format!("with (index({}))", hint.index),
            IndexHintKind::Use | IndexHintKind::Ignore => String::new(),
        })
    }

    fn where_bitwise(
        &self,
        _query: &Builder,
        column: &Column,
        operator: &str,
        value: &Value,
    ) -> QueryResult<String> {
        Ok(format!(
            "({} {} {}) != 0",
            self.wrap(column)?,
            operator,
            self.parameter(value)
        ))
    }

    fn where_date_based(
        &self,
        _query: &Builder,
        part: DatePart,
        column: &Column,
        operator: &str,
        value: &Value,
    ) -> QueryResult<String> {
        match part {
            DatePart::Date | DatePart::Time => Ok(format!(
                "cast({} as {}) {operator} {}",
                self.wrap(column)?,
                part.as_str(),
                self.parameter(value)
            )),
            _ => base::where_date_based(self, part, column, operator, value),
        }
    }

    fn compile_json_contains(&self, column: &str, value: &str) -> QueryResult<String> {
        let (field, path) = base::wrap_json_field_and_path(self, column)?;
        Ok(format!("{value} in (select [value] from openjson({field}{path}))"))
    }

    // openjson yields booleans as the strings `true` / `false`.
    fn prepare_binding_for_json_contains(&self, value: Value) -> Value {
        match value {
            Value::Bool(b) => Value::Text(helpers::format_bool_literal(b).to_string()),
            other => other,
        }
    }

    fn compile_json_length(&self, column: &str, operator: &str, value: &str) -> QueryResult<String> {
        let (field, path) = base::wrap_json_field_and_path(self, column)?;
        Ok(format!(
            "(select count(*) from openjson({field}{path})) {operator} {value}"
        ))
    }

    fn compile_random(&self, _seed: &str) -> String {
        "NEWID()".to_string()
    }

    fn compile_limit(&self, _query: &Builder, _limit: u64) -> String {
        String::new()
    }

    fn compile_offset(&self, _query: &Builder, _offset: u64) -> String {
        String::new()
    }

    fn compile_lock(&self, _query: &Builder, _lock: &Lock) -> String {
        String::new()
    }

    /// Union limit and offset are applied by the row number wrapper, and a
    /// paged union's orders move into its window.
    fn compile_unions(&self, query: &Builder) -> QueryResult<String> {
        let mut sql = String::new();
        for union in &query.unions {
            sql.push_str(&self.compile_union(union)?);
        }
        if !query.union_orders.is_empty() && !Self::has_union_paging(query) {
            sql.push(' ');
            sql.push_str(&self.compile_orders(query, &query.union_orders)?);
        }
        Ok(sql.trim_start().to_string())
    }

    fn wrap_union(&self, sql: &str) -> String {
        format!(
            "select * from ({sql}) as {}",
            self.wrap_table(&Column::from("temp_table"))
        )
    }

    fn compile_exists(&self, query: &Builder) -> QueryResult<String> {
        let mut exists = query.clone();
        exists.columns = Some(vec![Column::from(expr::raw("1 [exists]"))]);
        exists.limit = Some(1);
        self.compile_select(&exists)
    }

    fn select_binding_order(&self, query: &Builder) -> &'static [BindingType] {
        if !Self::is_paged(query) {
            return &BindingType::ALL;
        }
        match (Self::has_offset(query), Self::has_union_paging(query)) {
            (true, true) => &UNION_PAGING_OFFSET_BINDING_ORDER,
            (true, false) => &OFFSET_BINDING_ORDER,
            (false, true) => &UNION_PAGING_BINDING_ORDER,
            (false, false) => &BindingType::ALL,
        }
    }

    fn compile_upsert(
        &self,
        query: &Builder,
        values: &[Record],
        unique_by: &[String],
        update: &[UpsertUpdate],
    ) -> QueryResult<String> {
        let from = base::table_of(query, "upsert")?;
        let columns = base::insert_columns(values);
        let columnized = base::columnize_names(self, &columns)?;

        let mut sql = format!("merge {} ", self.wrap_table(from));
        sql.push_str(&format!(
            "using (values {}) {} ({columnized}) ",
            base::parameterize_records(self, values, &columns)?,
            self.wrap_table(&Column::from(MERGE_SOURCE))
        ));

        let on = unique_by
            .iter()
            .map(|column| {
                Ok(format!(
                    "{} = {}",
                    self.wrap_str(&format!("{MERGE_SOURCE}.{column}"))?,
                    self.wrap_str(&format!("{}.{column}", from.text()))?
                ))
            })
            .collect::<QueryResult<Vec<_>>>()?;
        sql.push_str(&format!("on {} ", on.join(" and ")));

        if !update.is_empty() {
            let sets = update
                .iter()
                .map(|entry| match entry {
                    UpsertUpdate::Column(column) => Ok(format!(
                        "{} = {}",
                        self.wrap_str(column)?,
                        self.wrap_str(&format!("{MERGE_SOURCE}.{column}"))?
                    )),
                    UpsertUpdate::Value(column, value) => {
                        Ok(format!("{} = {}", self.wrap_str(column)?, self.parameter(value)))
                    }
                })
                .collect::<QueryResult<Vec<_>>>()?;
            sql.push_str(&format!("when matched then update set {} ", sets.join(", ")));
        }

        sql.push_str(&format!(
            "when not matched then insert ({columnized}) values ({columnized});"
        ));
        Ok(sql)
    }

    fn compile_update_with_joins(
        &self,
        query: &Builder,
        table: &str,
        columns: &str,
        wheres: &str,
    ) -> QueryResult<String> {
        let alias = base::last_alias(table);
        let joins = self.compile_joins(query, &query.joins)?;
        Ok(format!("update {alias} set {columns} from {table} {joins} {wheres}"))
    }

    fn prepare_bindings_for_update(&self, bindings: &Bindings, values: &Record) -> Vec<Value> {
        base::prepare_values_then_bindings(bindings, values.values().cloned())
    }

    fn compile_delete_without_joins(
        &self,
        query: &Builder,
        table: &str,
        wheres: &str,
    ) -> QueryResult<String> {
        let sql = format!("delete from {table} {wheres}");
        match query.limit.filter(|limit| *limit > 0) {
            Some(limit) if !Self::has_offset(query) => {
                Ok(sql.replacen("delete", &format!("delete top ({limit})"), 1))
            }
            _ => Ok(sql),
        }
    }

    fn compile_savepoint(&self, name: &str) -> String {
        format!("SAVE TRANSACTION {name}")
    }

    fn compile_savepoint_rollback(&self, name: &str) -> String {
        format!("ROLLBACK TRANSACTION {name}")
    }
}
