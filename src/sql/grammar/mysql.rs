//! MySQL / MariaDB grammar.
//!
//! MySQL differences from the generic grammar:
//! - Backtick identifier quoting
//! - JSON paths through `json_extract` / `json_unquote`, updates through `json_set`
//! - `match ... against` full-text predicates
//! - `insert ignore` and `on duplicate key update`
//! - `order by` / `limit` allowed on single-table update and delete
//! - `for update` / `lock in share mode`

use super::base;
use super::helpers;
use super::{Grammar, GrammarConfig};
use crate::sql::bindings::Bindings;
use crate::sql::clause::{FullTextOptions, IndexHint, IndexHintKind, Lock, UpsertUpdate};
use crate::sql::error::QueryResult;
use crate::sql::expr::Column;
use crate::sql::query::Builder;
use crate::sql::value::{Record, Value};

const UPSERT_ALIAS: &str = "upsert_alias";

/// MySQL grammar.
#[derive(Debug, Clone, Default)]
pub struct MySqlGrammar {
    config: GrammarConfig,
}

impl MySqlGrammar {
    pub fn new(config: GrammarConfig) -> Self {
        Self { config }
    }

    fn compile_json_update_column(&self, key: &str, value: &Value) -> QueryResult<String> {
        let value = match value {
            Value::Bool(b) => helpers::format_bool_literal(*b).to_string(),
            Value::Json(json) if json.is_array() || json.is_object() => "cast(? as json)".to_string(),
            other => self.parameter(other),
        };
        let (field, path) = base::wrap_json_field_and_path(self, key)?;
        Ok(format!("{field} = json_set({field}{path}, {value})"))
    }

    /// Append `order by` and `limit` to single-table update/delete.
    fn append_order_and_limit(&self, query: &Builder, sql: String) -> QueryResult<String> {
        let mut sql = sql.trim_end().to_string();
        if !query.orders.is_empty() {
            sql.push(' ');
            sql.push_str(&self.compile_orders(query, &query.orders)?);
        }
        if let Some(limit) = query.limit {
            sql.push(' ');
            sql.push_str(&self.compile_limit(query, limit));
        }
        Ok(sql)
    }
}

impl Grammar for MySqlGrammar {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn config(&self) -> &GrammarConfig {
        &self.config
    }

    fn wrap_value(&self, value: &str) -> String {
        if value == "*" {
            return value.to_string();
        }
        helpers::quote_backtick(value)
    }

    fn operators(&self) -> &'static [&'static str] {
        &["sounds like"]
    }

    fn wrap_json_selector(&self, value: &str) -> QueryResult<String> {
        let (field, path) = base::wrap_json_field_and_path(self, value)?;
        Ok(format!("json_unquote(json_extract({field}{path}))"))
    }

    fn wrap_json_boolean_selector(&self, value: &str) -> QueryResult<String> {
        let (field, path) = base::wrap_json_field_and_path(self, value)?;
        Ok(format!("json_extract({field}{path})"))
    }

    // SQL NULL and JSON null are different things inside a document.
    fn where_null(&self, _query: &Builder, column: &Column, not: bool) -> QueryResult<String> {
        let Some(name) = column.as_name().filter(|n| helpers::is_json_selector(n)) else {
            return base::where_null(self, column, not);
        };
        let (field, path) = base::wrap_json_field_and_path(self, name)?;
        if not {
            Ok(format!(
                "(json_extract({field}{path}) is not null AND json_type(json_extract({field}{path})) != 'NULL')"
            ))
        } else {
            Ok(format!(
                "(json_extract({field}{path}) is null OR json_type(json_extract({field}{path})) = 'NULL')"
            ))
        }
    }

    fn compile_index_hint(&self, _query: &Builder, hint: &IndexHint) -> QueryResult<String> {
        Ok(match hint.kind {
            IndexHintKind::Use => format!("use index ({})", hint.index),
            IndexHintKind::Force => format!("force index ({})", hint.index),
            IndexHintKind::Ignore => format!("ignore index ({})", hint.index),
        })
    }

    fn where_full_text(
        &self,
        _query: &Builder,
        columns: &[Column],
        value: &str,
        options: &FullTextOptions,
    ) -> QueryResult<String> {
        let columns = self.columnize(columns)?;
        let boolean_mode = options.mode.as_deref() == Some("boolean");
        let mode = if boolean_mode {
            " in boolean mode"
        } else {
            " in natural language mode"
        };
        let expanded = if options.expanded && !boolean_mode {
            " with query expansion"
        } else {
            ""
        };
        let value = self.parameter(&Value::Text(value.to_string()));
        Ok(format!("match ({columns}) against ({value}{mode}{expanded})"))
    }

    fn compile_json_contains(&self, column: &str, value: &str) -> QueryResult<String> {
        let (field, path) = base::wrap_json_field_and_path(self, column)?;
        Ok(format!("json_contains({field}, {value}{path})"))
    }

    fn compile_json_length(&self, column: &str, operator: &str, value: &str) -> QueryResult<String> {
        let (field, path) = base::wrap_json_field_and_path(self, column)?;
        Ok(format!("json_length({field}{path}) {operator} {value}"))
    }

    fn compile_random(&self, seed: &str) -> String {
        format!("RAND({seed})")
    }

    fn compile_lock(&self, _query: &Builder, lock: &Lock) -> String {
        match lock {
            Lock::Update => "for update".to_string(),
            Lock::Shared => "lock in share mode".to_string(),
            Lock::Raw(sql) => sql.clone(),
        }
    }

    fn compile_insert(&self, query: &Builder, values: &[Record]) -> QueryResult<String> {
        if values.iter().all(Record::is_empty) {
            let table = self.wrap_table(base::table_of(query, "insert")?);
            return Ok(format!("insert into {table} () values ()"));
        }
        base::compile_insert(self, query, values)
    }

    fn compile_insert_or_ignore(&self, query: &Builder, values: &[Record]) -> QueryResult<String> {
        Ok(self
            .compile_insert(query, values)?
            .replacen("insert", "insert ignore", 1))
    }

    fn compile_upsert(
        &self,
        query: &Builder,
        values: &[Record],
        _unique_by: &[String],
        update: &[UpsertUpdate],
    ) -> QueryResult<String> {
        let use_alias = self.config.use_upsert_alias;
        let mut sql = self.compile_insert(query, values)?;
        if use_alias {
            sql.push_str(&format!(" as {}", self.wrap_value(UPSERT_ALIAS)));
        }
        sql.push_str(" on duplicate key update ");

        let columns = update
            .iter()
            .map(|entry| match entry {
                UpsertUpdate::Value(column, value) => {
                    Ok(format!("{} = {}", self.wrap_str(column)?, self.parameter(value)))
                }
                UpsertUpdate::Column(column) => {
                    let wrapped = self.wrap_str(column)?;
                    if use_alias {
                        Ok(format!(
                            "{wrapped} = {}.{wrapped}",
                            self.wrap_value(UPSERT_ALIAS)
                        ))
                    } else {
                        Ok(format!("{wrapped} = values({wrapped})"))
                    }
                }
            })
            .collect::<QueryResult<Vec<_>>>()?;

        sql.push_str(&columns.join(", "));
        Ok(sql)
    }

    fn compile_update_columns(&self, _query: &Builder, values: &Record) -> QueryResult<String> {
        let columns = values
            .iter()
            .map(|(column, value)| {
                if helpers::is_json_selector(column) {
                    self.compile_json_update_column(column, value)
                } else {
                    Ok(format!("{} = {}", self.wrap_str(column)?, self.parameter(value)))
                }
            })
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(columns.join(", "))
    }

    fn compile_update_without_joins(
        &self,
        query: &Builder,
        table: &str,
        columns: &str,
        wheres: &str,
    ) -> QueryResult<String> {
        let sql = format!("update {table} set {columns} {wheres}");
        self.append_order_and_limit(query, sql)
    }

    // JSON booleans are inlined by `compile_json_update_column`.
    fn prepare_bindings_for_update(&self, bindings: &Bindings, values: &Record) -> Vec<Value> {
        let values = values
            .iter()
            .filter(|(column, value)| {
                !(helpers::is_json_selector(column) && matches!(value, Value::Bool(_)))
            })
            .map(|(_, value)| value.clone());
        base::prepare_bindings_for_update(bindings, values)
    }

    fn compile_delete_without_joins(
        &self,
        query: &Builder,
        table: &str,
        wheres: &str,
    ) -> QueryResult<String> {
        let sql = format!("delete from {table} {wheres}");
        self.append_order_and_limit(query, sql)
    }
}
