//! SQLite grammar.
//!
//! SQLite has no multi-table update/delete and no `limit` on them, so those
//! statements are rewritten to filter on `rowid`. Date parts go through
//! `strftime`, JSON through `json_extract` and `json_patch`.

use indexmap::IndexMap;
use serde_json::{Map, Value as Json};

use super::base;
use super::helpers;
use super::postgres::upsert_on_conflict;
use super::{Grammar, GrammarConfig};
use crate::sql::bindings::Bindings;
use crate::sql::clause::{DatePart, IndexHint, IndexHintKind, Lock, UpsertUpdate};
use crate::sql::error::QueryResult;
use crate::sql::expr::Column;
use crate::sql::query::Builder;
use crate::sql::value::{Record, Value};

/// SQLite grammar.
#[derive(Debug, Clone, Default)]
pub struct SqliteGrammar {
    config: GrammarConfig,
}

/// Update values with every `col->path` entry folded into one JSON object
/// per column, plus the names of the folded columns.
struct UpdateValues {
    values: IndexMap<String, Value>,
    json_columns: Vec<String>,
}

impl SqliteGrammar {
    pub fn new(config: GrammarConfig) -> Self {
        Self { config }
    }

    fn group_json_columns_for_update(&self, values: &Record) -> UpdateValues {
        let mut plain = IndexMap::new();
        let mut groups: IndexMap<String, Json> = IndexMap::new();

        for (key, value) in values {
            let Some((column, path)) = key.split_once("->") else {
                plain.insert(key.clone(), value.clone());
                continue;
            };
            let group = groups
                .entry(column.to_string())
                .or_insert_with(|| Json::Object(Map::new()));
            set_json_path(group, path.split("->"), value.to_json());
        }

        let json_columns = groups.keys().cloned().collect();
        for (column, group) in groups {
            plain.insert(column, Value::Json(group));
        }
        UpdateValues {
            values: plain,
            json_columns,
        }
    }
}

/// Assign `value` at the nested `path`, creating objects along the way.
fn set_json_path<'a>(target: &mut Json, mut path: impl Iterator<Item = &'a str>, value: Json) {
    let Some(key) = path.next() else {
        *target = value;
        return;
    };
    if !target.is_object() {
        *target = Json::Object(Map::new());
    }
    if let Json::Object(map) = target {
        let child = map.entry(key.to_string()).or_insert(Json::Null);
        set_json_path(child, path, value);
    }
}

impl Grammar for SqliteGrammar {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn config(&self) -> &GrammarConfig {
        &self.config
    }

    fn wrap_json_selector(&self, value: &str) -> QueryResult<String> {
        let (field, path) = base::wrap_json_field_and_path(self, value)?;
        Ok(format!("json_extract({field}{path})"))
    }

    fn where_date_based(
        &self,
        _query: &Builder,
        part: DatePart,
        column: &Column,
        operator: &str,
        value: &Value,
    ) -> QueryResult<String> {
        let format = match part {
            DatePart::Date => "%Y-%m-%d",
            DatePart::Day => "%d",
            DatePart::Month => "%m",
            DatePart::Year => "%Y",
            DatePart::Time => "%H:%M:%S",
        };
        Ok(format!(
            "strftime('{format}', {}) {operator} cast({} as text)",
            self.wrap(column)?,
            self.parameter(value)
        ))
    }

    fn compile_index_hint(&self, _query: &Builder, hint: &IndexHint) -> QueryResult<String> {
        Ok(match hint.kind {
            IndexHintKind::Force => format!("indexed by {}", hint.index),
            IndexHintKind::Use | IndexHintKind::Ignore => String::new(),
        })
    }

    fn compile_json_contains(&self, column: &str, value: &str) -> QueryResult<String> {
        let (field, path) = base::wrap_json_field_and_path(self, column)?;
        Ok(format!(
            "exists (select 1 from json_each({field}{path}) where {} is {value})",
            self.wrap_str("json_each.value")?
        ))
    }

    // json_each yields scalars, so the value is compared as-is.
    fn prepare_binding_for_json_contains(&self, value: Value) -> Value {
        value
    }

    fn compile_json_length(&self, column: &str, operator: &str, value: &str) -> QueryResult<String> {
        let (field, path) = base::wrap_json_field_and_path(self, column)?;
        Ok(format!("json_array_length({field}{path}) {operator} {value}"))
    }

    fn compile_lock(&self, _query: &Builder, _lock: &Lock) -> String {
        String::new()
    }

    fn wrap_union(&self, sql: &str) -> String {
        format!("select * from ({sql})")
    }

    fn compile_insert_or_ignore(&self, query: &Builder, values: &[Record]) -> QueryResult<String> {
        Ok(self
            .compile_insert(query, values)?
            .replacen("insert", "insert or ignore", 1))
    }

    fn compile_upsert(
        &self,
        query: &Builder,
        values: &[Record],
        unique_by: &[String],
        update: &[UpsertUpdate],
    ) -> QueryResult<String> {
        upsert_on_conflict(self, query, values, unique_by, update)
    }

    fn compile_update(&self, query: &Builder, values: &Record) -> QueryResult<String> {
        if query.joins.is_empty() && query.limit.is_none() {
            return base::compile_update(self, query, values);
        }
        let table = self.wrap_table(base::table_of(query, "update")?);
        let columns = self.compile_update_columns(query, values)?;
        let select = base::row_id_subselect(self, query, "rowid")?;
        Ok(format!(
            "update {table} set {columns} where {} in ({select})",
            self.wrap_str("rowid")?
        ))
    }

    fn compile_update_columns(&self, _query: &Builder, values: &Record) -> QueryResult<String> {
        let grouped = self.group_json_columns_for_update(values);
        let columns = grouped
            .values
            .iter()
            .map(|(key, value)| {
                let column = key.rsplit('.').next().unwrap_or(key);
                let wrapped = self.wrap_str(column)?;
                if grouped.json_columns.contains(key) {
                    Ok(format!(
                        "{wrapped} = json_patch(ifnull({wrapped}, json('{{}}')), json(?))"
                    ))
                } else {
                    Ok(format!("{wrapped} = {}", self.parameter(value)))
                }
            })
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(columns.join(", "))
    }

    fn prepare_bindings_for_update(&self, bindings: &Bindings, values: &Record) -> Vec<Value> {
        let grouped = self.group_json_columns_for_update(values);
        base::prepare_values_then_bindings(bindings, grouped.values.into_values())
    }

    fn compile_delete(&self, query: &Builder) -> QueryResult<String> {
        if query.joins.is_empty() && query.limit.is_none() {
            return base::compile_delete(self, query);
        }
        let table = self.wrap_table(base::table_of(query, "delete")?);
        let select = base::row_id_subselect(self, query, "rowid")?;
        Ok(format!(
            "delete from {table} where {} in ({select})",
            self.wrap_str("rowid")?
        ))
    }

    // Resetting the autoincrement counter needs its own statement.
    fn compile_truncate(&self, query: &Builder) -> QueryResult<Vec<(String, Vec<Value>)>> {
        let table = base::table_of(query, "truncate")?;
        let name = format!("{}{}", self.table_prefix(), table.text());
        Ok(vec![
            (
                "delete from sqlite_sequence where name = ?".to_string(),
                vec![Value::Text(name)],
            ),
            (format!("delete from {}", self.wrap_table(table)), Vec::new()),
        ])
    }
}
