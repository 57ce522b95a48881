//! PostgreSQL grammar.
//!
//! PostgreSQL differences from the generic grammar:
//! - `::type` casts for date/time predicates and `like` operands
//! - `->` / `->>` JSON selectors, `jsonb` containment and `jsonb_set` updates
//! - `distinct on (...)`
//! - `returning` for inserted ids, `on conflict` for ignore/upsert
//! - Update/delete with joins or limit rewritten over `ctid`

use super::base;
use super::helpers;
use super::{Grammar, GrammarConfig};
use crate::sql::bindings::Bindings;
use crate::sql::clause::{DatePart, Distinct, FullTextOptions, Lock, UpsertUpdate};
use crate::sql::error::QueryResult;
use crate::sql::expr::Column;
use crate::sql::query::Builder;
use crate::sql::value::{Record, Value};

/// Text search configurations accepted by `where_full_text`; anything else
/// falls back to `english`.
const FULL_TEXT_LANGUAGES: &[&str] = &[
    "simple",
    "arabic",
    "danish",
    "dutch",
    "english",
    "finnish",
    "french",
    "german",
    "hungarian",
    "indonesian",
    "irish",
    "italian",
    "lithuanian",
    "nepali",
    "norwegian",
    "portuguese",
    "romanian",
    "russian",
    "spanish",
    "swedish",
    "tamil",
    "turkish",
];

/// PostgreSQL grammar.
#[derive(Debug, Clone, Default)]
pub struct PostgresGrammar {
    config: GrammarConfig,
}

impl PostgresGrammar {
    pub fn new(config: GrammarConfig) -> Self {
        Self { config }
    }

    /// Quote non-numeric path attributes, splitting `key[0]` into `key`, `0`.
    fn wrap_json_path_attributes(&self, path: &[&str], quote: &str) -> Vec<String> {
        path.iter()
            .flat_map(|attribute| helpers::parse_json_path_array_keys(attribute))
            .map(|attribute| {
                if attribute.parse::<i64>().is_ok() {
                    attribute
                } else {
                    format!("{quote}{attribute}{quote}")
                }
            })
            .collect()
    }

    fn compile_json_update_column(&self, key: &str, value: &Value) -> QueryResult<String> {
        let mut segments = key.split("->");
        let field = self.wrap_str(segments.next().unwrap_or(key))?;
        let rest: Vec<&str> = segments.collect();
        let path = format!("'{{{}}}'", self.wrap_json_path_attributes(&rest, "\"").join(","));
        Ok(format!(
            "{field} = jsonb_set({field}::jsonb, {path}, {})",
            self.parameter(value)
        ))
    }

    /// Selector with the final `->>` turned into `->`, keeping the jsonb type.
    fn wrap_jsonb(&self, column: &str) -> QueryResult<String> {
        Ok(self.wrap_str(column)?.replace("->>", "->"))
    }
}

impl Grammar for PostgresGrammar {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn config(&self) -> &GrammarConfig {
        &self.config
    }

    fn operators(&self) -> &'static [&'static str] {
        &[
            "=", "<", ">", "<=", ">=", "<>", "!=", "like", "not like", "between", "ilike",
            "not ilike", "~", "&", "|", "#", "<<", ">>", "<<=", ">>=", "&&", "@>", "<@", "?",
            "?|", "?&", "||", "-", "@?", "@@", "#-", "is distinct from", "is not distinct from",
        ]
    }

    fn bitwise_operators(&self) -> &'static [&'static str] {
        &["~", "&", "|", "#", "<<", ">>", "<<=", ">>="]
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn escape_binary(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'::bytea", helpers::hex(bytes))
    }

    fn wrap_json_selector(&self, value: &str) -> QueryResult<String> {
        let mut parts = value.split("->");
        let field = base::wrap_segments(self, parts.next().unwrap_or(value));
        let path: Vec<&str> = parts.collect();
        let mut wrapped = self.wrap_json_path_attributes(&path, "'");
        let attribute = wrapped.pop().unwrap_or_default();
        if wrapped.is_empty() {
            Ok(format!("{field}->>{attribute}"))
        } else {
            Ok(format!("{field}->{}->>{attribute}", wrapped.join("->")))
        }
    }

    fn wrap_json_boolean_selector(&self, value: &str) -> QueryResult<String> {
        let selector = self.wrap_json_selector(value)?.replace("->>", "->");
        Ok(format!("({selector})::jsonb"))
    }

    fn wrap_json_boolean_value(&self, value: &str) -> String {
        format!("'{value}'::jsonb")
    }

    fn where_basic(
        &self,
        _query: &Builder,
        column: &Column,
        operator: &str,
        value: &Value,
    ) -> QueryResult<String> {
        if operator.to_lowercase().contains("like") {
            return Ok(format!(
                "{}::text {} {}",
                self.wrap(column)?,
                operator,
                self.parameter(value)
            ));
        }
        base::where_basic(self, column, operator, value)
    }

    fn where_bitwise(
        &self,
        _query: &Builder,
        column: &Column,
        operator: &str,
        value: &Value,
    ) -> QueryResult<String> {
        Ok(format!(
            "({} {} {})::bool",
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
        let mut wrapped = self.wrap(column)?;
        let value = self.parameter(value);
        match part {
            DatePart::Date | DatePart::Time => {
                if column.as_name().is_some_and(helpers::is_json_selector) {
                    wrapped = format!("({wrapped})");
                }
                Ok(format!("{wrapped}::{} {operator} {value}", part.as_str()))
            }
            DatePart::Day | DatePart::Month | DatePart::Year => Ok(format!(
                "extract({} from {wrapped}) {operator} {value}",
                part.as_str()
            )),
        }
    }

    fn where_full_text(
        &self,
        _query: &Builder,
        columns: &[Column],
        value: &str,
        options: &FullTextOptions,
    ) -> QueryResult<String> {
        let language = options
            .language
            .as_deref()
            .filter(|lang| FULL_TEXT_LANGUAGES.contains(lang))
            .unwrap_or("english");

        let vectors = columns
            .iter()
            .map(|column| Ok(format!("to_tsvector('{language}', {})", self.wrap(column)?)))
            .collect::<QueryResult<Vec<_>>>()?
            .join(" || ");

        let mode = match options.mode.as_deref() {
            Some("phrase") => "phraseto_tsquery",
            Some("websearch") => "websearch_to_tsquery",
            _ => "plainto_tsquery",
        };

        let value = self.parameter(&Value::Text(value.to_string()));
        Ok(format!("({vectors}) @@ {mode}('{language}', {value})"))
    }

    fn compile_json_contains(&self, column: &str, value: &str) -> QueryResult<String> {
        Ok(format!("({})::jsonb @> {value}", self.wrap_jsonb(column)?))
    }

    fn compile_json_length(&self, column: &str, operator: &str, value: &str) -> QueryResult<String> {
        Ok(format!(
            "jsonb_array_length(({})::jsonb) {operator} {value}",
            self.wrap_jsonb(column)?
        ))
    }

    fn compile_columns(&self, query: &Builder, columns: &[Column]) -> QueryResult<String> {
        let select = match &query.distinct {
            Distinct::Columns(on) => format!("select distinct on ({}) ", self.columnize(on)?),
            Distinct::All => "select distinct ".to_string(),
            Distinct::None => "select ".to_string(),
        };
        Ok(format!("{select}{}", self.columnize(columns)?))
    }

    fn compile_lock(&self, _query: &Builder, lock: &Lock) -> String {
        match lock {
            Lock::Update => "for update".to_string(),
            Lock::Shared => "for share".to_string(),
            Lock::Raw(sql) => sql.clone(),
        }
    }

    fn compile_insert_or_ignore(&self, query: &Builder, values: &[Record]) -> QueryResult<String> {
        Ok(format!(
            "{} on conflict do nothing",
            self.compile_insert(query, values)?
        ))
    }

    fn compile_insert_get_id(
        &self,
        query: &Builder,
        values: &Record,
        sequence: Option<&str>,
    ) -> QueryResult<String> {
        Ok(format!(
            "{} returning {}",
            self.compile_insert(query, std::slice::from_ref(values))?,
            self.wrap_str(sequence.unwrap_or("id"))?
        ))
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
        let select = base::row_id_subselect(self, query, "ctid")?;
        Ok(format!(
            "update {table} set {columns} where {} in ({select})",
            self.wrap_str("ctid")?
        ))
    }

    fn compile_update_columns(&self, _query: &Builder, values: &Record) -> QueryResult<String> {
        let columns = values
            .iter()
            .map(|(key, value)| {
                let column = key.rsplit('.').next().unwrap_or(key);
                if helpers::is_json_selector(key) {
                    self.compile_json_update_column(column, value)
                } else {
                    Ok(format!("{} = {}", self.wrap_str(column)?, self.parameter(value)))
                }
            })
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(columns.join(", "))
    }

    // jsonb_set expects a JSON document, so scalar values are encoded.
    fn prepare_bindings_for_update(&self, bindings: &Bindings, values: &Record) -> Vec<Value> {
        let values = values.iter().map(|(column, value)| {
            if helpers::is_json_selector(column) && !value.is_raw() {
                Value::Text(value.to_json().to_string())
            } else {
                value.clone()
            }
        });
        base::prepare_values_then_bindings(bindings, values)
    }

    fn compile_delete(&self, query: &Builder) -> QueryResult<String> {
        if query.joins.is_empty() && query.limit.is_none() {
            return base::compile_delete(self, query);
        }
        let table = self.wrap_table(base::table_of(query, "delete")?);
        let select = base::row_id_subselect(self, query, "ctid")?;
        Ok(format!(
            "delete from {table} where {} in ({select})",
            self.wrap_str("ctid")?
        ))
    }

    fn compile_truncate(&self, query: &Builder) -> QueryResult<Vec<(String, Vec<Value>)>> {
        let table = self.wrap_table(base::table_of(query, "truncate")?);
        Ok(vec![(
            format!("truncate {table} restart identity cascade"),
            Vec::new(),
        )])
    }
}

/// `insert ... on conflict (keys) do update set ...`, shared with SQLite.
pub(super) fn upsert_on_conflict<G: Grammar + ?Sized>(
    g: &G,
    query: &Builder,
    values: &[Record],
    unique_by: &[String],
    update: &[UpsertUpdate],
) -> QueryResult<String> {
    let mut sql = g.compile_insert(query, values)?;
    sql.push_str(&format!(
        " on conflict ({}) do update set ",
        base::columnize_names(g, unique_by)?
    ));
    let columns = update
        .iter()
        .map(|entry| match entry {
            UpsertUpdate::Column(column) => {
                let wrapped = g.wrap_str(column)?;
                Ok(format!("{wrapped} = {}.{wrapped}", g.wrap_value("excluded")))
            }
            UpsertUpdate::Value(column, value) => {
                Ok(format!("{} = {}", g.wrap_str(column)?, g.parameter(value)))
            }
        })
        .collect::<QueryResult<Vec<_>>>()?;
    sql.push_str(&columns.join(", "));
    Ok(sql)
}
