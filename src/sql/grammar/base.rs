//! Generic compilation steps.
//!
//! The [`Grammar`] defaults delegate here, and dialect overrides that extend
//! the generic output call these functions directly instead of re-deriving it.

use indexmap::IndexMap;

use super::helpers;
use super::{Grammar, OPERATORS};
use crate::sql::bindings::{BindingType, Bindings};
use crate::sql::clause::{Boolean, Component, DatePart};
use crate::sql::error::{QueryError, QueryResult};
use crate::sql::expr::Column;
use crate::sql::join::JoinClause;
use crate::sql::query::Builder;
use crate::sql::value::{clean_bindings, Record, Value};

// =============================================================================
// Wrapping
// =============================================================================

pub fn wrap<G: Grammar + ?Sized>(g: &G, column: &Column) -> QueryResult<String> {
    let value = match column {
        Column::Raw(expr) => return Ok(expr.value().to_string()),
        Column::Name(name) => name.as_str(),
    };
    if let Some((left, alias)) = helpers::split_alias(value) {
        return Ok(format!("{} as {}", g.wrap_str(left)?, g.wrap_value(alias)));
    }
    if helpers::is_json_selector(value) {
        return g.wrap_json_selector(value);
    }
    Ok(wrap_segments(g, value))
}

/// Wrap `a.b.c`: the first of several segments is a table and gets the prefix.
pub fn wrap_segments<G: Grammar + ?Sized>(g: &G, value: &str) -> String {
    let segments: Vec<&str> = value.split('.').collect();
    let many = segments.len() > 1;
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            if i == 0 && many {
                g.wrap_table(&Column::from(*segment))
            } else {
                g.wrap_value(segment)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

pub fn wrap_table<G: Grammar + ?Sized>(g: &G, table: &Column) -> String {
    let table = match table {
        Column::Raw(expr) => return expr.value().to_string(),
        Column::Name(name) => name.as_str(),
    };
    let prefix = g.table_prefix();
    if let Some((name, alias)) = helpers::split_alias(table) {
        return format!(
            "{} as {}",
            wrap_prefixed_table(g, name, prefix),
            g.wrap_value(&format!("{prefix}{alias}"))
        );
    }
    wrap_prefixed_table(g, table, prefix)
}

/// `schema.table` gets the prefix on the table segment only.
fn wrap_prefixed_table<G: Grammar + ?Sized>(g: &G, table: &str, prefix: &str) -> String {
    match table.rsplit_once('.') {
        Some((schema, name)) => {
            let mut segments: Vec<String> = schema.split('.').map(|s| g.wrap_value(s)).collect();
            segments.push(g.wrap_value(&format!("{prefix}{name}")));
            segments.join(".")
        }
        None => g.wrap_value(&format!("{prefix}{table}")),
    }
}

/// Split `col->a->b` into the wrapped field and a `, '$."a"."b"'` path argument.
pub fn wrap_json_field_and_path<G: Grammar + ?Sized>(
    g: &G,
    column: &str,
) -> QueryResult<(String, String)> {
    let (field, path) = match column.split_once("->") {
        Some((field, path)) => (field, format!(", {}", helpers::wrap_json_path(path, "->"))),
        None => (column, String::new()),
    };
    Ok((g.wrap_str(field)?, path))
}

/// The alias a wrapped `table as alias` is addressed by.
pub fn last_alias(wrapped_table: &str) -> &str {
    wrapped_table.rsplit(" as ").next().unwrap_or(wrapped_table)
}

pub fn table_of<'q>(query: &'q Builder, statement: &'static str) -> QueryResult<&'q Column> {
    query
        .from
        .as_ref()
        .ok_or(QueryError::MissingTable(statement))
}

// =============================================================================
// Select
// =============================================================================

pub fn compile_select<G: Grammar + ?Sized>(g: &G, query: &Builder) -> QueryResult<String> {
    if (!query.unions.is_empty() || !query.havings.is_empty()) && query.aggregate.is_some() {
        return g.compile_union_aggregate(query);
    }
    let mut sql = concatenate(&g.compile_components(query)?);
    if !query.unions.is_empty() {
        sql = format!("{} {}", g.wrap_union(&sql), g.compile_unions(query)?);
    }
    Ok(sql)
}

/// Join non-empty fragments with single spaces.
pub fn concatenate(components: &IndexMap<Component, String>) -> String {
    components
        .values()
        .filter(|sql| !sql.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

pub fn compile_joins<G: Grammar + ?Sized>(
    g: &G,
    _query: &Builder,
    joins: &[JoinClause],
) -> QueryResult<String> {
    let mut compiled = Vec::with_capacity(joins.len());
    for join in joins {
        let table = g.wrap_table(&join.table);
        let table_and_nested = if join.query.joins.is_empty() {
            table
        } else {
            format!(
                "({} {})",
                table,
                g.compile_joins(&join.query, &join.query.joins)?
            )
        };
        let on = g.compile_wheres(&join.query)?;
        compiled.push(
            format!("{} join {} {}", join.join_type.as_str(), table_and_nested, on)
                .trim()
                .to_string(),
        );
    }
    Ok(compiled.join(" "))
}

/// `on` inside a join clause, `where` everywhere else.
pub fn where_keyword(query: &Builder) -> &'static str {
    if query.is_join() {
        "on"
    } else {
        "where"
    }
}

/// Join predicates with their connectors, dropping the first connector.
pub fn concatenate_predicates(parts: &[(Boolean, String)]) -> String {
    parts
        .iter()
        .enumerate()
        .map(|(i, (boolean, sql))| {
            if i == 0 {
                format!("{}{}", boolean.leading(), sql)
            } else {
                format!("{} {}", boolean.as_str(), sql)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reject operators nobody knows and null compared with anything but equality.
pub fn check_operator<G: Grammar + ?Sized>(g: &G, operator: &str, value: &Value) -> QueryResult<()> {
    let lowered = operator.to_lowercase();
    let known = OPERATORS.contains(&lowered.as_str()) || g.operators().contains(&lowered.as_str());
    if !known {
        return Err(QueryError::InvalidOperator(operator.to_string()));
    }
    if value.is_null() && !matches!(lowered.as_str(), "=" | "<>" | "!=") {
        return Err(QueryError::IllegalOperatorAndValue(operator.to_string()));
    }
    Ok(())
}

pub fn where_basic<G: Grammar + ?Sized>(
    g: &G,
    column: &Column,
    operator: &str,
    value: &Value,
) -> QueryResult<String> {
    let operator = operator.replace('?', "??");
    Ok(format!("{} {} {}", g.wrap(column)?, operator, g.parameter(value)))
}

pub fn where_null<G: Grammar + ?Sized>(g: &G, column: &Column, not: bool) -> QueryResult<String> {
    let is = if not { "is not null" } else { "is null" };
    Ok(format!("{} {}", g.wrap(column)?, is))
}

pub fn where_date_based<G: Grammar + ?Sized>(
    g: &G,
    part: DatePart,
    column: &Column,
    operator: &str,
    value: &Value,
) -> QueryResult<String> {
    Ok(format!(
        "{}({}) {} {}",
        part.as_str(),
        g.wrap(column)?,
        operator,
        g.parameter(value)
    ))
}

// =============================================================================
// Insert / update / delete
// =============================================================================

/// Column order of a batch insert: the first record's keys.
pub fn insert_columns(values: &[Record]) -> Vec<String> {
    values
        .first()
        .map(|record| record.keys().cloned().collect())
        .unwrap_or_default()
}

/// A record's values in the given column order.
pub fn record_values(record: &Record, columns: &[String]) -> QueryResult<Vec<Value>> {
    columns
        .iter()
        .map(|column| {
            record
                .get(column)
                .cloned()
                .ok_or_else(|| QueryError::InconsistentRecord {
                    column: column.clone(),
                })
        })
        .collect()
}

/// Values of a batch insert, record by record in first-record column order.
pub fn insert_bindings(values: &[Record]) -> QueryResult<Vec<Value>> {
    let columns = insert_columns(values);
    let mut bindings = Vec::new();
    for record in values {
        bindings.extend(record_values(record, &columns)?);
    }
    Ok(clean_bindings(bindings))
}

/// `(?, ?), (?, ?)` for every record.
pub fn parameterize_records<G: Grammar + ?Sized>(
    g: &G,
    values: &[Record],
    columns: &[String],
) -> QueryResult<String> {
    let rows = values
        .iter()
        .map(|record| Ok(format!("({})", g.parameterize(&record_values(record, columns)?))))
        .collect::<QueryResult<Vec<_>>>()?;
    Ok(rows.join(", "))
}

pub fn columnize_names<G: Grammar + ?Sized>(g: &G, columns: &[String]) -> QueryResult<String> {
    let columns: Vec<Column> = columns.iter().map(Column::from).collect();
    g.columnize(&columns)
}

pub fn compile_insert<G: Grammar + ?Sized>(
    g: &G,
    query: &Builder,
    values: &[Record],
) -> QueryResult<String> {
    let table = g.wrap_table(table_of(query, "insert")?);
    if values.iter().all(Record::is_empty) {
        return Ok(format!("insert into {table} default values"));
    }
    let columns = insert_columns(values);
    Ok(format!(
        "insert into {} ({}) values {}",
        table,
        columnize_names(g, &columns)?,
        parameterize_records(g, values, &columns)?
    ))
}

pub fn compile_update<G: Grammar + ?Sized>(
    g: &G,
    query: &Builder,
    values: &Record,
) -> QueryResult<String> {
    let table = g.wrap_table(table_of(query, "update")?);
    let columns = g.compile_update_columns(query, values)?;
    let wheres = g.compile_wheres(query)?;
    let sql = if query.joins.is_empty() {
        g.compile_update_without_joins(query, &table, &columns, &wheres)?
    } else {
        g.compile_update_with_joins(query, &table, &columns, &wheres)?
    };
    Ok(sql.trim().to_string())
}

pub fn prepare_bindings_for_update<I>(bindings: &Bindings, values: I) -> Vec<Value>
where
    I: IntoIterator<Item = Value>,
{
    let mut prepared = bindings.get(BindingType::Join).to_vec();
    prepared.extend(clean_bindings(values));
    prepared.extend(bindings.flatten_except(&[BindingType::Select, BindingType::Join]));
    prepared
}

/// Update values first, then every clause but select; used where joins
/// compile after the `set` list.
pub fn prepare_values_then_bindings<I>(bindings: &Bindings, values: I) -> Vec<Value>
where
    I: IntoIterator<Item = Value>,
{
    let mut prepared = clean_bindings(values);
    prepared.extend(bindings.flatten_except(&[BindingType::Select]));
    prepared
}

pub fn compile_delete<G: Grammar + ?Sized>(g: &G, query: &Builder) -> QueryResult<String> {
    let table = g.wrap_table(table_of(query, "delete")?);
    let wheres = g.compile_wheres(query)?;
    let sql = if query.joins.is_empty() {
        g.compile_delete_without_joins(query, &table, &wheres)?
    } else {
        g.compile_delete_with_joins(query, &table, &wheres)?
    };
    Ok(sql.trim().to_string())
}

/// Select `alias.<row_id>` from a copy of the query, for engines that cannot
/// join or limit inside update/delete.
pub fn row_id_subselect<G: Grammar + ?Sized>(
    g: &G,
    query: &Builder,
    row_id: &str,
) -> QueryResult<String> {
    let table = table_of(query, "row id subquery")?;
    let alias = helpers::alias_or_name(table.text()).to_string();
    let select = query.clone().select([format!("{alias}.{row_id}")]);
    g.compile_select(&select)
}

// =============================================================================
// Literals
// =============================================================================

pub fn escape<G: Grammar + ?Sized>(g: &G, value: &Value) -> QueryResult<String> {
    Ok(match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => g.format_bool(*b).to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => {
            if s.contains('\0') {
                return Err(QueryError::Escape(
                    "strings with null bytes cannot be escaped; bind them as bytes".into(),
                ));
            }
            helpers::quote_string_single(s)
        }
        Value::Bytes(bytes) => g.escape_binary(bytes),
        Value::Date(d) => helpers::quote_string_single(&d.format("%Y-%m-%d").to_string()),
        Value::Time(t) => helpers::quote_string_single(&t.format("%H:%M:%S").to_string()),
        Value::DateTime(dt) => {
            helpers::quote_string_single(&dt.format(g.date_format()).to_string())
        }
        Value::Json(json) => helpers::quote_string_single(&json.to_string()),
        Value::Raw(expr) => expr.value().to_string(),
    })
}

/// Replace placeholders outside string literals. `''`, `\'` and `??` are
/// copied through untouched.
pub fn substitute_bindings_into_raw_sql<G: Grammar + ?Sized>(
    g: &G,
    sql: &str,
    bindings: &[Value],
) -> QueryResult<String> {
    let escaped = bindings
        .iter()
        .map(|value| g.escape(value))
        .collect::<QueryResult<Vec<_>>>()?;
    let mut escaped = escaped.into_iter();
    let mut out = String::with_capacity(sql.len());
    let mut in_string = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(&next) = chars.peek() {
            if matches!((c, next), ('\\', '\'') | ('\'', '\'') | ('?', '?')) {
                out.push(c);
                out.push(next);
                chars.next();
                continue;
            }
        }
        match c {
            '\'' => {
                in_string = !in_string;
                out.push(c);
            }
            '?' if !in_string => match escaped.next() {
                Some(literal) => out.push_str(&literal),
                None => out.push('?'),
            },
            _ => out.push(c),
        }
    }

    Ok(out)
}
