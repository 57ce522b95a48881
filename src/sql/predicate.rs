//! Where and having mutators on [`Builder`].
//!
//! Each mutator records one predicate node and, in the same call, pushes the
//! values its placeholders stand for under the `where` (or `having`) clause.
//! Operators are validated when the query is compiled, not here.

use super::bindings::BindingType;
use super::clause::{Boolean, DatePart, FullTextOptions, Having, HavingKind, Where, WhereKind};
use super::error::{QueryError, QueryResult};
use super::expr::{self, Column};
use super::grammar::BITWISE_OPERATORS;
use super::grammar::helpers::is_json_selector;
use super::query::{Builder, IntoBuilder, Queryable};
use super::value::Value;

impl Builder {
    fn push_where(mut self, boolean: Boolean, kind: WhereKind) -> Self {
        self.wheres.push(Where { boolean, kind });
        self
    }

    fn push_having(mut self, boolean: Boolean, kind: HavingKind) -> Self {
        self.havings.push(Having { boolean, kind });
        self
    }

    fn is_bitwise_operator(&self, operator: &str) -> bool {
        let lowered = operator.to_lowercase();
        BITWISE_OPERATORS.contains(&lowered.as_str())
            || self.grammar().bitwise_operators().contains(&lowered.as_str())
    }

    // =========================================================================
    // Basic
    // =========================================================================

    /// `column operator ?`.
    ///
    /// A null value with `=` becomes `is null`, with `<>`/`!=` `is not null`.
    /// A `col->path` column compared with a boolean compares JSON booleans.
    pub fn where_(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_where(column.into(), operator, value.into(), Boolean::And)
    }

    pub fn or_where(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_where(column.into(), operator, value.into(), Boolean::Or)
    }

    /// `column = ?`.
    pub fn where_eq(self, column: impl Into<Column>, value: impl Into<Value>) -> Self {
        self.where_(column, "=", value)
    }

    pub fn or_where_eq(self, column: impl Into<Column>, value: impl Into<Value>) -> Self {
        self.or_where(column, "=", value)
    }

    fn add_where(mut self, column: Column, operator: &str, value: Value, boolean: Boolean) -> Self {
        let lowered = operator.to_lowercase();
        if value.is_null() && matches!(lowered.as_str(), "=" | "<>" | "!=") {
            return self.push_where(
                boolean,
                WhereKind::Null {
                    column,
                    not: lowered != "=",
                },
            );
        }

        if let (Column::Name(name), Value::Bool(b)) = (&column, &value) {
            if is_json_selector(name) {
                let kind = WhereKind::JsonBoolean {
                    column: name.clone(),
                    operator: operator.to_string(),
                    value: *b,
                };
                return self.push_where(boolean, kind);
            }
        }

        self.bindings.push(BindingType::Where, value.clone());
        let operator = operator.to_string();
        let kind = if self.is_bitwise_operator(&operator) {
            WhereKind::Bitwise {
                column,
                operator,
                value,
            }
        } else {
            WhereKind::Basic {
                column,
                operator,
                value,
            }
        };
        self.push_where(boolean, kind)
    }

    /// `not (...)` around a predicate group.
    pub fn where_not(self, callback: impl FnOnce(Builder) -> Builder) -> Self {
        self.where_nested_with(callback, Boolean::AndNot)
    }

    pub fn or_where_not(self, callback: impl FnOnce(Builder) -> Builder) -> Self {
        self.where_nested_with(callback, Boolean::OrNot)
    }

    /// Compare two columns.
    pub fn where_column(
        self,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Self {
        let kind = WhereKind::Column {
            first: first.into(),
            operator: operator.to_string(),
            second: second.into(),
        };
        self.push_where(Boolean::And, kind)
    }

    pub fn or_where_column(
        self,
        first: impl Into<Column>,
        operator: &str,
        second: impl Into<Column>,
    ) -> Self {
        let kind = WhereKind::Column {
            first: first.into(),
            operator: operator.to_string(),
            second: second.into(),
        };
        self.push_where(Boolean::Or, kind)
    }

    pub fn where_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self.bindings.extend(BindingType::Where, bindings);
        self.push_where(Boolean::And, WhereKind::Raw { sql: sql.to_string() })
    }

    pub fn or_where_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self.bindings.extend(BindingType::Where, bindings);
        self.push_where(Boolean::Or, WhereKind::Raw { sql: sql.to_string() })
    }

    // =========================================================================
    // In
    // =========================================================================

    /// `column in (?, ?)`. An empty list compiles to `0 = 1`.
    pub fn where_in<I, V>(self, column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_where_in(column.into(), values, Boolean::And, false)
    }

    pub fn or_where_in<I, V>(self, column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_where_in(column.into(), values, Boolean::Or, false)
    }

    /// `column not in (?, ?)`. An empty list compiles to `1 = 1`.
    pub fn where_not_in<I, V>(self, column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_where_in(column.into(), values, Boolean::And, true)
    }

    pub fn or_where_not_in<I, V>(self, column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_where_in(column.into(), values, Boolean::Or, true)
    }

    fn add_where_in<I, V>(mut self, column: Column, values: I, boolean: Boolean, not: bool) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.bindings.extend(BindingType::Where, values.iter().cloned());
        self.push_where(boolean, WhereKind::In { column, values, not })
    }

    /// `column in (subquery)`.
    pub fn where_in_sub(self, column: impl Into<Column>, query: impl Queryable) -> QueryResult<Self> {
        self.add_where_in_sub(column.into(), query, false)
    }

    pub fn where_not_in_sub(
        self,
        column: impl Into<Column>,
        query: impl Queryable,
    ) -> QueryResult<Self> {
        self.add_where_in_sub(column.into(), query, true)
    }

    fn add_where_in_sub(
        mut self,
        column: Column,
        query: impl Queryable,
        not: bool,
    ) -> QueryResult<Self> {
        let (sql, bindings) = query.into_sub(&self)?;
        self.bindings.extend(BindingType::Where, bindings);
        let values = vec![Value::Raw(expr::raw(sql))];
        Ok(self.push_where(Boolean::And, WhereKind::In { column, values, not }))
    }

    /// Integers inlined into the SQL, no bindings.
    pub fn where_integer_in_raw<I>(self, column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let kind = WhereKind::InRaw {
            column: column.into(),
            values: values.into_iter().collect(),
            not: false,
        };
        self.push_where(Boolean::And, kind)
    }

    pub fn where_integer_not_in_raw<I>(self, column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let kind = WhereKind::InRaw {
            column: column.into(),
            values: values.into_iter().collect(),
            not: true,
        };
        self.push_where(Boolean::And, kind)
    }

    // =========================================================================
    // Null and between
    // =========================================================================

    pub fn where_null(self, column: impl Into<Column>) -> Self {
        let column = column.into();
        self.push_where(Boolean::And, WhereKind::Null { column, not: false })
    }

    pub fn or_where_null(self, column: impl Into<Column>) -> Self {
        let column = column.into();
        self.push_where(Boolean::Or, WhereKind::Null { column, not: false })
    }

    pub fn where_not_null(self, column: impl Into<Column>) -> Self {
        let column = column.into();
        self.push_where(Boolean::And, WhereKind::Null { column, not: true })
    }

    pub fn or_where_not_null(self, column: impl Into<Column>) -> Self {
        let column = column.into();
        self.push_where(Boolean::Or, WhereKind::Null { column, not: true })
    }

    pub fn where_between(
        self,
        column: impl Into<Column>,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        self.add_where_between(column.into(), [min.into(), max.into()], Boolean::And, false)
    }

    pub fn or_where_between(
        self,
        column: impl Into<Column>,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        self.add_where_between(column.into(), [min.into(), max.into()], Boolean::Or, false)
    }

    pub fn where_not_between(
        self,
        column: impl Into<Column>,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        self.add_where_between(column.into(), [min.into(), max.into()], Boolean::And, true)
    }

    fn add_where_between(
        mut self,
        column: Column,
        values: [Value; 2],
        boolean: Boolean,
        not: bool,
    ) -> Self {
        self.bindings.extend(BindingType::Where, values.iter().cloned());
        self.push_where(boolean, WhereKind::Between { column, values, not })
    }

    /// `column between first and second` where both bounds are columns.
    pub fn where_between_columns(
        self,
        column: impl Into<Column>,
        first: impl Into<Column>,
        second: impl Into<Column>,
    ) -> Self {
        let kind = WhereKind::BetweenColumns {
            column: column.into(),
            values: [first.into(), second.into()],
            not: false,
        };
        self.push_where(Boolean::And, kind)
    }

    pub fn where_not_between_columns(
        self,
        column: impl Into<Column>,
        first: impl Into<Column>,
        second: impl Into<Column>,
    ) -> Self {
        let kind = WhereKind::BetweenColumns {
            column: column.into(),
            values: [first.into(), second.into()],
            not: true,
        };
        self.push_where(Boolean::And, kind)
    }

    // =========================================================================
    // Date parts
    // =========================================================================

    pub fn where_date(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_date_based_where(DatePart::Date, column.into(), operator, value.into(), Boolean::And)
    }

    pub fn or_where_date(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_date_based_where(DatePart::Date, column.into(), operator, value.into(), Boolean::Or)
    }

    pub fn where_time(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_date_based_where(DatePart::Time, column.into(), operator, value.into(), Boolean::And)
    }

    pub fn where_day(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_date_based_where(DatePart::Day, column.into(), operator, value.into(), Boolean::And)
    }

    pub fn where_month(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_date_based_where(DatePart::Month, column.into(), operator, value.into(), Boolean::And)
    }

    pub fn where_year(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_date_based_where(DatePart::Year, column.into(), operator, value.into(), Boolean::And)
    }

    fn add_date_based_where(
        mut self,
        part: DatePart,
        column: Column,
        operator: &str,
        value: Value,
        boolean: Boolean,
    ) -> Self {
        let value = date_part_value(part, value);
        self.bindings.push(BindingType::Where, value.clone());
        let kind = WhereKind::Date {
            part,
            column,
            operator: operator.to_string(),
            value,
        };
        self.push_where(boolean, kind)
    }

    // =========================================================================
    // Nested, sub and exists
    // =========================================================================

    /// A parenthesized group of predicates on the same table.
    pub fn where_nested(self, callback: impl FnOnce(Builder) -> Builder) -> Self {
        self.where_nested_with(callback, Boolean::And)
    }

    pub fn or_where_nested(self, callback: impl FnOnce(Builder) -> Builder) -> Self {
        self.where_nested_with(callback, Boolean::Or)
    }

    fn where_nested_with(self, callback: impl FnOnce(Builder) -> Builder, boolean: Boolean) -> Self {
        let nested = callback(self.for_nested_where());
        self.add_nested_where_query(nested, boolean)
    }

    /// Attach a builder's wheres as one group. Groups without predicates are
    /// dropped.
    pub fn add_nested_where_query(mut self, query: Builder, boolean: Boolean) -> Self {
        if query.wheres.is_empty() {
            return self;
        }
        self.bindings.extend(
            BindingType::Where,
            query.raw_bindings().get(BindingType::Where).iter().cloned(),
        );
        self.push_where(
            boolean,
            WhereKind::Nested {
                query: Box::new(query),
            },
        )
    }

    /// `column operator (subquery)`.
    pub fn where_sub(
        mut self,
        column: impl Into<Column>,
        operator: &str,
        query: impl IntoBuilder,
    ) -> Self {
        let query = query.into_builder(&self);
        self.bindings.extend(BindingType::Where, query.get_bindings());
        let kind = WhereKind::Sub {
            column: column.into(),
            operator: operator.to_string(),
            query: Box::new(query),
        };
        self.push_where(Boolean::And, kind)
    }

    pub fn where_exists(self, query: impl IntoBuilder) -> Self {
        self.add_where_exists(query, Boolean::And, false)
    }

    pub fn or_where_exists(self, query: impl IntoBuilder) -> Self {
        self.add_where_exists(query, Boolean::Or, false)
    }

    pub fn where_not_exists(self, query: impl IntoBuilder) -> Self {
        self.add_where_exists(query, Boolean::And, true)
    }

    pub fn or_where_not_exists(self, query: impl IntoBuilder) -> Self {
        self.add_where_exists(query, Boolean::Or, true)
    }

    fn add_where_exists(mut self, query: impl IntoBuilder, boolean: Boolean, not: bool) -> Self {
        let query = query.into_builder(&self);
        self.bindings.extend(BindingType::Where, query.get_bindings());
        let kind = WhereKind::Exists {
            query: Box::new(query),
            not,
        };
        self.push_where(boolean, kind)
    }

    // =========================================================================
    // Row values, JSON and full text
    // =========================================================================

    /// `(a, b) operator (?, ?)`.
    pub fn where_row_values<I, C, J, V>(
        mut self,
        columns: I,
        operator: &str,
        values: J,
    ) -> QueryResult<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
        J: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let columns = expr::columns(columns);
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if columns.len() != values.len() {
            return Err(QueryError::RowValuesMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }
        self.bindings.extend(BindingType::Where, values.iter().cloned());
        let kind = WhereKind::RowValues {
            columns,
            operator: operator.to_string(),
            values,
        };
        Ok(self.push_where(Boolean::And, kind))
    }

    /// The JSON document at `column` contains `value`.
    pub fn where_json_contains(self, column: &str, value: impl Into<Value>) -> Self {
        self.add_where_json_contains(column, value.into(), Boolean::And, false)
    }

    pub fn or_where_json_contains(self, column: &str, value: impl Into<Value>) -> Self {
        self.add_where_json_contains(column, value.into(), Boolean::Or, false)
    }

    pub fn where_json_doesnt_contain(self, column: &str, value: impl Into<Value>) -> Self {
        self.add_where_json_contains(column, value.into(), Boolean::And, true)
    }

    fn add_where_json_contains(
        mut self,
        column: &str,
        value: Value,
        boolean: Boolean,
        not: bool,
    ) -> Self {
        let binding = self.grammar().prepare_binding_for_json_contains(value.clone());
        self.bindings.push(BindingType::Where, binding);
        let kind = WhereKind::JsonContains {
            column: column.to_string(),
            value,
            not,
        };
        self.push_where(boolean, kind)
    }

    /// Compare the length of the JSON array at `column`.
    pub fn where_json_length(
        mut self,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        let value = value.into();
        self.bindings.push(BindingType::Where, value.clone());
        let kind = WhereKind::JsonLength {
            column: column.to_string(),
            operator: operator.to_string(),
            value,
        };
        self.push_where(Boolean::And, kind)
    }

    /// Full-text match over one or more indexed columns.
    pub fn where_full_text<I, C>(self, columns: I, value: &str, options: FullTextOptions) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.add_where_full_text(expr::columns(columns), value, options, Boolean::And)
    }

    pub fn or_where_full_text<I, C>(self, columns: I, value: &str, options: FullTextOptions) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.add_where_full_text(expr::columns(columns), value, options, Boolean::Or)
    }

    fn add_where_full_text(
        mut self,
        columns: Vec<Column>,
        value: &str,
        options: FullTextOptions,
        boolean: Boolean,
    ) -> Self {
        self.bindings
            .push(BindingType::Where, Value::Text(value.to_string()));
        let kind = WhereKind::FullText {
            columns,
            value: value.to_string(),
            options,
        };
        self.push_where(boolean, kind)
    }

    // =========================================================================
    // Having
    // =========================================================================

    pub fn having(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_having(column.into(), operator, value.into(), Boolean::And)
    }

    pub fn or_having(
        self,
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_having(column.into(), operator, value.into(), Boolean::Or)
    }

    fn add_having(mut self, column: Column, operator: &str, value: Value, boolean: Boolean) -> Self {
        self.bindings.push(BindingType::Having, value.clone());
        let operator = operator.to_string();
        let kind = if self.is_bitwise_operator(&operator) {
            HavingKind::Bitwise {
                column,
                operator,
                value,
            }
        } else {
            HavingKind::Basic {
                column,
                operator,
                value,
            }
        };
        self.push_having(boolean, kind)
    }

    pub fn having_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self.bindings.extend(BindingType::Having, bindings);
        self.push_having(Boolean::And, HavingKind::Raw { sql: sql.to_string() })
    }

    pub fn or_having_raw(mut self, sql: &str, bindings: Vec<Value>) -> Self {
        self.bindings.extend(BindingType::Having, bindings);
        self.push_having(Boolean::Or, HavingKind::Raw { sql: sql.to_string() })
    }

    pub fn having_null(self, column: impl Into<Column>) -> Self {
        let column = column.into();
        self.push_having(Boolean::And, HavingKind::Null { column, not: false })
    }

    pub fn having_not_null(self, column: impl Into<Column>) -> Self {
        let column = column.into();
        self.push_having(Boolean::And, HavingKind::Null { column, not: true })
    }

    pub fn having_between(
        mut self,
        column: impl Into<Column>,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        let values = [min.into(), max.into()];
        self.bindings.extend(BindingType::Having, values.iter().cloned());
        let kind = HavingKind::Between {
            column: column.into(),
            values,
            not: false,
        };
        self.push_having(Boolean::And, kind)
    }

    /// A parenthesized group of having predicates.
    pub fn having_nested(mut self, callback: impl FnOnce(Builder) -> Builder) -> Self {
        let nested = callback(self.for_nested_where());
        if nested.havings.is_empty() {
            return self;
        }
        self.bindings.extend(
            BindingType::Having,
            nested.raw_bindings().get(BindingType::Having).iter().cloned(),
        );
        self.push_having(
            Boolean::And,
            HavingKind::Nested {
                query: Box::new(nested),
            },
        )
    }
}

/// Reduce chrono values to the text a date-part comparison expects, and pad
/// numeric days and months to two digits.
fn date_part_value(part: DatePart, value: Value) -> Value {
    let format = match part {
        DatePart::Date => "%Y-%m-%d",
        DatePart::Time => "%H:%M:%S",
        DatePart::Day => "%d",
        DatePart::Month => "%m",
        DatePart::Year => "%Y",
    };
    match (part, value) {
        (_, Value::DateTime(dt)) => Value::Text(dt.format(format).to_string()),
        (DatePart::Time, Value::Time(t)) => Value::Text(t.format(format).to_string()),
        (DatePart::Time, other) => other,
        (_, Value::Date(d)) => Value::Text(d.format(format).to_string()),
        (DatePart::Day | DatePart::Month, Value::Int(n)) => Value::Text(format!("{n:02}")),
        (_, other) => other,
    }
}
