//! Clause nodes stored on a [`Builder`](super::query::Builder).
//!
//! Predicates are tagged variants; the grammar dispatches on the tag with one
//! compiler method per variant.

use std::fmt;
use std::str::FromStr;

use super::error::QueryError;
use super::expr::Column;
use super::query::Builder;
use super::value::Value;

// =============================================================================
// Connectors and directions
// =============================================================================

/// The connector placed before a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boolean {
    And,
    Or,
    AndNot,
    OrNot,
}

impl Boolean {
    pub fn as_str(&self) -> &'static str {
        match self {
            Boolean::And => "and",
            Boolean::Or => "or",
            Boolean::AndNot => "and not",
            Boolean::OrNot => "or not",
        }
    }

    /// The same connector with `not` appended.
    pub fn negated(self) -> Self {
        match self {
            Boolean::And | Boolean::AndNot => Boolean::AndNot,
            Boolean::Or | Boolean::OrNot => Boolean::OrNot,
        }
    }

    /// What remains once a leading connector is stripped from the first predicate.
    pub(crate) fn leading(&self) -> &'static str {
        match self {
            Boolean::And | Boolean::Or => "",
            Boolean::AndNot | Boolean::OrNot => "not ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

impl FromStr for Direction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(QueryError::InvalidOrderDirection(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Predicates
// =============================================================================

/// Date component compared by a date-based where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Date,
    Time,
    Day,
    Month,
    Year,
}

impl DatePart {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePart::Date => "date",
            DatePart::Time => "time",
            DatePart::Day => "day",
            DatePart::Month => "month",
            DatePart::Year => "year",
        }
    }
}

/// Options for full-text predicates. Interpretation is dialect specific.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullTextOptions {
    /// Postgres text search configuration, e.g. `english`.
    pub language: Option<String>,
    /// MySQL: `boolean`; Postgres: `phrase` or `websearch`.
    pub mode: Option<String>,
    /// MySQL query expansion.
    pub expanded: bool,
}

impl FullTextOptions {
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    #[must_use]
    pub fn expanded(mut self) -> Self {
        self.expanded = true;
        self
    }
}

/// A `where` (or join `on`) predicate.
#[derive(Debug, Clone)]
pub struct Where {
    pub boolean: Boolean,
    pub kind: WhereKind,
}

#[derive(Debug, Clone)]
pub enum WhereKind {
    Basic {
        column: Column,
        operator: String,
        value: Value,
    },
    /// `column->path` compared against a JSON `true`/`false`.
    JsonBoolean {
        column: String,
        operator: String,
        value: bool,
    },
    Bitwise {
        column: Column,
        operator: String,
        value: Value,
    },
    Column {
        first: Column,
        operator: String,
        second: Column,
    },
    In {
        column: Column,
        values: Vec<Value>,
        not: bool,
    },
    /// Integer list inlined into the SQL without placeholders.
    InRaw {
        column: Column,
        values: Vec<i64>,
        not: bool,
    },
    Null {
        column: Column,
        not: bool,
    },
    Between {
        column: Column,
        values: [Value; 2],
        not: bool,
    },
    BetweenColumns {
        column: Column,
        values: [Column; 2],
        not: bool,
    },
    Date {
        part: DatePart,
        column: Column,
        operator: String,
        value: Value,
    },
    Nested {
        query: Box<Builder>,
    },
    Sub {
        column: Column,
        operator: String,
        query: Box<Builder>,
    },
    Exists {
        query: Box<Builder>,
        not: bool,
    },
    RowValues {
        columns: Vec<Column>,
        operator: String,
        values: Vec<Value>,
    },
    JsonContains {
        column: String,
        value: Value,
        not: bool,
    },
    JsonLength {
        column: String,
        operator: String,
        value: Value,
    },
    FullText {
        columns: Vec<Column>,
        value: String,
        options: FullTextOptions,
    },
    Raw {
        sql: String,
    },
}

/// A `having` predicate.
#[derive(Debug, Clone)]
pub struct Having {
    pub boolean: Boolean,
    pub kind: HavingKind,
}

#[derive(Debug, Clone)]
pub enum HavingKind {
    Basic {
        column: Column,
        operator: String,
        value: Value,
    },
    Bitwise {
        column: Column,
        operator: String,
        value: Value,
    },
    Null {
        column: Column,
        not: bool,
    },
    Between {
        column: Column,
        values: [Value; 2],
        not: bool,
    },
    Nested {
        query: Box<Builder>,
    },
    Raw {
        sql: String,
    },
}

// =============================================================================
// Other clauses
// =============================================================================

#[derive(Debug, Clone)]
pub enum Order {
    Column { column: Column, direction: Direction },
    Raw { sql: String },
}

#[derive(Debug, Clone)]
pub struct Union {
    pub query: Box<Builder>,
    pub all: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub function: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Distinct {
    #[default]
    None,
    All,
    /// `distinct on (...)` where supported, plain `distinct` elsewhere.
    Columns(Vec<Column>),
}

impl Distinct {
    pub fn is_distinct(&self) -> bool {
        !matches!(self, Distinct::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lock {
    /// Exclusive row lock (`for update`).
    Update,
    /// Shared row lock.
    Shared,
    /// Dialect text used as-is.
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexHintKind {
    Use,
    Force,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHint {
    pub kind: IndexHintKind,
    pub index: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Cross => "cross",
        }
    }
}

/// One entry of an upsert's update list.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertUpdate {
    /// Refresh the column from the row being inserted.
    Column(String),
    /// Set the column to an explicit value.
    Value(String, Value),
}

impl From<&str> for UpsertUpdate {
    fn from(column: &str) -> Self {
        UpsertUpdate::Column(column.to_string())
    }
}

impl UpsertUpdate {
    pub fn value(column: impl Into<String>, value: impl Into<Value>) -> Self {
        UpsertUpdate::Value(column.into(), value.into())
    }
}

/// The pieces of a compiled select, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Aggregate,
    Columns,
    From,
    IndexHint,
    Joins,
    Wheres,
    Groups,
    Havings,
    Orders,
    Limit,
    Offset,
    Lock,
}

impl Component {
    pub const SELECT: [Component; 12] = [
        Component::Aggregate,
        Component::Columns,
        Component::From,
        Component::IndexHint,
        Component::Joins,
        Component::Wheres,
        Component::Groups,
        Component::Havings,
        Component::Orders,
        Component::Limit,
        Component::Offset,
        Component::Lock,
    ];
}
