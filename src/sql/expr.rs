//! Raw SQL fragments and column references.
//!
//! An [`Expression`] is spliced into the compiled SQL verbatim: the grammar
//! never quotes it and never turns it into a `?` placeholder. Every place that
//! would wrap an identifier or parameterize a value checks for one first.

use std::fmt;

/// A literal SQL fragment that bypasses quoting and parameterization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression(String);

impl Expression {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// The wrapped SQL, unchanged.
    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shorthand for [`Expression::new`].
pub fn raw(sql: impl Into<String>) -> Expression {
    Expression::new(sql)
}

/// A column or table reference.
///
/// Names may be qualified (`users.id`), aliased (`users.id as user_id`) or
/// JSON selectors (`options->lang`); the grammar decides how each is wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Column {
    Name(String),
    Raw(Expression),
}

impl Column {
    /// The unwrapped name, or `None` for raw expressions.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Column::Name(name) => Some(name),
            Column::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Column::Raw(_))
    }

    /// The text of the reference, whether a name or a raw fragment.
    pub fn text(&self) -> &str {
        match self {
            Column::Name(name) => name,
            Column::Raw(expr) => expr.value(),
        }
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::Name(name.to_string())
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Column::Name(name)
    }
}

impl From<&String> for Column {
    fn from(name: &String) -> Self {
        Column::Name(name.clone())
    }
}

impl From<Expression> for Column {
    fn from(expr: Expression) -> Self {
        Column::Raw(expr)
    }
}

impl From<&Column> for Column {
    fn from(column: &Column) -> Self {
        column.clone()
    }
}

/// Convert a list of column-like values.
pub fn columns<I, C>(items: I) -> Vec<Column>
where
    I: IntoIterator<Item = C>,
    C: Into<Column>,
{
    items.into_iter().map(Into::into).collect()
}
