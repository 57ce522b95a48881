//! Query builder and grammar error types.

use thiserror::Error;

/// Result type for query building, compilation and execution.
pub type QueryResult<T> = Result<T, QueryError>;

/// Boxed error raised by a connection or processor implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while building, compiling or running a query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// A binding was added under a clause key that does not exist.
    #[error("invalid binding type: {0}")]
    InvalidBindingType(String),

    /// A subquery argument could not be turned into SQL.
    #[error("invalid subquery: {0}")]
    InvalidSubquery(String),

    /// The grammar has no syntax for the requested feature.
    #[error("This database engine ({engine}) does not support {feature}.")]
    Unsupported {
        /// Grammar name.
        engine: &'static str,
        /// Human readable feature name.
        feature: String,
    },

    /// Order direction other than `asc` / `desc`.
    #[error("order direction must be \"asc\" or \"desc\", got {0:?}")]
    InvalidOrderDirection(String),

    /// Operator unknown to both the builder and the grammar.
    #[error("invalid operator: {0:?}")]
    InvalidOperator(String),

    /// A null value compared with something other than `=`, `<>` or `!=`.
    #[error("illegal operator and value combination: {0:?} null")]
    IllegalOperatorAndValue(String),

    /// Row-value comparison with different column and value counts.
    #[error("the number of columns ({columns}) must match the number of values ({values})")]
    RowValuesMismatch {
        /// Column count.
        columns: usize,
        /// Value count.
        values: usize,
    },

    /// A batch insert record lacks a column present in the first record.
    #[error("insert record is missing column {column:?} present in the first record")]
    InconsistentRecord {
        /// The missing column.
        column: String,
    },

    /// A statement that needs a table was compiled before `from` was set.
    #[error("the query has no table; call from() before compiling {0}")]
    MissingTable(&'static str),

    /// A value that cannot be rendered as a SQL literal.
    #[error("cannot escape value: {0}")]
    Escape(String),

    /// The connection or processor failed.
    #[error("connection error: {message}")]
    Connection {
        /// Context for the failure.
        message: String,
        /// Underlying driver error, if any.
        #[source]
        source: Option<BoxError>,
    },
}

impl QueryError {
    /// Create an unsupported-feature error for a grammar.
    pub fn unsupported(engine: &'static str, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            engine,
            feature: feature.into(),
        }
    }

    /// Create a connection error with an optional source.
    pub fn connection(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self::Connection {
            message: message.into(),
            source,
        }
    }

    /// Check if this error comes from a missing grammar feature.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Check if this error was raised by the connection layer rather than
    /// by the builder or grammar.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}
