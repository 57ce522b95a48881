//! # Quarry
//!
//! A fluent SQL query builder that compiles to MySQL, Postgres, SQLite and
//! SQL Server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Builder (query state)                  │
//! │  (columns, joins, wheres, groups, havings, orders, ...)  │
//! │               + clause-keyed Bindings                    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [grammar]
//! ┌─────────────────────────────────────────────────────────┐
//! │        SQL string + bindings in placeholder order        │
//! │   (generic / mysql / postgres / sqlite / sqlserver)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [connection]
//! ┌─────────────────────────────────────────────────────────┐
//! │              Rows → Processor → caller                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Building and compiling are synchronous. Only the terminal operations
//! (`get`, `count`, `insert`, `update`, `delete`, ...) are `async`, and each
//! one makes a single call into the [`Connection`].

pub mod config;
pub mod sql;

// Re-export SQL submodules at crate level
pub use sql::grammar;
pub use sql::{
    raw, record, table, BindingType, Builder, Column, Connection, Dialect, Expression, Grammar,
    GrammarConfig, JoinClause, Processor, QueryError, QueryResult, Record, Row, Statement, Value,
};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::{ConnectionSettings, Driver, Settings};
    pub use crate::sql::{
        raw, record, table, BindingType, Boolean, Builder, Column, Connection, DatePart,
        Dialect, Direction, Expression, FullTextOptions, Grammar, GrammarConfig, IntoBuilder,
        JoinClause, JoinType, Lock, Processor, QueryError, QueryResult, Queryable, Record, Row,
        UpsertUpdate, Value,
    };
}
