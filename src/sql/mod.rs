//! SQL query building module.
//!
//! This module provides a fluent builder that compiles to multi-dialect SQL.
//! It includes:
//!
//! - [`query`] - the [`Builder`] and its clause state
//! - [`predicate`] - where and having mutators
//! - [`join`] - join clauses
//! - [`fetch`] / [`dml`] - async terminal operations
//! - [`bindings`] - clause-keyed placeholder values
//! - [`grammar`] - dialect compilers
//! - [`connection`] / [`processor`] - the execution seam

pub mod bindings;
pub mod clause;
pub mod connection;
pub mod dml;
pub mod error;
pub mod expr;
pub mod fetch;
pub mod grammar;
pub mod join;
pub mod predicate;
pub mod processor;
pub mod query;
pub mod value;


pub use bindings::{BindingType, Bindings};
pub use clause::{
    Boolean, DatePart, Direction, FullTextOptions, IndexHintKind, JoinType, Lock, UpsertUpdate,
};
pub use connection::{table, Connection};
pub use error::{BoxError, QueryError, QueryResult};
pub use expr::{raw, Column, Expression};
pub use grammar::{Dialect, Grammar, GrammarConfig};
pub use join::JoinClause;
pub use processor::Processor;
pub use query::{Builder, IntoBuilder, Queryable, Statement};
pub use value::{record, Record, Row, Value};
