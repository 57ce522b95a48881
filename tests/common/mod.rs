//! Shared fixtures: a recording in-memory connection.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quarry::sql::processor::Processor;
use quarry::{Builder, Connection, Dialect, Grammar, GrammarConfig, QueryResult, Row, Value};

#[derive(Debug)]
pub struct RecordingConnection {
    dialect: Dialect,
    config: GrammarConfig,
    results: Mutex<VecDeque<Vec<Row>>>,
    pub statements: Mutex<Vec<(String, Vec<Value>)>>,
}

impl RecordingConnection {
    pub fn new(dialect: Dialect) -> Self {
        Self::with_config(dialect, GrammarConfig::default())
    }

    pub fn with_config(dialect: Dialect, config: GrammarConfig) -> Self {
        Self {
            dialect,
            config,
            results: Mutex::new(VecDeque::new()),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, rows: Vec<Row>) {
        self.results.lock().unwrap().push_back(rows);
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, bindings: Vec<Value>) {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), bindings));
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    fn query_grammar(&self) -> Arc<dyn Grammar> {
        self.dialect.grammar(self.config.clone())
    }

    fn post_processor(&self) -> Arc<dyn Processor> {
        self.dialect.processor()
    }

    fn database_name(&self) -> &str {
        "main"
    }

    async fn select(&self, sql: &str, bindings: Vec<Value>) -> QueryResult<Vec<Row>> {
        self.record(sql, bindings);
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn statement(&self, sql: &str, bindings: Vec<Value>) -> QueryResult<bool> {
        self.record(sql, bindings);
        Ok(true)
    }

    async fn affecting_statement(&self, sql: &str, bindings: Vec<Value>) -> QueryResult<u64> {
        self.record(sql, bindings);
        Ok(1)
    }

    async fn last_insert_id(&self, _sequence: Option<&str>) -> QueryResult<Value> {
        Ok(Value::Int(1))
    }
}

/// A builder on a fresh recording connection.
pub fn builder(dialect: Dialect) -> Builder {
    Builder::new(Arc::new(RecordingConnection::new(dialect)))
}

pub fn builder_with(dialect: Dialect, config: GrammarConfig) -> Builder {
    Builder::new(Arc::new(RecordingConnection::with_config(dialect, config)))
}

/// Number of `?` placeholders outside quoted strings and identifiers.
pub fn placeholder_count(sql: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if matches!(c, '\'' | '"' | '`') => quote = Some(c),
            None if c == '?' => count += 1,
            None => {}
        }
    }
    count
}

/// Parse `sql` with the matching sqlparser dialect.
pub fn assert_parses(dialect: Dialect, sql: &str) {
    use sqlparser::dialect::{
        GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
    };
    use sqlparser::parser::Parser;

    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Generic => Box::new(GenericDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
        Dialect::SqlServer => Box::new(MsSqlDialect {}),
    };
    if let Err(e) = Parser::parse_sql(parser_dialect.as_ref(), sql) {
        panic!("{dialect} SQL failed to parse: {e}\n{sql}");
    }
}
