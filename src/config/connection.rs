//! Database driver names.
//!
//! Config files name the engine with the driver strings used across the
//! ecosystem (`pgsql`, `sqlsrv`, `mariadb`, ...). Each maps onto one grammar
//! dialect.

use crate::sql::grammar::Dialect;

/// Error type for driver parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Unsupported driver: {0}. Supported: sqlite, mysql, mariadb, pgsql, sqlsrv, generic")]
    UnsupportedDriver(String),
}

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    /// No engine-specific syntax.
    Generic,
    /// MySQL and MariaDB
    MySql,
    /// PostgreSQL
    Postgres,
    /// SQLite (file or in-memory)
    Sqlite,
    /// Microsoft SQL Server
    SqlServer,
}

impl Driver {
    /// Parse driver from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConnectionError> {
        match s.to_lowercase().as_str() {
            "generic" => Ok(Driver::Generic),
            "mysql" | "mariadb" => Ok(Driver::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Driver::Postgres),
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            "sqlsrv" | "mssql" | "sqlserver" => Ok(Driver::SqlServer),
            other => Err(ConnectionError::UnsupportedDriver(other.to_string())),
        }
    }

    /// Canonical driver name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Generic => "generic",
            Driver::MySql => "mysql",
            Driver::Postgres => "pgsql",
            Driver::Sqlite => "sqlite",
            Driver::SqlServer => "sqlsrv",
        }
    }

    /// The grammar dialect this driver speaks.
    pub fn dialect(&self) -> Dialect {
        match self {
            Driver::Generic => Dialect::Generic,
            Driver::MySql => Dialect::MySql,
            Driver::Postgres => Dialect::Postgres,
            Driver::Sqlite => Dialect::Sqlite,
            Driver::SqlServer => Dialect::SqlServer,
        }
    }

    /// Get the default port for this driver.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Driver::MySql => Some(3306),
            Driver::Postgres => Some(5432),
            Driver::SqlServer => Some(1433),
            Driver::Sqlite | Driver::Generic => None,
        }
    }
}
