//! TOML-based configuration for quarry.
//!
//! Supports a config file (quarry.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! default = "app"
//!
//! [connections.app]
//! driver = "pgsql"
//! database = "${APP_DB}"
//! prefix = "app_"
//!
//! [connections.legacy]
//! driver = "mysql"
//! host = "${LEGACY_HOST}"
//! port = 3307
//! database = "legacy"
//! use_upsert_alias = true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::connection::Driver;
use crate::sql::grammar::{Grammar, GrammarConfig};
use crate::sql::processor::Processor;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Name of the connection used when none is requested.
    pub default: Option<String>,

    /// Named database connections.
    pub connections: HashMap<String, ConnectionSettings>,
}

/// Connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionSettings {
    /// Database driver (sqlite, mysql, pgsql, sqlsrv, generic).
    pub driver: String,

    /// Server host (supports ${ENV_VAR} expansion). Unused by file-based drivers.
    #[serde(default)]
    pub host: Option<String>,

    /// Server port; the driver's standard port when omitted.
    #[serde(default)]
    pub port: Option<u16>,

    /// Database name or file (supports ${ENV_VAR} expansion).
    #[serde(default)]
    pub database: String,

    /// Prepended to every table name.
    #[serde(default)]
    pub prefix: String,

    /// MySQL 8.0.19+: upserts reference inserted values through a row alias.
    #[serde(default)]
    pub use_upsert_alias: bool,
}

impl ConnectionSettings {
    /// Get the driver type.
    pub fn driver_type(&self) -> Result<Driver, SettingsError> {
        Driver::from_str(&self.driver)
            .map_err(|_| SettingsError::UnsupportedDriver(self.driver.clone()))
    }

    /// Get the database name with environment variables expanded.
    pub fn resolved_database(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.database)
    }

    /// Get the host with environment variables expanded.
    pub fn resolved_host(&self) -> Result<Option<String>, SettingsError> {
        self.host.as_deref().map(expand_env_vars).transpose()
    }

    /// The configured port, else the driver's default. `None` for drivers
    /// that do not listen on one.
    pub fn resolved_port(&self) -> Result<Option<u16>, SettingsError> {
        Ok(self.port.or(self.driver_type()?.default_port()))
    }

    /// Grammar construction options for this connection.
    pub fn grammar_config(&self) -> GrammarConfig {
        GrammarConfig::default()
            .with_table_prefix(self.prefix.as_str())
            .with_upsert_alias(self.use_upsert_alias)
    }

    /// The configured dialect's grammar.
    pub fn grammar(&self) -> Result<Arc<dyn Grammar>, SettingsError> {
        Ok(self.driver_type()?.dialect().grammar(self.grammar_config()))
    }

    /// The configured dialect's result processor.
    pub fn processor(&self) -> Result<Arc<dyn Processor>, SettingsError> {
        Ok(self.driver_type()?.dialect().processor())
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `QUARRY_CONFIG`
    /// 2. `./quarry.toml`
    /// 3. `~/.config/quarry/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("QUARRY_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("quarry.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("quarry").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Get a connection by name.
    pub fn get_connection(&self, name: &str) -> Result<&ConnectionSettings, SettingsError> {
        self.connections
            .get(name)
            .ok_or_else(|| SettingsError::ConnectionNotFound(name.to_string()))
    }

    /// The connection named by `default`, else one called "default", else
    /// the alphabetically first one.
    pub fn default_connection(&self) -> Option<(&str, &ConnectionSettings)> {
        let named = self.default.as_deref().unwrap_or("default");
        if let Some((name, conn)) = self.connections.get_key_value(named) {
            return Some((name.as_str(), conn));
        }
        self.connections
            .iter()
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(k, v)| (k.as_str(), v))
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A lone `$` is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            name
        };
        if var_name.is_empty() {
            result.push('$');
            continue;
        }
        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
