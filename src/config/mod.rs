//! Configuration module for quarry.
//!
//! Handles named connection settings, driver names, and environment variables.

mod connection;
mod settings;

pub use connection::{ConnectionError, Driver};
pub use settings::{expand_env_vars, ConnectionSettings, Settings, SettingsError};
