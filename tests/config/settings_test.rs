#[path = "../common/mod.rs"]
mod common;

use std::env;
use std::fs;
use std::path::PathBuf;

use common::builder_with;
use quarry::config::{Driver, Settings, SettingsError};
use quarry::{Dialect, Grammar};

fn write_config(name: &str, content: &str) -> PathBuf {
    let path = env::temp_dir().join(format!("quarry-{}-{name}.toml", std::process::id()));
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_from_file() {
    let path = write_config(
        "from-file",
        r#"
default = "reporting"

[connections.reporting]
driver = "sqlsrv"
database = "reports"

[connections.app]
driver = "sqlite"
database = "app.db"
prefix = "app_"
"#,
    );

    let settings = Settings::from_file(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let (name, conn) = settings.default_connection().unwrap();
    assert_eq!(name, "reporting");
    assert_eq!(conn.driver_type().unwrap(), Driver::SqlServer);
    assert_eq!(conn.grammar().unwrap().name(), "sqlserver");

    let app = settings.get_connection("app").unwrap();
    assert_eq!(app.resolved_database().unwrap(), "app.db");
    assert_eq!(app.driver_type().unwrap().dialect(), Dialect::Sqlite);
}

#[test]
fn test_missing_file() {
    let path = env::temp_dir().join("quarry-does-not-exist-9f2c.toml");
    assert!(matches!(
        Settings::from_file(&path),
        Err(SettingsError::FileNotFound(p)) if p == path
    ));
}

#[test]
fn test_malformed_file() {
    let path = write_config("malformed", "[connections.app\ndriver = ");
    let result = Settings::from_file(&path);
    fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(SettingsError::ParseError(_))));
}

#[test]
fn test_unknown_driver() {
    let settings: Settings = toml::from_str(
        r#"
[connections.app]
driver = "oracle"
"#,
    )
    .unwrap();
    let conn = settings.get_connection("app").unwrap();
    assert!(matches!(
        conn.driver_type(),
        Err(SettingsError::UnsupportedDriver(d)) if d == "oracle"
    ));
    assert!(conn.grammar().is_err());
}

#[test]
fn test_default_falls_back_to_first_name() {
    let settings: Settings = toml::from_str(
        r#"
[connections.zeta]
driver = "mysql"

[connections.alpha]
driver = "pgsql"
"#,
    )
    .unwrap();
    let (name, conn) = settings.default_connection().unwrap();
    assert_eq!(name, "alpha");
    assert_eq!(conn.driver_type().unwrap(), Driver::Postgres);
}

#[test]
fn test_connection_named_default() {
    let settings: Settings = toml::from_str(
        r#"
[connections.default]
driver = "mariadb"

[connections.aaa]
driver = "sqlite"
"#,
    )
    .unwrap();
    let (name, conn) = settings.default_connection().unwrap();
    assert_eq!(name, "default");
    assert_eq!(conn.driver_type().unwrap(), Driver::MySql);
}

#[test]
fn test_prefix_reaches_compiled_sql() {
    let settings: Settings = toml::from_str(
        r#"
[connections.app]
driver = "pgsql"
prefix = "app_"
"#,
    )
    .unwrap();
    let conn = settings.get_connection("app").unwrap();
    let dialect = conn.driver_type().unwrap().dialect();
    let query = builder_with(dialect, conn.grammar_config())
        .from("users as u")
        .where_eq("u.id", 1);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "app_users" as "app_u" where "app_u"."id" = ?"#
    );
}

#[test]
fn test_upsert_alias_reaches_compiled_sql() {
    let settings: Settings = toml::from_str(
        r#"
[connections.legacy]
driver = "mysql"
use_upsert_alias = true
"#,
    )
    .unwrap();
    let conn = settings.get_connection("legacy").unwrap();
    let query = builder_with(Dialect::MySql, conn.grammar_config()).from("users");
    let sql = query
        .grammar()
        .compile_upsert(
            &query,
            &[quarry::record([("email", "a@x.io")])],
            &["email".to_string()],
            &[quarry::sql::UpsertUpdate::from("email")],
        )
        .unwrap();
    assert_eq!(
        sql,
        "insert into `users` (`email`) values (?) as `upsert_alias` on duplicate key update `email` = `upsert_alias`.`email`"
    );
}

#[test]
fn test_database_expands_env_vars() {
    env::set_var("QUARRY_SETTINGS_TEST_DB", "tenant_42");
    let settings: Settings = toml::from_str(
        r#"
[connections.app]
driver = "pgsql"
database = "${QUARRY_SETTINGS_TEST_DB}_main"
"#,
    )
    .unwrap();
    let database = settings
        .get_connection("app")
        .unwrap()
        .resolved_database();
    env::remove_var("QUARRY_SETTINGS_TEST_DB");
    assert_eq!(database.unwrap(), "tenant_42_main");
}

#[test]
fn test_database_with_missing_env_var() {
    let settings: Settings = toml::from_str(
        r#"
[connections.app]
driver = "pgsql"
database = "$QUARRY_SETTINGS_UNSET_VAR"
"#,
    )
    .unwrap();
    assert!(matches!(
        settings.get_connection("app").unwrap().resolved_database(),
        Err(SettingsError::MissingEnvVar(v)) if v == "QUARRY_SETTINGS_UNSET_VAR"
    ));
}

#[test]
fn test_server_address_defaults() {
    env::set_var("QUARRY_SETTINGS_TEST_HOST", "db.internal");
    let settings: Settings = toml::from_str(
        r#"
[connections.legacy]
driver = "mariadb"
host = "${QUARRY_SETTINGS_TEST_HOST}"
"#,
    )
    .unwrap();
    let conn = settings.get_connection("legacy").unwrap();
    let host = conn.resolved_host();
    env::remove_var("QUARRY_SETTINGS_TEST_HOST");
    assert_eq!(host.unwrap().as_deref(), Some("db.internal"));
    assert_eq!(conn.resolved_port().unwrap(), Some(3306));
}
