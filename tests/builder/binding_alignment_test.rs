//! Every compiled statement carries exactly one binding per placeholder, in
//! placeholder order, on every dialect.

#[path = "../common/mod.rs"]
mod common;

use common::{builder, placeholder_count};
use quarry::{raw, Builder, Column, Dialect, Grammar, Value};

/// A select touching every binding clause.
fn every_clause(query: Builder) -> Builder {
    query
        .select(["users.id", "users.email"])
        .select_sub(
            |q: Builder| {
                q.select([raw("count(*)")])
                    .from("orders")
                    .where_column("orders.user_id", "=", "users.id")
                    .where_("orders.total", ">", 100)
            },
            "big_orders",
        )
        .unwrap()
        .from("users")
        .join_where("teams", "teams.kind", "=", "internal")
        .left_join_sub(
            |q: Builder| q.from("logins").where_("at", ">", "2024-01-01"),
            "recent",
            "recent.user_id",
            "=",
            "users.id",
        )
        .unwrap()
        .where_eq("users.active", true)
        .where_in("users.role", ["admin", "owner"])
        .where_between("users.age", 18, 65)
        .where_date("users.created_at", ">=", "2024-01-01")
        .or_where_nested(|q: Builder| q.where_eq("users.vip", true).where_not_null("users.email"))
        .where_exists(|q: Builder| {
            q.select([raw("1")])
                .from("bans")
                .where_column("bans.user_id", "=", "users.id")
                .where_eq("bans.lifted", false)
        })
        .group_by_raw("users.id, ?", vec![Value::from("x")])
        .having("users.id", ">", 0)
        .order_by_raw("field(users.role, ?)", vec![Value::from("owner")])
        .union(|q: Builder| q.select(["id", "email"]).from("admins").where_eq("enabled", 1))
}

fn assert_aligned(query: &Builder) {
    let statement = query.to_statement().unwrap();
    assert_eq!(
        placeholder_count(&statement.sql),
        statement.bindings.len(),
        "{} placeholders vs bindings {:?}\n{}",
        query.grammar().name(),
        statement.bindings,
        statement.sql
    );
}

#[test]
fn test_every_clause_aligns_on_every_dialect() {
    for dialect in Dialect::ALL {
        assert_aligned(&every_clause(builder(dialect)));
    }
}

#[test]
fn test_bindings_follow_clause_order() {
    let query = every_clause(builder(Dialect::Generic));
    let bindings = query.get_bindings();
    assert_eq!(
        bindings,
        vec![
            // select
            Value::Int(100),
            // join
            Value::from("internal"),
            Value::from("2024-01-01"),
            // where
            Value::Bool(true),
            Value::from("admin"),
            Value::from("owner"),
            Value::Int(18),
            Value::Int(65),
            Value::from("2024-01-01"),
            Value::Bool(true),
            Value::Bool(false),
            // group by, having, order
            Value::from("x"),
            Value::Int(0),
            Value::from("owner"),
            // union
            Value::Int(1),
        ]
    );
}

#[test]
fn test_sqlserver_offset_aligns() {
    let query = builder(Dialect::SqlServer)
        .select_raw("? as tag", vec![Value::from("t")])
        .from("users")
        .where_eq("active", true)
        .order_by_raw("case when id = ? then 0 else 1 end", vec![Value::Int(5)])
        .offset(20)
        .limit(10);
    assert_aligned(&query);
    assert_eq!(
        query.to_statement().unwrap().bindings,
        vec![Value::from("t"), Value::Int(5), Value::Int(1)]
    );
}

#[test]
fn test_sqlserver_offset_with_union_aligns() {
    let query = builder(Dialect::SqlServer)
        .from("users")
        .where_eq("active", 1)
        .offset(5)
        .union(|q: Builder| q.from("admins").where_eq("enabled", 1));
    assert_aligned(&query);
    assert!(query.to_sql().unwrap().contains(" union select * from (select * from [admins]"));
}

#[test]
fn test_booleans_bind_as_integers() {
    for dialect in Dialect::ALL {
        let query = builder(dialect)
            .from("users")
            .where_eq("active", true)
            .where_eq("banned", false);
        assert_eq!(
            query.to_statement().unwrap().bindings,
            vec![Value::Int(1), Value::Int(0)],
            "{dialect}"
        );
    }
}

#[test]
fn test_raw_expressions_add_no_bindings() {
    let query = builder(Dialect::Postgres)
        .from("users")
        .where_("created_at", "<", raw("now()"))
        .where_in("id", [Value::Raw(raw("1")), Value::Int(2)]);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where "created_at" < now() and "id" in (1, ?)"#
    );
    assert_eq!(query.get_bindings(), vec![Value::Int(2)]);
    assert_aligned(&query);
}

#[test]
fn test_substituted_bindings_reproduce_literal_query() {
    let query = builder(Dialect::Generic)
        .from("users")
        .where_eq("id", 1)
        .or_where_eq("name", "foo");
    assert_eq!(
        query.to_raw_sql().unwrap(),
        r#"select * from "users" where "id" = 1 or "name" = 'foo'"#
    );
}

#[test]
fn test_same_state_differs_only_in_quoting() {
    let build = |dialect| {
        builder(dialect)
            .select(["id"])
            .from("users")
            .where_eq("name", "foo")
            .to_sql()
            .unwrap()
    };
    assert_eq!(build(Dialect::MySql), "select `id` from `users` where `name` = ?");
    assert_eq!(build(Dialect::Postgres), r#"select "id" from "users" where "name" = ?"#);
    assert_eq!(build(Dialect::Sqlite), r#"select "id" from "users" where "name" = ?"#);
    assert_eq!(build(Dialect::SqlServer), "select [id] from [users] where [name] = ?");
}

#[test]
fn test_compilation_is_repeatable() {
    for dialect in Dialect::ALL {
        let query = every_clause(builder(dialect));
        let columns: Option<Vec<Column>> = query.columns.clone();
        let first = query.to_statement().unwrap();
        let second = query.to_statement().unwrap();
        assert_eq!(first, second);
        assert_eq!(query.columns, columns);
    }
}
