#[path = "../common/mod.rs"]
mod common;

use common::{assert_parses, builder, builder_with};
use quarry::sql::clause::Aggregate;
use quarry::sql::FullTextOptions;
use quarry::{raw, record, Builder, Column, Dialect, Grammar, GrammarConfig, QueryError, Value};

fn generic() -> Builder {
    builder(Dialect::Generic)
}

#[test]
fn test_select_star() {
    let query = generic().select(["*"]).from("users");
    assert_eq!(query.to_sql().unwrap(), r#"select * from "users""#);
    assert!(query.get_bindings().is_empty());
}

#[test]
fn test_basic_where() {
    let query = generic().select(["*"]).from("users").where_("id", "=", 1);
    let sql = query.to_sql().unwrap();
    assert_eq!(sql, r#"select * from "users" where "id" = ?"#);
    assert_eq!(query.get_bindings(), vec![Value::Int(1)]);
    assert_parses(Dialect::Generic, &sql);
}

#[test]
fn test_empty_where_in_is_always_false() {
    let query = generic().from("users").where_in("id", Vec::<i64>::new());
    assert_eq!(query.to_sql().unwrap(), r#"select * from "users" where 0 = 1"#);
    assert!(query.get_bindings().is_empty());
}

#[test]
fn test_empty_where_not_in_is_always_true() {
    let query = generic().from("users").where_not_in("id", Vec::<i64>::new());
    assert_eq!(query.to_sql().unwrap(), r#"select * from "users" where 1 = 1"#);
    assert!(query.get_bindings().is_empty());
}

#[test]
fn test_or_where() {
    let query = generic()
        .from("users")
        .where_("id", "=", 1)
        .or_where_eq("name", "foo");
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where "id" = ? or "name" = ?"#
    );
    assert_eq!(
        query.get_bindings(),
        vec![Value::Int(1), Value::Text("foo".into())]
    );
}

#[test]
fn test_union() {
    let query = generic()
        .from("a")
        .where_eq("id", 1)
        .union(|q: Builder| q.from("a").where_eq("id", 2));
    assert_eq!(
        query.to_sql().unwrap(),
        r#"(select * from "a" where "id" = ?) union (select * from "a" where "id" = ?)"#
    );
    assert_eq!(query.get_bindings(), vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_union_all_with_trailing_order_and_limit() {
    let query = generic()
        .from("a")
        .union_all(|q: Builder| q.from("b"))
        .order_by_desc("id")
        .limit(5);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"(select * from "a") union all (select * from "b") order by "id" desc limit 5"#
    );
}

#[test]
fn test_where_in_with_values() {
    let query = generic().from("users").where_in("id", [1, 2, 3]);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where "id" in (?, ?, ?)"#
    );
    assert_eq!(query.get_bindings().len(), 3);
}

#[test]
fn test_where_in_subquery() {
    let query = generic()
        .from("users")
        .where_in_sub("id", |q: Builder| q.select(["user_id"]).from("orders").where_eq("paid", true))
        .unwrap();
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where "id" in (select "user_id" from "orders" where "paid" = ?)"#
    );
    assert_eq!(query.get_bindings(), vec![Value::Bool(true)]);
}

#[test]
fn test_integer_in_raw_inlines_values() {
    let query = generic()
        .from("users")
        .where_integer_in_raw("id", [1, 2])
        .where_integer_not_in_raw("id", [3]);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where "id" in (1, 2) and "id" not in (3)"#
    );
    assert!(query.get_bindings().is_empty());
}

#[test]
fn test_null_and_between() {
    let query = generic()
        .from("users")
        .where_null("deleted_at")
        .where_between("age", 18, 65)
        .or_where_not_null("verified_at");
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where "deleted_at" is null and "age" between ? and ? or "verified_at" is not null"#
    );
    assert_eq!(query.get_bindings(), vec![Value::Int(18), Value::Int(65)]);
}

#[test]
fn test_between_columns_has_no_bindings() {
    let query = generic()
        .from("events")
        .where_between_columns("at", "starts_at", "ends_at");
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "events" where "at" between "starts_at" and "ends_at""#
    );
    assert!(query.get_bindings().is_empty());
}

#[test]
fn test_date_parts_use_functions() {
    let query = generic()
        .from("users")
        .where_date("created_at", "=", "2015-12-21")
        .where_year("created_at", ">", 2014);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where date("created_at") = ? and year("created_at") > ?"#
    );
}

#[test]
fn test_nested_where() {
    let query = generic()
        .from("users")
        .where_eq("email", "foo")
        .where_nested(|q: Builder| q.where_eq("name", "bar").or_where("age", ">", 30));
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where "email" = ? and ("name" = ? or "age" > ?)"#
    );
    assert_eq!(query.get_bindings().len(), 3);
}

#[test]
fn test_empty_nested_group_is_dropped() {
    let query = generic().from("users").where_nested(|q: Builder| q);
    assert_eq!(query.to_sql().unwrap(), r#"select * from "users""#);
}

#[test]
fn test_where_not_negates_group() {
    let query = generic()
        .from("users")
        .where_not(|q: Builder| q.where_eq("banned", true));
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where not ("banned" = ?)"#
    );
}

#[test]
fn test_where_exists() {
    let query = generic().from("orders").where_exists(|q: Builder| {
        q.select([raw("1")])
            .from("products")
            .where_column("products.id", "=", "orders.product_id")
    });
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "orders" where exists (select 1 from "products" where "products"."id" = "orders"."product_id")"#
    );
}

#[test]
fn test_where_sub() {
    let query = generic().from("users").where_sub("id", "=", |q: Builder| {
        q.select([raw("max(id)")]).from("users").where_eq("active", 1)
    });
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where "id" = (select max(id) from "users" where "active" = ?)"#
    );
    assert_eq!(query.get_bindings(), vec![Value::Int(1)]);
}

#[test]
fn test_row_values() {
    let query = generic()
        .from("posts")
        .where_row_values(["last_update", "order_number"], "<", [1, 2])
        .unwrap();
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "posts" where ("last_update", "order_number") < (?, ?)"#
    );

    let err = generic()
        .from("posts")
        .where_row_values(["a", "b"], "=", [1])
        .unwrap_err();
    assert!(matches!(err, QueryError::RowValuesMismatch { columns: 2, values: 1 }));
}

#[test]
fn test_null_equality_becomes_is_null() {
    let query = generic()
        .from("users")
        .where_("deleted_at", "=", Value::Null)
        .where_("name", "<>", Value::Null);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where "deleted_at" is null and "name" is not null"#
    );
    assert!(query.get_bindings().is_empty());
}

#[test]
fn test_unknown_operator_fails_at_compile() {
    let query = generic().from("users").where_("id", "=>", 1);
    assert!(matches!(query.to_sql(), Err(QueryError::InvalidOperator(op)) if op == "=>"));
}

#[test]
fn test_joins() {
    let query = generic()
        .select(["users.*", "contacts.phone"])
        .from("users")
        .join("contacts", "users.id", "=", "contacts.user_id")
        .left_join("orders", "users.id", "=", "orders.user_id")
        .cross_join("regions");
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select "users".*, "contacts"."phone" from "users" inner join "contacts" on "users"."id" = "contacts"."user_id" left join "orders" on "users"."id" = "orders"."user_id" cross join "regions""#
    );
}

#[test]
fn test_join_where_binds_value_before_where() {
    let query = generic()
        .from("users")
        .join_where("contacts", "contacts.kind", "=", "phone")
        .where_eq("users.id", 7);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" inner join "contacts" on "contacts"."kind" = ? where "users"."id" = ?"#
    );
    assert_eq!(
        query.get_bindings(),
        vec![Value::Text("phone".into()), Value::Int(7)]
    );
}

#[test]
fn test_groups_havings_orders_and_paging() {
    let query = generic()
        .select([Column::from("category"), Column::from(raw("count(*) as total"))])
        .from("products")
        .group_by(["category"])
        .having("total", ">", 3)
        .order_by("category", "desc")
        .unwrap()
        .limit(10)
        .offset(20);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select "category", count(*) as total from "products" group by "category" having "total" > ? order by "category" desc limit 10 offset 20"#
    );
}

#[test]
fn test_having_raw_and_null() {
    let query = generic()
        .from("orders")
        .group_by(["customer_id"])
        .having_raw("sum(amount) > ?", vec![Value::Int(100)])
        .having_not_null("customer_id");
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "orders" group by "customer_id" having sum(amount) > ? and "customer_id" is not null"#
    );
}

#[test]
fn test_distinct() {
    let query = generic().distinct().select(["country"]).from("users");
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select distinct "country" from "users""#
    );
}

#[test]
fn test_aggregate_leaves_columns_untouched() {
    let mut query = generic().select(["id"]).from("users");
    query.aggregate = Some(Aggregate {
        function: "count".into(),
        columns: vec![Column::from("*")],
    });
    let first = query.to_sql().unwrap();
    assert_eq!(first, r#"select count(*) as aggregate from "users""#);
    assert_eq!(query.to_sql().unwrap(), first);
    assert_eq!(query.columns, Some(vec![Column::from("id")]));
}

#[test]
fn test_aggregate_with_having_runs_over_derived_table() {
    let mut query = generic()
        .from("sales")
        .group_by(["region"])
        .having("region", "<>", "north");
    query.aggregate = Some(Aggregate {
        function: "count".into(),
        columns: vec![Column::from("*")],
    });
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select count(*) as aggregate from (select * from "sales" group by "region" having "region" <> ?) as "temp_table""#
    );
}

#[test]
fn test_random_order() {
    let query = generic().from("users").in_random_order("");
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" order by RANDOM()"#
    );
}

#[test]
fn test_locks_compile_to_nothing() {
    let query = generic().from("users").lock_for_update();
    assert_eq!(query.to_sql().unwrap(), r#"select * from "users""#);
}

#[test]
fn test_table_prefix() {
    let query = builder_with(Dialect::Generic, GrammarConfig::default().with_table_prefix("app_"))
        .select(["u.id"])
        .from("users as u");
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select "app_u"."id" from "app_users" as "app_u""#
    );
}

#[test]
fn test_json_and_full_text_are_unsupported() {
    let json = generic().from("users").where_eq("options->lang", "en");
    assert!(json.to_sql().unwrap_err().is_unsupported());

    let full_text = generic()
        .from("posts")
        .where_full_text(["body"], "rust", FullTextOptions::default());
    let err = full_text.to_sql().unwrap_err();
    assert!(matches!(err, QueryError::Unsupported { engine: "generic", .. }));
}

#[test]
fn test_index_hints_are_unsupported() {
    let query = generic().from("users").force_index("idx_email");
    assert!(query.to_sql().unwrap_err().is_unsupported());
}

#[test]
fn test_insert_update_delete_compilation() {
    let query = generic().from("users");
    let grammar = query.grammar().clone();

    let values = vec![record([("email", "a@x.io")]), record([("email", "b@x.io")])];
    assert_eq!(
        grammar.compile_insert(&query, &values).unwrap(),
        r#"insert into "users" ("email") values (?), (?)"#
    );
    assert_eq!(
        grammar.compile_insert(&query, &[record(Vec::<(&str, Value)>::new())]).unwrap(),
        r#"insert into "users" default values"#
    );

    let update = query.clone().where_eq("id", 1);
    assert_eq!(
        grammar.compile_update(&update, &record([("name", "Ann")])).unwrap(),
        r#"update "users" set "name" = ? where "id" = ?"#
    );
    assert_eq!(
        grammar.compile_delete(&update).unwrap(),
        r#"delete from "users" where "id" = ?"#
    );
    assert_eq!(
        grammar.compile_truncate(&query).unwrap(),
        vec![(r#"truncate table "users""#.to_string(), Vec::new())]
    );
}

#[test]
fn test_delete_with_joins() {
    let query = generic()
        .from("users as u")
        .join("contacts as c", "u.id", "=", "c.user_id")
        .where_eq("c.kind", "spam");
    assert_eq!(
        query.grammar().compile_delete(&query).unwrap(),
        r#"delete "u" from "users" as "u" inner join "contacts" as "c" on "u"."id" = "c"."user_id" where "c"."kind" = ?"#
    );
}

#[test]
fn test_missing_table_is_reported() {
    let query = generic();
    let err = query
        .grammar()
        .compile_delete(&query)
        .unwrap_err();
    assert!(matches!(err, QueryError::MissingTable("delete")));
}

#[test]
fn test_compile_exists() {
    let query = generic().from("users").where_eq("id", 1);
    assert_eq!(
        query.grammar().compile_exists(&query).unwrap(),
        r#"select exists(select * from "users" where "id" = ?) as "exists""#
    );
}

#[test]
fn test_raw_sql_inlines_literals() {
    let query = generic()
        .from("users")
        .where_eq("name", "O'Brien")
        .where_eq("active", true);
    assert_eq!(
        query.to_raw_sql().unwrap(),
        r#"select * from "users" where "name" = 'O''Brien' and "active" = 1"#
    );
}
