#[path = "../common/mod.rs"]
mod common;

use common::{assert_parses, builder};
use quarry::sql::{FullTextOptions, UpsertUpdate};
use quarry::{record, Builder, Dialect, Grammar, Value};

fn pgsql() -> Builder {
    builder(Dialect::Postgres)
}

#[test]
fn test_basic_select_parses() {
    let query = pgsql()
        .select(["id", "email"])
        .from("users")
        .where_("id", ">", 10)
        .order_by_desc("id")
        .limit(5)
        .offset(10);
    let sql = query.to_sql().unwrap();
    assert_eq!(
        sql,
        r#"select "id", "email" from "users" where "id" > ? order by "id" desc limit 5 offset 10"#
    );
    assert_parses(Dialect::Postgres, &sql);
}

#[test]
fn test_json_selectors() {
    let query = pgsql()
        .from("users")
        .where_eq("options->language", "en")
        .where_eq("meta->tags->0", "rust");
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where "options"->>'language' = ? and "meta"->'tags'->>0 = ?"#
    );
}

#[test]
fn test_json_boolean_compares_jsonb() {
    let query = pgsql().from("users").where_("options->active", "=", false);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where ("options"->'active')::jsonb = 'false'::jsonb"#
    );
}

#[test]
fn test_like_casts_to_text() {
    let query = pgsql().from("users").where_("id", "like", "12%");
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where "id"::text like ?"#
    );
}

#[test]
fn test_bitwise_operator() {
    let query = pgsql().from("users").where_("flags", "&", 4);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where ("flags" & ?)::bool"#
    );
    assert_eq!(query.get_bindings(), vec![Value::Int(4)]);
}

#[test]
fn test_date_parts() {
    let query = pgsql()
        .from("users")
        .where_date("created_at", "=", "2015-12-21")
        .where_time("created_at", ">", "10:00:00")
        .where_year("created_at", "=", 2015);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where "created_at"::date = ? and "created_at"::time > ? and extract(year from "created_at") = ?"#
    );
}

#[test]
fn test_full_text() {
    let query = pgsql()
        .from("posts")
        .where_full_text(["title", "body"], "rust", FullTextOptions::default());
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "posts" where (to_tsvector('english', "title") || to_tsvector('english', "body")) @@ plainto_tsquery('english', ?)"#
    );

    let query = pgsql().from("posts").where_full_text(
        ["body"],
        "rust async",
        FullTextOptions::default().language("german").mode("websearch"),
    );
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "posts" where (to_tsvector('german', "body")) @@ websearch_to_tsquery('german', ?)"#
    );
}

#[test]
fn test_unknown_full_text_language_falls_back_to_english() {
    let query = pgsql().from("posts").where_full_text(
        ["body"],
        "x",
        FullTextOptions::default().language("klingon"),
    );
    assert!(query.to_sql().unwrap().contains("to_tsvector('english', \"body\")"));
}

#[test]
fn test_json_contains_and_length() {
    let query = pgsql()
        .from("users")
        .where_json_contains("options->languages", "en")
        .where_json_length("options->tags", ">=", 1);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from "users" where ("options"->'languages')::jsonb @> ? and jsonb_array_length(("options"->'tags')::jsonb) >= ?"#
    );
    assert_eq!(query.get_bindings()[0], Value::Text("\"en\"".into()));
}

#[test]
fn test_distinct_on() {
    let query = pgsql()
        .distinct_on(["user_id"])
        .select(["user_id", "created_at"])
        .from("logins");
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select distinct on ("user_id") "user_id", "created_at" from "logins""#
    );
}

#[test]
fn test_locks() {
    assert_eq!(
        pgsql().from("users").lock_for_update().to_sql().unwrap(),
        r#"select * from "users" for update"#
    );
    assert_eq!(
        pgsql().from("users").shared_lock().to_sql().unwrap(),
        r#"select * from "users" for share"#
    );
}

#[test]
fn test_insert_or_ignore_and_get_id() {
    let query = pgsql().from("users");
    let grammar = query.grammar().clone();
    let values = record([("email", "a@x.io")]);
    assert_eq!(
        grammar
            .compile_insert_or_ignore(&query, std::slice::from_ref(&values))
            .unwrap(),
        r#"insert into "users" ("email") values (?) on conflict do nothing"#
    );
    assert_eq!(
        grammar.compile_insert_get_id(&query, &values, None).unwrap(),
        r#"insert into "users" ("email") values (?) returning "id""#
    );
    assert_eq!(
        grammar
            .compile_insert_get_id(&query, &values, Some("user_id"))
            .unwrap(),
        r#"insert into "users" ("email") values (?) returning "user_id""#
    );
}

#[test]
fn test_upsert_on_conflict() {
    let query = pgsql().from("users");
    let values = [record([("email", "a@x.io"), ("name", "Ann")])];
    let sql = query
        .grammar()
        .compile_upsert(
            &query,
            &values,
            &["email".to_string()],
            &[UpsertUpdate::from("name"), UpsertUpdate::value("visits", 1)],
        )
        .unwrap();
    assert_eq!(
        sql,
        r#"insert into "users" ("email", "name") values (?, ?) on conflict ("email") do update set "name" = "excluded"."name", "visits" = ?"#
    );
    assert_parses(Dialect::Postgres, &sql);
}

#[test]
fn test_update_with_join_uses_ctid() {
    let query = pgsql()
        .from("users")
        .join("contacts", "users.id", "=", "contacts.user_id")
        .where_eq("contacts.kind", "spam");
    let values = record([("flagged", true)]);
    let grammar = query.grammar().clone();
    assert_eq!(
        grammar.compile_update(&query, &values).unwrap(),
        r#"update "users" set "flagged" = ? where "ctid" in (select "users"."ctid" from "users" inner join "contacts" on "users"."id" = "contacts"."user_id" where "contacts"."kind" = ?)"#
    );
    assert_eq!(
        grammar.prepare_bindings_for_update(query.raw_bindings(), &values),
        vec![Value::Bool(true), Value::Text("spam".into())]
    );
}

#[test]
fn test_delete_with_limit_uses_ctid() {
    let query = pgsql().from("logs").where_eq("level", "debug").limit(10);
    assert_eq!(
        query.grammar().compile_delete(&query).unwrap(),
        r#"delete from "logs" where "ctid" in (select "logs"."ctid" from "logs" where "level" = ? limit 10)"#
    );
}

#[test]
fn test_json_update_uses_jsonb_set() {
    let query = pgsql().from("users").where_eq("id", 1);
    let values = record([("options->theme", "dark")]);
    let grammar = query.grammar().clone();
    assert_eq!(
        grammar.compile_update(&query, &values).unwrap(),
        r#"update "users" set "options" = jsonb_set("options"::jsonb, '{"theme"}', ?) where "id" = ?"#
    );
    assert_eq!(
        grammar.prepare_bindings_for_update(query.raw_bindings(), &values),
        vec![Value::Text("\"dark\"".into()), Value::Int(1)]
    );
}

#[test]
fn test_truncate_restarts_identity() {
    let query = pgsql().from("users");
    assert_eq!(
        query.grammar().compile_truncate(&query).unwrap(),
        vec![(
            r#"truncate "users" restart identity cascade"#.to_string(),
            Vec::new()
        )]
    );
}

#[test]
fn test_booleans_are_literals_in_raw_sql() {
    let query = pgsql().from("users").where_eq("active", true);
    assert_eq!(
        query.grammar().escape(&Value::Bool(true)).unwrap(),
        "true"
    );
    assert_eq!(query.to_statement().unwrap().bindings, vec![Value::Int(1)]);
}
