#[path = "../common/mod.rs"]
mod common;

use chrono::NaiveDate;
use common::{assert_parses, builder};
use quarry::sql::clause::Aggregate;
use quarry::sql::UpsertUpdate;
use quarry::{record, Builder, Column, Dialect, Grammar, Value};

fn sqlsrv() -> Builder {
    builder(Dialect::SqlServer)
}

#[test]
fn test_bracket_quoting() {
    let query = sqlsrv().from("users").where_eq("id", 1);
    let sql = query.to_sql().unwrap();
    assert_eq!(sql, "select * from [users] where [id] = ?");
    assert_parses(Dialect::SqlServer, &sql);
    assert_eq!(query.grammar().wrap_value("a]b"), "[a]]b]");
}

#[test]
fn test_limit_becomes_top() {
    let query = sqlsrv().select(["id"]).from("users").limit(10);
    let sql = query.to_sql().unwrap();
    assert_eq!(sql, "select top 10 [id] from [users]");
    assert_parses(Dialect::SqlServer, &sql);
}

#[test]
fn test_offset_uses_row_number() {
    let query = sqlsrv()
        .from("users")
        .order_by_asc("id")
        .offset(10)
        .limit(10);
    assert_eq!(
        query.to_sql().unwrap(),
        "select * from (select *, row_number() over (order by [id] asc) as row_num from [users]) as temp_table where row_num between 11 and 20 order by row_num"
    );
}

#[test]
fn test_offset_without_order_or_limit() {
    let query = sqlsrv().from("users").skip(5);
    assert_eq!(
        query.to_sql().unwrap(),
        "select * from (select *, row_number() over (order by (select 0)) as row_num from [users]) as temp_table where row_num >= 6 order by row_num"
    );
}

#[test]
fn test_offset_moves_order_bindings_ahead_of_where() {
    let query = sqlsrv()
        .from("users")
        .where_eq("active", 1)
        .order_by_raw("case when [id] = ? then 0 else 1 end", vec![Value::Int(5)])
        .offset(5);
    let statement = query.to_statement().unwrap();
    assert_eq!(
        statement.sql,
        "select * from (select *, row_number() over (order by case when [id] = ? then 0 else 1 end) as row_num from [users] where [active] = ?) as temp_table where row_num >= 6 order by row_num"
    );
    assert_eq!(statement.bindings, vec![Value::Int(5), Value::Int(1)]);
    assert_eq!(query.get_bindings(), vec![Value::Int(1), Value::Int(5)]);
}

#[test]
fn test_offset_bounds_saturate() {
    let query = sqlsrv().from("users").offset(u64::MAX - 1).limit(10);
    assert_eq!(
        query.to_sql().unwrap(),
        "select * from (select *, row_number() over (order by (select 0)) as row_num from [users]) as temp_table where row_num between 18446744073709551615 and 18446744073709551615 order by row_num"
    );
}

#[test]
fn test_union_limit_and_offset_use_row_number() {
    let query = sqlsrv()
        .from("users")
        .union(|q: Builder| q.from("admins"))
        .limit(10)
        .offset(5);
    let sql = query.to_sql().unwrap();
    assert_eq!(
        sql,
        "select * from (select *, row_number() over (order by (select 0)) as row_num from (select * from (select * from [users]) as [temp_table] union select * from (select * from [admins]) as [temp_table]) as [temp_table]) as temp_table where row_num between 6 and 15 order by row_num"
    );
    assert!(!sql.ends_with(' '));
}

#[test]
fn test_union_orders_move_into_window() {
    let query = sqlsrv()
        .from("users")
        .where_eq("active", 1)
        .union(|q: Builder| q.from("admins").where_eq("enabled", 1))
        .order_by_raw("case when [id] = ? then 0 else 1 end", vec![Value::Int(7)])
        .limit(10);
    let statement = query.to_statement().unwrap();
    assert_eq!(
        statement.sql,
        "select * from (select *, row_number() over (order by case when [id] = ? then 0 else 1 end) as row_num from (select * from (select * from [users] where [active] = ?) as [temp_table] union select * from (select * from [admins] where [enabled] = ?) as [temp_table]) as [temp_table]) as temp_table where row_num between 1 and 10 order by row_num"
    );
    assert_eq!(
        statement.bindings,
        vec![Value::Int(7), Value::Int(1), Value::Int(1)]
    );
}

#[test]
fn test_unpaged_union_keeps_trailing_order() {
    let query = sqlsrv()
        .from("users")
        .union(|q: Builder| q.from("admins"))
        .order_by_asc("id");
    assert_eq!(
        query.to_sql().unwrap(),
        "select * from (select * from [users]) as [temp_table] union select * from (select * from [admins]) as [temp_table] order by [id] asc"
    );
}

#[test]
fn test_aggregate_ignores_offset_rewrite() {
    let mut query = sqlsrv().from("users").where_eq("active", 1).offset(5);
    query.aggregate = Some(Aggregate {
        function: "count".into(),
        columns: vec![Column::from("*")],
    });
    let sql = query.to_sql().unwrap();
    assert_eq!(sql, "select count(*) as aggregate from [users] where [active] = ?");
    assert!(!sql.contains("row_num"));
}

#[test]
fn test_locks_are_table_hints() {
    let query = sqlsrv().from("users").where_eq("id", 1).lock_for_update();
    assert_eq!(
        query.to_sql().unwrap(),
        "select * from [users] with(rowlock,updlock,holdlock) where [id] = ?"
    );
    let query = sqlsrv().from("users").shared_lock();
    assert_eq!(
        query.to_sql().unwrap(),
        "select * from [users] with(rowlock,holdlock)"
    );
}

#[test]
fn test_date_parts() {
    let query = sqlsrv()
        .from("users")
        .where_date("created_at", "=", "2015-12-21")
        .where_day("created_at", "=", 7);
    assert_eq!(
        query.to_sql().unwrap(),
        "select * from [users] where cast([created_at] as date) = ? and day([created_at]) = ?"
    );
}

#[test]
fn test_json_selectors() {
    let query = sqlsrv()
        .from("users")
        .where_eq("options->language", "en")
        .where_("options->active", "=", true);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from [users] where json_value([options], '$."language"') = ? and json_value([options], '$."active"') = 'true'"#
    );
    assert_eq!(query.get_bindings(), vec![Value::Text("en".into())]);
}

#[test]
fn test_json_contains_and_length() {
    let query = sqlsrv()
        .from("users")
        .where_json_contains("options->flags", true)
        .where_json_length("options->tags", ">", 1);
    assert_eq!(
        query.to_sql().unwrap(),
        r#"select * from [users] where ? in (select [value] from openjson([options], '$."flags"')) and (select count(*) from openjson([options], '$."tags"')) > ?"#
    );
    assert_eq!(
        query.get_bindings(),
        vec![Value::Text("true".into()), Value::Int(1)]
    );
}

#[test]
fn test_bitwise_and_random() {
    let query = sqlsrv().from("users").where_("flags", "&", 4).in_random_order("");
    assert_eq!(
        query.to_sql().unwrap(),
        "select * from [users] where ([flags] & ?) != 0 order by NEWID()"
    );
}

#[test]
fn test_union_wraps_derived_tables() {
    let query = sqlsrv().from("a").union(|q: Builder| q.from("b"));
    assert_eq!(
        query.to_sql().unwrap(),
        "select * from (select * from [a]) as [temp_table] union select * from (select * from [b]) as [temp_table]"
    );
}

#[test]
fn test_exists_selects_top_one() {
    let query = sqlsrv().from("users").where_eq("id", 1);
    assert_eq!(
        query.grammar().compile_exists(&query).unwrap(),
        "select top 1 1 [exists] from [users] where [id] = ?"
    );
}

#[test]
fn test_upsert_compiles_merge() {
    let query = sqlsrv().from("users");
    let values = [record([("email", "a@x.io"), ("name", "Ann")])];
    let sql = query
        .grammar()
        .compile_upsert(&query, &values, &["email".to_string()], &[UpsertUpdate::from("name")])
        .unwrap();
    assert_eq!(
        sql,
        "merge [users] using (values (?, ?)) [merge_source] ([email], [name]) on [merge_source].[email] = [users].[email] when matched then update set [name] = [merge_source].[name] when not matched then insert ([email], [name]) values ([email], [name]);"
    );
}

#[test]
fn test_update_with_join() {
    let query = sqlsrv()
        .from("users as u")
        .join("contacts as c", "u.id", "=", "c.user_id")
        .where_eq("c.kind", "spam");
    let values = record([("flagged", 1)]);
    let grammar = query.grammar().clone();
    assert_eq!(
        grammar.compile_update(&query, &values).unwrap(),
        "update [u] set [flagged] = ? from [users] as [u] inner join [contacts] as [c] on [u].[id] = [c].[user_id] where [c].[kind] = ?"
    );
    assert_eq!(
        grammar.prepare_bindings_for_update(query.raw_bindings(), &values),
        vec![Value::Int(1), Value::Text("spam".into())]
    );
}

#[test]
fn test_delete_with_limit_uses_top() {
    let query = sqlsrv().from("logs").where_eq("level", "debug").limit(100);
    assert_eq!(
        query.grammar().compile_delete(&query).unwrap(),
        "delete top (100) from [logs] where [level] = ?"
    );
}

#[test]
fn test_timestamps_keep_milliseconds() {
    let at = NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_milli_opt(8, 5, 1, 250)
        .unwrap();
    let query = sqlsrv().from("events").where_("at", ">", at);
    assert_eq!(
        query.to_statement().unwrap().bindings,
        vec![Value::Text("2024-03-09 08:05:01.250".into())]
    );
}
