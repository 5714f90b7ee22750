// Mutation Tests
//
// `update` and `replace` over multi-row and single-row selections, with and
// without the non-atomic acknowledgment.

mod common;

use common::{Harness, doc};
use pretty_assertions::assert_eq;
use reql_eval::query::{branch, expr, func1, func2, js, table};
use reql_eval::{Term, Value};
use serde_json::json;

fn tbl() -> Term {
    table("tbl")
}

fn obj(pairs: Vec<(&str, Term)>) -> Term {
    Term::MakeObject(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// Sum of field `x` over every row.
fn x_total(h: &Harness) -> Value {
    h.ok(&tbl()
        .map(func1(|r| r.get_field("x")))
        .reduce(0, func2(|a, b| a + b)))
}

// ============================================================================
// Plain update and replace
// ============================================================================

#[test]
fn test_replace_identity_and_update_null() {
    let h = Harness::new();
    let docs: Vec<serde_json::Value> = (0..10)
        .map(|n| json!({"id": 100 + n, "a": n, "b": n % 3}))
        .collect();
    h.ok(&tbl().insert(serde_json::Value::from(docs.clone())));

    assert_eq!(
        h.ok(&tbl().replace(func1(|x| x))),
        doc(json!({"modified": 10, "deleted": 0, "inserted": 0, "errors": 0}))
    );
    assert_eq!(
        h.ok(&tbl().order_by(["id"])),
        doc(serde_json::Value::from(docs))
    );
    assert_eq!(
        h.ok(&tbl().update(())),
        doc(json!({"updated": 0, "skipped": 10, "errors": 0}))
    );
}

#[test]
fn test_update_merges() {
    let h = Harness::with_ids(3);
    assert_eq!(
        h.count(&tbl().update(func1(|r| obj(vec![("double", r.get_field("id") * 2)]))), "updated"),
        3
    );
    assert_eq!(
        h.ok(&tbl().get(2)),
        doc(json!({"id": 2, "double": 4}))
    );
}

#[test]
fn test_noop_update_counts_as_updated() {
    let h = Harness::with_ids(2);
    h.ok(&tbl().update(json!({"x": 1})));
    assert_eq!(
        h.ok(&tbl().update(json!({"x": 1}))),
        doc(json!({"updated": 2, "skipped": 0, "errors": 0}))
    );
    assert_eq!(h.ok(&tbl().get(1)), doc(json!({"id": 1, "x": 1})));
}

#[test]
fn test_update_cannot_change_primary_key() {
    let h = Harness::with_ids(2);
    let response = h.ok(&tbl().update(func1(|r| obj(vec![("id", r.get_field("id") + 10)]))));
    let fields = response.as_object().cloned().unwrap_or_default();
    assert_eq!(fields["errors"], Value::from(2));
    assert!(fields["first_error"].as_str().unwrap_or_default().contains("cannot be changed"));
    h.exec_err(
        &tbl().get(0).update(json!({"id": 5})),
        "cannot be changed",
    );
}

#[test]
fn test_update_requires_object() {
    let h = Harness::with_ids(1);
    h.exec_err(&tbl().get(0).update(5), "object");
}

#[test]
fn test_update_missing_row_is_skipped() {
    let h = Harness::with_ids(1);
    assert_eq!(
        h.ok(&tbl().get(42).update(json!({"x": 1}))),
        doc(json!({"updated": 0, "skipped": 1, "errors": 0}))
    );
}

#[test]
fn test_mutation_requires_selection() {
    let h = Harness::with_ids(1);
    h.exec_err(&expr(json!([{"id": 0}])).update(json!({"x": 1})), "table selection");
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_det() {
    let h = Harness::with_ids(10);
    let data: Vec<serde_json::Value> = (0..10).map(|x| json!({"id": x})).collect();

    assert_eq!(h.count(&tbl().update(func1(|_| obj(vec![("count", js("0"))]))), "errors"), 10);
    assert_eq!(h.count(&tbl().update(func1(|_| obj(vec![("count", expr(0))]))), "updated"), 10);
    assert_eq!(
        h.count(&tbl().replace(func1(|r| tbl().get(r.get_field("id")))), "errors"),
        10
    );
    h.ok(&tbl().replace(func1(|r| r)));

    let table_sum = tbl()
        .map(func1(|x| x.get_field("count")))
        .reduce(0, func2(|a, b| a + b));
    assert_eq!(h.count(&tbl().update(obj(vec![("count", table_sum)])), "errors"), 10);

    let data_sum = expr(serde_json::Value::from(data))
        .map(func1(|x| x.get_field("id")))
        .reduce(0, func2(|a, b| a + b));
    assert_eq!(h.count(&tbl().update(obj(vec![("count", data_sum)])), "updated"), 10);
    assert_eq!(h.ok(&tbl().get(3).get_field("count")), Value::from(45));
}

#[test]
fn test_refused_mutation_writes_nothing() {
    let h = Harness::with_ids(4);
    let response = h.ok(&tbl().update(func1(|_| obj(vec![("x", js("1"))]))));
    let fields = response.as_object().cloned().unwrap_or_default();
    assert_eq!(fields["errors"], Value::from(4));
    assert!(fields["first_error"].as_str().unwrap_or_default().contains("deterministic"));
    assert_eq!(h.ok(&tbl().filter(func1(|r| r.contains("x"))).count()), Value::from(0));
}

// ============================================================================
// Non-atomic mutations
// ============================================================================

#[test]
fn test_nonatomic() {
    let h = Harness::with_ids(10);
    assert_eq!(h.count(&tbl().update(json!({"count": 0})), "updated"), 10);

    // Update modify
    let set_x = |src: &str| {
        let src = src.to_string();
        func1(move |_| obj(vec![("x", js(src))]))
    };
    assert_eq!(h.count(&tbl().update(set_x("1")), "errors"), 10);
    assert_eq!(h.count(&tbl().update_with(set_x("1"), true), "updated"), 10);
    assert_eq!(x_total(&h), Value::from(10));

    h.construction_err(&tbl().get(0).update(set_x("1")), "deterministic");
    assert_eq!(h.count(&tbl().get(0).update_with(set_x("2"), true), "updated"), 1);
    assert_eq!(x_total(&h), Value::from(11));

    // Update error
    assert_eq!(h.count(&tbl().update(set_x("x")), "errors"), 10);
    assert_eq!(h.count(&tbl().update_with(set_x("x"), true), "errors"), 10);
    assert_eq!(x_total(&h), Value::from(11));

    h.construction_err(&tbl().get(0).update(set_x("x")), "deterministic");
    h.exec_err(&tbl().get(0).update_with(set_x("x"), true), "not defined");
    assert_eq!(x_total(&h), Value::from(11));

    // Update skipped
    let skip = || branch(js("true"), (), json!({"x": 0.1}));
    assert_eq!(h.count(&tbl().update(func1(|_| skip())), "errors"), 10);
    assert_eq!(h.count(&tbl().update_with(func1(|_| skip()), true), "skipped"), 10);
    assert_eq!(x_total(&h), Value::from(11));

    h.construction_err(&tbl().get(0).update(skip()), "deterministic");
    assert_eq!(h.count(&tbl().get(0).update_with(skip(), true), "skipped"), 1);
    assert_eq!(x_total(&h), Value::from(11));

    // Replace modify
    let keep = || func1(|r| branch(js("true"), r, ()));
    h.construction_err(&tbl().get(0).replace(keep()), "deterministic");
    assert_eq!(h.count(&tbl().get(0).replace_with(keep(), true), "modified"), 1);
    assert_eq!(x_total(&h), Value::from(11));

    let bump_one = || {
        func1(|r| {
            branch(
                js(format!("{}.id == 1", r)),
                r.clone().merge(json!({"x": 2})),
                r,
            )
        })
    };
    assert_eq!(h.count(&tbl().replace(bump_one()), "errors"), 10);
    assert_eq!(h.count(&tbl().replace_with(bump_one(), true), "modified"), 10);
    assert_eq!(x_total(&h), Value::from(12));

    // Replace error
    let undefined = || func1(|r| branch(js("x"), r, ()));
    h.construction_err(&tbl().get(0).replace(undefined()), "deterministic");
    h.exec_err(&tbl().get(0).replace_with(undefined(), true), "not defined");
    assert_eq!(x_total(&h), Value::from(12));

    assert_eq!(h.count(&tbl().replace(undefined()), "errors"), 10);
    assert_eq!(h.count(&tbl().replace_with(undefined(), true), "errors"), 10);
    assert_eq!(x_total(&h), Value::from(12));

    // Replace delete
    let drop = || func1(|r| branch(js("true"), (), r));
    h.construction_err(&tbl().get(0).replace(drop()), "deterministic");
    assert_eq!(h.count(&tbl().get(0).replace_with(drop(), true), "deleted"), 1);
    assert_eq!(x_total(&h), Value::from(10));

    let drop_low = || func1(|r| branch(js(format!("{}.id < 3", r)), (), r));
    assert_eq!(h.count(&tbl().replace(drop_low()), "errors"), 9);
    assert_eq!(
        h.ok(&tbl().replace_with(drop_low(), true)),
        doc(json!({"inserted": 0, "deleted": 2, "errors": 0, "modified": 7}))
    );
    assert_eq!(x_total(&h), Value::from(7));

    // Replace insert
    let restore_zero = || {
        obj(vec![
            ("id", expr(0)),
            ("count", tbl().get(3).get_field("count")),
            ("x", tbl().get(3).get_field("x")),
        ])
    };
    h.construction_err(&tbl().get(0).replace(restore_zero()), "deterministic");
    assert_eq!(h.count(&tbl().get(0).replace_with(restore_zero(), true), "inserted"), 1);
    assert_eq!(
        h.ok(&tbl().get(0)),
        doc(json!({"id": 0, "count": 0, "x": 1}))
    );

    let copy_of_three = |id: i32| tbl().get(3).merge(json!({"id": id}));
    h.construction_err(&tbl().get(1).replace(copy_of_three(1)), "deterministic");
    assert_eq!(h.count(&tbl().get(1).replace_with(copy_of_three(1), true), "inserted"), 1);
    assert_eq!(h.count(&tbl().get(2).replace_with(copy_of_three(2), true), "inserted"), 1);
    assert_eq!(x_total(&h), Value::from(10));
}

#[test]
fn test_replace_with_different_key_is_an_error() {
    let h = Harness::with_ids(2);
    h.exec_err(&tbl().get(0).replace(json!({"id": 9})), "cannot be changed");
    h.exec_err(&tbl().get(0).replace(json!({"name": "keyless"})), "missing");
    assert_eq!(
        h.count(&tbl().replace(func1(|_| expr(json!({"id": 9})))), "errors"),
        2
    );
}
