// Datum Operator Tests
//
// Arithmetic, comparison, logic, bindings and object/array operators over
// literal data. No table is involved.

mod common;

use common::{doc, exec_err, ok, run};
use pretty_assertions::assert_eq;
use reql_eval::query::{branch, expr, let_, letvar};
use reql_eval::{Term, Value};
use rstest::rstest;
use serde_json::json;

fn range(n: i32) -> Term {
    expr((0..n).collect::<Vec<_>>())
}

fn numbers(items: &[i32]) -> Value {
    Value::Array(items.iter().map(|&n| Value::from(n)).collect())
}

// ============================================================================
// Arithmetic
// ============================================================================

#[rstest]
#[case(expr(3) + 4, 7.0)]
#[case(expr(3) + 4 + 5, 12.0)]
#[case(-expr(3), -3.0)]
#[case(expr(0) - 3, -3.0)]
#[case(expr(10) - 1 - 2, 7.0)]
#[case(expr(4) * 5 * 6, 120.0)]
#[case(expr(12) / 3 / 4, 1.0)]
#[case(expr(3) / 4, 0.75)]
#[case(expr(4) % 3, 1.0)]
#[case(3 + expr(4), 7.0)]
#[case(3 - expr(4), -1.0)]
#[case(3 * expr(4), 12.0)]
#[case(3 / expr(4), 0.75)]
#[case(3 % expr(2), 1.0)]
#[case((expr(3) + 4) * -expr(6) * (expr(-5) + 3), 84.0)]
fn test_arithmetic(#[case] query: Term, #[case] expected: f64) {
    assert_eq!(ok(&query), Value::Number(expected));
}

#[rstest]
#[case(expr(4) + expr(vec![0]))]
#[case(-expr(vec![0]))]
#[case(expr(4) - expr(vec![0]))]
#[case(expr(4) * expr(vec![0]))]
#[case(expr(4) / expr(vec![0]))]
#[case(expr(Vec::<i32>::new()) % 3)]
#[case(expr(3) % expr(Vec::<i32>::new()))]
#[case(expr(1) + expr(vec![1]))]
fn test_arithmetic_requires_numbers(#[case] query: Term) {
    exec_err(&query, "number");
}

// ============================================================================
// Comparison
// ============================================================================

#[rstest]
#[case(expr(3).eq(3), true)]
#[case(expr(3).eq(4), false)]
#[case(expr(3).ne(3), false)]
#[case(expr(3).ne(4), true)]
#[case(expr(3).gt(2), true)]
#[case(expr(3).gt(3), false)]
#[case(expr(3).ge(3), true)]
#[case(expr(3).ge(4), false)]
#[case(expr(3).lt(3), false)]
#[case(expr(3).lt(4), true)]
#[case(expr(3).le(3), true)]
#[case(expr(3).le(2), false)]
#[case(expr("asdf").eq("asdf"), true)]
#[case(expr("asd").eq("asdf"), false)]
#[case(expr("a").lt("b"), true)]
#[case(expr(true).eq(true), true)]
#[case(expr(false).lt(true), true)]
#[case(expr(true).lt(1), true)]
#[case(expr(1).lt(""), true)]
#[case(expr("").lt(expr(Vec::<i32>::new())), true)]
#[case(expr(json!([])).lt(json!({})), true)]
#[case(expr(()).lt(false), true)]
fn test_comparison_is_total(#[case] query: Term, #[case] expected: bool) {
    assert_eq!(ok(&query), Value::Bool(expected));
}

// ============================================================================
// Logic
// ============================================================================

#[test]
fn test_junctions() {
    assert_eq!(ok(&(expr(true) | false)), Value::Bool(true));
    assert_eq!(ok(&(expr(false) | true)), Value::Bool(true));
    assert_eq!(ok(&(expr(false) | false | true)), Value::Bool(true));
    assert_eq!(ok(&(expr(true) & false)), Value::Bool(false));
    assert_eq!(ok(&(expr(true) & true & true)), Value::Bool(true));

    exec_err(&(expr(true) & 3), "bool");
    exec_err(&(expr(true) & 4), "bool");
}

#[test]
fn test_not() {
    assert_eq!(ok(&!expr(true)), Value::Bool(false));
    assert_eq!(ok(&!expr(false)), Value::Bool(true));
    exec_err(&!expr(3), "bool");
}

// ============================================================================
// Bindings
// ============================================================================

#[test]
fn test_let() {
    assert_eq!(ok(&let_([("x", 3)], letvar("x"))), Value::from(3));
    assert_eq!(ok(&let_([("x", 3), ("x", 4)], letvar("x"))), Value::from(4));
    assert_eq!(ok(&let_([("x", 3), ("y", 4)], letvar("x"))), Value::from(3));
    assert_eq!(
        ok(&let_([("x", expr(3)), ("y", letvar("x") * 2)], letvar("y"))),
        Value::from(6)
    );
}

#[test]
fn test_unbound_variable_is_rejected_before_running() {
    let err = run(&letvar("x")).unwrap_err();
    assert!(err.is_construction());
    assert!(err.to_string().contains("not in scope"));
}

#[test]
fn test_branch() {
    assert_eq!(ok(&branch(true, 3, 4)), Value::from(3));
    assert_eq!(ok(&branch(false, 4, 5)), Value::from(5));
    assert_eq!(ok(&branch(expr(3).eq(3), "foo", "bar")), Value::from("foo"));
    exec_err(&branch(5, 1, 2), "bool");
}

#[test]
fn test_untaken_branch_is_not_evaluated() {
    assert_eq!(ok(&branch(true, 1, expr(1) + "x")), Value::from(1));
}

// ============================================================================
// Objects
// ============================================================================

#[test]
fn test_attr() {
    let obj = || expr(json!({"foo": 3}));
    assert_eq!(ok(&obj().contains("foo")), Value::Bool(true));
    assert_eq!(ok(&obj().contains("bar")), Value::Bool(false));
    assert_eq!(ok(&obj().get_field("foo")), Value::from(3));
    exec_err(&obj().get_field("bar"), "missing attribute");

    let nested = expr(json!({"a": {"b": 3}})).get_field("a").get_field("b");
    assert_eq!(ok(&nested), Value::from(3));
}

#[test]
fn test_merge() {
    assert_eq!(
        ok(&expr(json!({"a": 5})).merge(json!({"b": 3}))),
        doc(json!({"a": 5, "b": 3}))
    );
    assert_eq!(
        ok(&expr(json!({"a": 5})).merge(json!({"a": 3}))),
        doc(json!({"a": 3}))
    );
    assert_eq!(
        ok(&expr(json!({"a": 5, "b": 1}))
            .merge(json!({"a": 3}))
            .merge(json!({"b": 6}))),
        doc(json!({"a": 3, "b": 6}))
    );

    exec_err(&expr(5).merge(json!({"a": 3})), "object");
    exec_err(&expr(json!({"a": 5})).merge(5), "object");
}

#[test]
fn test_picks() {
    let obj = || expr(json!({"a": 1, "b": 2, "c": 3}));
    let arr = || expr(json!([{"a": 1, "b": 2, "c": 3}, {"a": 1, "b": 2, "c": 3}]));

    assert_eq!(ok(&obj().pick(["a", "b"])), doc(json!({"a": 1, "b": 2})));
    assert_eq!(ok(&obj().unpick(["a", "b"])), doc(json!({"c": 3})));
    assert_eq!(ok(&obj().pick(["a", "zz"])), doc(json!({"a": 1})));

    assert_eq!(
        ok(&arr().pluck(["a", "b"])),
        doc(json!([{"a": 1, "b": 2}, {"a": 1, "b": 2}]))
    );
    assert_eq!(
        ok(&arr().without(["a", "b"])),
        doc(json!([{"c": 3}, {"c": 3}]))
    );
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_append_and_concat() {
    assert_eq!(ok(&expr(Vec::<i32>::new()).append(2)), numbers(&[2]));
    assert_eq!(ok(&expr(vec![1]).append(2)), numbers(&[1, 2]));
    exec_err(&expr(3).append(0), "array");

    assert_eq!(ok(&(expr(vec![1]) + expr(vec![2]))), numbers(&[1, 2]));
    assert_eq!(
        ok(&(expr(vec![1, 2]) + expr(Vec::<i32>::new()))),
        numbers(&[1, 2])
    );
    exec_err(&(expr(vec![1]) + 1), "array");
}

#[rstest]
#[case(Some(0), Some(3), &[0, 1, 2])]
#[case(Some(0), Some(0), &[])]
#[case(Some(5), Some(15), &[5, 6, 7, 8, 9])]
#[case(Some(5), Some(-3), &[5, 6])]
#[case(Some(-5), Some(-3), &[5, 6])]
#[case(Some(5), None, &[5, 6, 7, 8, 9])]
#[case(None, Some(7), &[0, 1, 2, 3, 4, 5, 6])]
#[case(None, Some(-2), &[0, 1, 2, 3, 4, 5, 6, 7])]
#[case(Some(-2), None, &[8, 9])]
#[case(None, None, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9])]
#[case(Some(3), Some(5), &[3, 4])]
fn test_array_slice(#[case] lo: Option<i32>, #[case] hi: Option<i32>, #[case] expected: &[i32]) {
    assert_eq!(ok(&range(10).slice(lo, hi)), numbers(expected));
}

#[test]
fn test_array_slice_errors() {
    exec_err(&expr(1).slice(0, 0), "array");
    exec_err(&range(10).slice(expr(0.5), 0), "integer");
    exec_err(&range(10).slice(0, expr(1.01)), "integer");
    exec_err(&range(10).slice(5, 3), "greater");
}

#[test]
fn test_array_index() {
    assert_eq!(ok(&range(10).nth(3)), Value::from(3));
    assert_eq!(ok(&range(10).nth(-1)), Value::from(9));
    exec_err(&expr(0).nth(0), "array");
    exec_err(&range(10).nth(expr(0.1)), "integer");
    exec_err(&expr(vec![0]).nth(1), "bounds");
}

#[test]
fn test_count() {
    assert_eq!(ok(&expr(Vec::<i32>::new()).count()), Value::from(0));
    assert_eq!(ok(&range(10).count()), Value::from(10));
    exec_err(&expr(0).count(), "array");
}

#[test]
fn test_union_of_arrays() {
    assert_eq!(ok(&expr(vec![1, 2]).union(vec![3, 4])), numbers(&[1, 2, 3, 4]));
    assert_eq!(
        ok(&reql_eval::query::union(vec![1, 2], vec![3, 4])),
        numbers(&[1, 2, 3, 4])
    );
}

// ============================================================================
// Error locations
// ============================================================================

#[test]
fn test_error_location_points_at_failing_operand() {
    use reql_eval::error::Frame;

    let query = expr(json!({"a": 1})).merge(
        Term::MakeObject(vec![("b".into(), expr(1) + "x")]),
    );
    let err = run(&query).unwrap_err();
    let frames: Vec<Frame> = err.location().frames().cloned().collect();
    assert_eq!(
        frames,
        vec![Frame::Arg(1), Frame::Key("b".into()), Frame::Arg(1)]
    );
}
