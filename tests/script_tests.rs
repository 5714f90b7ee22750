// Script Tests
//
// Embedded scripts evaluated through queries: literal results, the `this`
// receiver, let-bound variables and the ways a script can fail.

mod common;

use common::{doc, exec_err, ok};
use pretty_assertions::assert_eq;
use reql_eval::query::{expr, func1, js, js_body, let_, letvar};
use reql_eval::{EngineConfig, Evaluator, MemoryStore, ScriptEngine, Value, to_json};
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case("2", json!(2))]
#[case("2+2", json!(4))]
#[case("\"cows\"", json!("cows"))]
#[case("[1,2,3]", json!([1, 2, 3]))]
#[case("{}", json!({}))]
#[case("{a: \"whee\"}", json!({"a": "whee"}))]
#[case("this", json!({}))]
fn test_js_expression(#[case] source: &str, #[case] expected: serde_json::Value) {
    assert_eq!(ok(&js(source)), doc(expected));
}

#[test]
fn test_js_body() {
    assert_eq!(ok(&js_body("return 0;")), Value::from(0));
    assert_eq!(
        ok(&js_body("var n = 3; if (n > 2) { return 'big'; } else { return 'small'; }")),
        Value::from("big")
    );
}

#[test]
fn test_js_failures() {
    exec_err(&js("undefined"), "undefined");
    exec_err(&js_body("return;"), "undefined");
    exec_err(&js_body("var x = {}; x.x = x; return x;"), "cyclic");
    exec_err(&js("x"), "not defined");
}

#[test]
fn test_deeply_nested_script_is_an_error() {
    let parens = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
    assert_eq!(ok(&js(parens(64))), Value::from(1));
    exec_err(&js(parens(3000)), "nesting too deep");
    exec_err(&js(format!("1{}", " + 1".repeat(10_000))), "nesting too deep");
    exec_err(
        &js_body(format!("{}return 1;{}", "{".repeat(3000), "}".repeat(3000))),
        "nesting too deep",
    );
}

#[test]
fn test_number_to_string_follows_js() {
    assert_eq!(ok(&js("1e21 + ''")), Value::from("1e+21"));
    assert_eq!(ok(&js("1e20 + ''")), Value::from("100000000000000000000"));
    assert_eq!(ok(&js("1e-7 + ''")), Value::from("1e-7"));
    assert_eq!(ok(&js("0.5 + ''")), Value::from("0.5"));
}

#[test]
fn test_js_sees_let_bindings() {
    assert_eq!(ok(&let_([("x", 2)], js("x"))), Value::from(2));
    assert_eq!(ok(&let_([("x", 2), ("y", 3)], js("x + y"))), Value::from(5));
}

#[test]
fn test_js_sees_function_parameters() {
    let q = expr(vec![1, 2, 3]).map(func1(|x| js(format!("{} * 10", x))));
    assert_eq!(ok(&q), doc(json!([10, 20, 30])));
}

#[test]
fn test_js_result_is_a_datum() {
    let q = js("{n: 4}").get_field("n") + 1;
    assert_eq!(ok(&q), Value::from(5));
    assert_eq!(ok(&let_([("x", js("1"))], letvar("x") + 1)), Value::from(2));
}

#[test]
fn test_disabled_scripts() {
    let config = EngineConfig::from_toml_str("[script]\nenabled = false").unwrap();
    let store = MemoryStore::from_config(&config);
    let scripts = ScriptEngine::new();
    let evaluator = Evaluator::with_config(&store, &scripts, config);

    let err = evaluator.run(&js("1")).unwrap_err();
    assert!(err.is_execution());
    assert!(err.to_string().contains("disabled"));
    assert_eq!(evaluator.run(&expr(1)).unwrap(), Value::from(1));
}

#[test]
fn test_js_result_renders_as_json() {
    assert_eq!(to_json(&ok(&js("{b: [1, 2], a: null}"))), r#"{"a":null,"b":[1,2]}"#);
}
